//! # Compilation Assembly
//!
//! The two end-to-end drivers behind the CLI:
//!
//! * [`assemble_directory`] packs every eligible file of one folder,
//!   shuffled or sorted. Tracklist labels are bare file names.
//! * [`assemble_from_ledger`] draws a usage-weighted sample from ledger
//!   rows and packs that. Tracklist labels are full paths, and the caller
//!   gets back which rows made it in so play counts can be persisted.
//!
//! Both hand the ordered tracks to a [`TimelinePacker`] and export the
//! result as `<name>.<ext>` plus `<name>_audio_list.txt` in the
//! destination directory.

use crate::algorithm;
use crate::codec::{self, OutputFormat};
use crate::config::{AssemblySettings, SamplerSettings};
use crate::ledger::LedgerEntry;
use crate::library;
use crate::timeline::{Compilation, PushOutcome, TimelinePacker};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use path_absolutize::Absolutize;
use rand::Rng;

use std::fs;
use std::path::{Path, PathBuf};

/// Where a finished compilation landed and how big it is.
#[derive(Debug, Clone)]
pub struct CompilationReport {
    pub audio_path: PathBuf,
    pub tracklist_path: PathBuf,
    pub track_count: usize,
    pub total_ms: u64,
}

/// Compilation name when the user gave none: the destination directory's
/// own name.
fn default_name(dest: &Path) -> String {
    dest.absolutize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "compilation".to_string())
}

/// Write the audio and tracklist files for a finished compilation.
fn export_compilation(
    compilation: &Compilation,
    dest: &Path,
    name: &str,
    format: OutputFormat,
) -> Result<CompilationReport> {
    let audio_path = dest.join(format!("{name}.{}", format.extension()));
    let tracklist_path = dest.join(format!("{name}_audio_list.txt"));

    codec::export_clip(&compilation.audio, &audio_path, format)?;
    fs::write(&tracklist_path, compilation.tracklist())
        .with_context(|| format!("Failed to write tracklist to {:?}", tracklist_path))?;

    Ok(CompilationReport {
        audio_path,
        tracklist_path,
        track_count: compilation.entries.len(),
        total_ms: compilation.total_ms,
    })
}

/// Compile every eligible file directly inside `source` into one
/// compilation under `dest`.
///
/// Order is a uniform shuffle or a lexicographic sort per
/// `settings.shuffle`; packing stops once `settings.target_ms` is crossed
/// (the crossing track is kept). A file that fails to decode aborts the
/// run, since a flat source folder is assumed to be curated.
pub fn assemble_directory<R: Rng + ?Sized>(
    source: &Path,
    dest: &Path,
    name: Option<&str>,
    settings: &AssemblySettings,
    rng: &mut R,
) -> Result<CompilationReport> {
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create destination directory {:?}", dest))?;
    let name = name.map_or_else(|| default_name(dest), str::to_string);

    let mut files = library::eligible_files(source)?;
    library::order_tracks(&mut files, settings.shuffle, rng);

    let mut packer = TimelinePacker::new(
        settings.fade_in_ms,
        settings.fade_out_ms,
        settings.target_ms,
    );
    for file in &files {
        let path = source.join(file);
        let clip = codec::decode_file(&path)
            .with_context(|| format!("Failed to decode {:?}", path))?;

        debug!("Adding: {file}");
        match packer.push(file, clip) {
            PushOutcome::Accepted => {}
            PushOutcome::Finalized => {
                info!("Target duration reached. Compiling final audio...");
                break;
            }
            PushOutcome::Rejected => break,
        }
    }

    export_compilation(&packer.finish(), dest, &name, settings.format)
}

/// Compile a usage-weighted draw from ledger rows into `dest/<name>`.
///
/// The eligible pool is the active (non-tombstoned) rows, optionally
/// restricted to `sampler.include_folders`. Rows that fail to decode or
/// carry an unsupported suffix are skipped with a log line rather than
/// aborting, because ledger contents drift out of sync with the disk.
///
/// Returns the report plus the indices into `entries` that were packed;
/// the caller is responsible for bumping and persisting their play counts.
pub fn assemble_from_ledger<R: Rng + ?Sized>(
    entries: &[LedgerEntry],
    name: &str,
    dest: &Path,
    assembly: &AssemblySettings,
    sampler: &SamplerSettings,
    rng: &mut R,
) -> Result<(CompilationReport, Vec<usize>)> {
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create destination directory {:?}", dest))?;

    if !sampler.include_folders.is_empty() {
        info!("Folder counts:");
        for folder in &sampler.include_folders {
            let count = entries.iter().filter(|e| &e.folder_path == folder).count();
            info!("\"{folder}\" -> {count} files");
        }
    }

    let pool: Vec<(usize, u32)> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| {
            !e.deleted_renamed
                && (sampler.include_folders.is_empty()
                    || sampler.include_folders.contains(&e.folder_path))
        })
        .map(|(index, e)| (index, e.n_usage))
        .collect();

    let selected = algorithm::select_tracks(
        &pool,
        sampler.sample_cap,
        sampler.smoothing,
        assembly.shuffle,
        rng,
    )?;

    // The target is soft in weighted mode: packing may run into the
    // overflow allowance so a compilation never ends mid-silence short of
    // its target.
    let limit = assembly.target_ms.map(|t| t + assembly.overflow_ms);
    let mut packer = TimelinePacker::new(assembly.fade_in_ms, assembly.fade_out_ms, limit);

    let mut accepted = Vec::new();
    for &index in &selected {
        let entry = &entries[index];
        let path = Path::new(&entry.music_path);
        if !entry.music_path.ends_with(".wav") && !entry.music_path.ends_with(".mp3") {
            debug!("Skipping unsupported file type: {}", entry.music_path);
            continue;
        }

        let clip = match codec::decode_file(path) {
            Ok(clip) => clip,
            Err(e) => {
                warn!("Skipping {}: {e:#}", entry.music_path);
                continue;
            }
        };

        info!("Adding: {}", entry.music_path);
        match packer.push(&entry.music_path, clip) {
            PushOutcome::Accepted => accepted.push(index),
            PushOutcome::Finalized => {
                accepted.push(index);
                info!("Target duration reached. Compiling final audio...");
                break;
            }
            PushOutcome::Rejected => break,
        }
    }

    let report = export_compilation(&packer.finish(), dest, name, assembly.format)?;
    Ok((report, accepted))
}
