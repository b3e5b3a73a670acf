//! # Library Discovery
//!
//! Finds the audio files a compilation can draw from.
//!
//! Two flavors of discovery exist. [`eligible_files`] is the flat listing
//! used by `compile`: immediate children of one folder, no recursion, names
//! returned as-is so tracklists can show bare file names. [`scan_library`]
//! is the recursive walk used by the ledger commands: it descends the whole
//! tree, skips hidden entries and records absolute paths so the ledger stays
//! valid no matter where the tool is invoked from.
//!
//! Suffix matching is case-sensitive on purpose (`.WAV` is not picked up);
//! libraries that mix cases are rare enough that silent inclusion is more
//! surprising than silent omission.

use crate::error::MedleyError;

use anyhow::{Context, Result};
use log::debug;
use path_absolutize::Absolutize;
use rand::seq::SliceRandom;
use rand::Rng;
use walkdir::WalkDir;

use std::fs;
use std::path::Path;

/// True for the file suffixes a compilation can contain.
fn has_audio_suffix(name: &str) -> bool {
    name.ends_with(".wav") || name.ends_with(".mp3")
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// List the audio file names directly inside `source` (no recursion).
///
/// # Errors
///
/// [`MedleyError::NoSourceDirectory`] if `source` is not a directory,
/// [`MedleyError::NoEligibleFiles`] if it contains no `.wav` or `.mp3`
/// files.
pub fn eligible_files(source: &Path) -> Result<Vec<String>> {
    if !source.is_dir() {
        return Err(MedleyError::NoSourceDirectory(source.to_path_buf()).into());
    }

    let mut files = Vec::new();
    let entries = fs::read_dir(source)
        .with_context(|| format!("Failed to read source directory {:?}", source))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {:?}", source))?;
        if !entry.path().is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            if has_audio_suffix(&name) {
                files.push(name);
            }
        }
    }

    if files.is_empty() {
        return Err(MedleyError::NoEligibleFiles(source.to_path_buf()).into());
    }

    debug!("Found {} eligible files in {:?}", files.len(), source);
    Ok(files)
}

/// Put tracks into compilation order: shuffled, or lexicographically sorted
/// when a reproducible order is wanted.
pub fn order_tracks<R: Rng + ?Sized>(tracks: &mut [String], shuffle: bool, rng: &mut R) {
    if shuffle {
        tracks.shuffle(rng);
    } else {
        tracks.sort();
    }
}

/// A track found by a recursive scan, in ledger form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedTrack {
    /// Absolute path of the audio file.
    pub music_path: String,
    /// Absolute path of the directory containing it.
    pub folder_path: String,
}

/// Recursively scan `root` for audio files, hidden entries excluded.
///
/// Paths are absolutized before they are returned so ledger rows do not
/// depend on the working directory of the scan. The result is sorted by
/// path, which keeps ledger ids stable across repeated scans of an
/// unchanged tree.
pub fn scan_library(root: &Path) -> Result<Vec<ScannedTrack>> {
    if !root.is_dir() {
        return Err(MedleyError::NoSourceDirectory(root.to_path_buf()).into());
    }
    let root = root
        .absolutize()
        .with_context(|| format!("Failed to absolutize library root {:?}", root))?
        .to_path_buf();

    let mut tracks = Vec::new();
    for entry in WalkDir::new(&root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        let is_audio = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(has_audio_suffix)
            .unwrap_or(false);
        if !path.is_file() || !is_audio {
            continue;
        }

        let folder = path.parent().unwrap_or(&root);
        tracks.push(ScannedTrack {
            music_path: path.to_string_lossy().into_owned(),
            folder_path: folder.to_string_lossy().into_owned(),
        });
    }

    tracks.sort_by(|a, b| a.music_path.cmp(&b.music_path));
    debug!("Scanned {} tracks under {:?}", tracks.len(), root);
    Ok(tracks)
}
