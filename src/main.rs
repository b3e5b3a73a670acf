//! # Medley - Audio Compilation Assembler
//!
//! Medley turns a music library into long-form compilations: it picks
//! tracks, fades them into each other and writes one audio file plus a
//! timestamped tracklist. The weighted mode keeps a play-count ledger so
//! that every day's compilation leans toward the tracks heard least.
//!
//! ## Architecture
//!
//! - `cli`: Command-line interface definitions
//! - `assemble`: End-to-end compilation drivers
//! - `timeline`: Greedy packing with tracklist bookkeeping
//! - `algorithm`: Usage-weighted sampling
//! - `ledger`: SQLite play-count storage
//! - `codec` / `audio`: Decoding, fades, encoding
//!
//! ## Usage
//!
//! ```bash
//! # One-off mix from a folder
//! medley compile ~/Music/chill ~/Mixes/evening
//!
//! # Set up the ledger, then a week of daily mixes
//! medley init-ledger ~/Music
//! medley batch ~/Mixes/daily --start 2026-03-01 --end 2026-03-07
//!
//! # See how evenly the library is rotating
//! medley status
//! ```

use anyhow::{bail, ensure, Result};
use clap::{CommandFactory, Parser};
use log::info;

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use medley::batch::{self, BatchConfig};
use medley::cli;
use medley::completion;
use medley::config::{self, AssemblySettings, Settings};
use medley::ledger::UsageLedger;
use medley::{assemble, library};

/// The ledger path a command should use: the explicit flag if given,
/// otherwise the platform default under the data directory.
fn resolve_ledger_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(path),
        None => config::default_ledger_path(),
    }
}

/// Main entry point for the Medley application.
///
/// Initializes logging, parses command-line arguments, and routes commands
/// to the appropriate module functions. All operations return Results for
/// consistent error handling throughout the application.
///
/// # Logging
///
/// Initializes environment logger which can be controlled via `RUST_LOG`:
/// - `RUST_LOG=debug medley batch ...` - Enable debug logging
/// - `RUST_LOG=medley::assemble=info medley batch ...` - Per-track add lines
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Compile {
            source,
            dest,
            name,
            format,
            sorted,
            fade_in_ms,
            fade_out_ms,
            target_mins,
            unlimited,
        } => {
            info!(
                "Compiling {} into {}",
                source.display(),
                dest.display()
            );

            let target_ms = if unlimited {
                None
            } else {
                // Four hours unless told otherwise.
                Some(target_mins.unwrap_or(240) * 60_000)
            };
            let settings = AssemblySettings {
                fade_in_ms,
                fade_out_ms,
                target_ms,
                overflow_ms: 0,
                format,
                shuffle: !sorted,
            };

            let mut rng = rand::thread_rng();
            let report =
                assemble::assemble_directory(&source, &dest, name.as_deref(), &settings, &mut rng)?;

            println!("Combined audio saved to: {}", report.audio_path.display());
            println!("Audio list saved to: {}", report.tracklist_path.display());
            println!(
                "Total duration of combined audio: {} seconds",
                report.total_ms / 1000
            );
        }
        cli::Command::Batch {
            dest,
            start,
            end,
            ledger,
            include_folders,
            sample_cap,
            smoothing,
            target_mins,
            unlimited,
            overflow_ms,
            format,
            no_shuffle,
            seed,
            config: settings_path,
        } => {
            // Flags override the settings file, which overrides defaults.
            let mut settings = Settings::load_or_default(settings_path.as_deref())?;
            if !include_folders.is_empty() {
                settings.sampler.include_folders = include_folders;
            }
            if let Some(cap) = sample_cap {
                settings.sampler.sample_cap = cap;
            }
            if let Some(s) = smoothing {
                settings.sampler.smoothing = s;
            }
            if let Some(s) = seed {
                settings.sampler.seed = Some(s);
            }
            if unlimited {
                settings.assembly.target_ms = None;
            } else if let Some(mins) = target_mins {
                settings.assembly.target_ms = Some(mins * 60_000);
            }
            if let Some(ms) = overflow_ms {
                settings.assembly.overflow_ms = ms;
            }
            if let Some(f) = format {
                settings.assembly.format = f;
            }
            if no_shuffle {
                settings.assembly.shuffle = false;
            }

            let batch_config = BatchConfig {
                start,
                end,
                ledger_path: resolve_ledger_path(ledger)?,
                dest,
            };
            let summary = batch::run(&batch_config, &settings.assembly, &settings.sampler)?;

            println!(
                "Generated {} compilations ({} skipped, {} failed)",
                summary.generated, summary.skipped, summary.failed
            );
            ensure!(
                summary.failed == 0,
                "{} dates failed, see the log above",
                summary.failed
            );
        }
        cli::Command::InitLedger {
            library,
            ledger,
            force,
        } => {
            let ledger_path = resolve_ledger_path(ledger)?;
            if ledger_path.exists() {
                if !force {
                    bail!(
                        "Ledger already exists at {}. Use --force to replace it and lose all play counts.",
                        ledger_path.display()
                    );
                }
                fs::remove_file(&ledger_path)?;
            }
            if let Some(parent) = ledger_path.parent() {
                config::ensure_dir(parent)?;
            }

            info!("Scanning library at {}", library.display());
            let tracks = library::scan_library(&library)?;

            let mut usage_ledger = UsageLedger::create(&ledger_path)?;
            let added = usage_ledger.insert_tracks(&tracks)?;
            println!(
                "Initialized ledger at {} with {added} tracks",
                ledger_path.display()
            );
        }
        cli::Command::UpdateLedger {
            library,
            ledger,
            mark_missing,
        } => {
            let ledger_path = resolve_ledger_path(ledger)?;
            let mut usage_ledger = UsageLedger::open(&ledger_path)?;

            info!("Scanning library at {}", library.display());
            let tracks = library::scan_library(&library)?;
            let added = usage_ledger.insert_tracks(&tracks)?;
            println!("Added {added} new tracks to {}", ledger_path.display());

            if mark_missing {
                let existing: HashSet<String> =
                    tracks.iter().map(|t| t.music_path.clone()).collect();
                let marked = usage_ledger.mark_missing(&existing)?;
                println!("Marked {marked} tracks as deleted or renamed");
            }
        }
        cli::Command::Status { ledger } => {
            let ledger_path = resolve_ledger_path(ledger)?;
            let usage_ledger = UsageLedger::open(&ledger_path)?;
            let stats = usage_ledger.stats()?;

            println!("Ledger: {}", ledger_path.display());
            println!("Tracks: {} total, {} active", stats.total, stats.active);
            println!("Total plays recorded: {}", stats.total_usage);
            println!("Never used in a compilation: {}", stats.never_used);
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(
                completion::shell_to_completion_shell(&shell),
                &mut cmd,
            );
        }
    }

    Ok(())
}
