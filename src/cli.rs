//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for Medley using Clap
//! derive macros. It provides a type-safe way to parse command-line
//! arguments and route them to appropriate functionality.
//!
//! ## Commands
//!
//! - `compile`: Build one compilation from a folder of audio files
//! - `batch`: Build one weighted compilation per date in a range
//! - `init-ledger`: Scan a library and create the usage ledger
//! - `update-ledger`: Add newly scanned tracks to an existing ledger
//! - `status`: Show ledger statistics
//! - `completion`: Generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! medley compile ~/Music/chill ~/Mixes/chill-evening --sorted
//! medley init-ledger ~/Music
//! medley batch ~/Mixes/daily --start 2026-03-01 --end 2026-03-07
//! ```

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::codec::OutputFormat;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// Uses Clap derive macros to automatically generate argument parsing,
/// help text, and validation. The main structure contains only a subcommand
/// since all functionality is accessed through specific commands.
#[derive(Parser)]
#[command(name = "medley")]
#[command(about = "Medley: Daily audio compilations weighted toward your least-played tracks")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
///
/// Each variant corresponds to a major piece of functionality in Medley.
/// Command arguments are embedded directly in the enum variants for
/// type safety and automatic validation.
#[derive(Subcommand)]
pub enum Command {
    /// Compile one folder of audio files into a single compilation
    ///
    /// Takes every .wav and .mp3 directly inside the source folder (no
    /// recursion), shuffles or sorts them, applies fades and concatenates
    /// up to the target duration. Writes `<name>.<format>` and
    /// `<name>_audio_list.txt` into the destination folder.
    ///
    /// Best for: one-off mixes from a hand-picked folder
    Compile {
        /// Folder containing the source audio files
        source: PathBuf,

        /// Folder the compilation is written into (created if missing)
        dest: PathBuf,

        /// Base name of the output files
        ///
        /// Defaults to the destination folder's own name, so
        /// `medley compile ~/Music/chill ~/Mixes/evening` produces
        /// `evening.mp3`.
        #[arg(long)]
        name: Option<String>,

        /// Output audio format
        #[arg(long, value_enum, default_value = "mp3")]
        format: OutputFormat,

        /// Sort tracks by file name instead of shuffling
        #[arg(long)]
        sorted: bool,

        /// Fade-in applied to each track, in milliseconds
        #[arg(long, default_value = "3000")]
        fade_in_ms: u64,

        /// Fade-out applied to each track, in milliseconds
        #[arg(long, default_value = "3000")]
        fade_out_ms: u64,

        /// Target duration in minutes
        ///
        /// Packing stops once the total crosses this; the crossing track
        /// is kept. Defaults to 240 minutes (four hours).
        #[arg(long, conflicts_with = "unlimited")]
        target_mins: Option<u64>,

        /// Ignore the target duration and pack every eligible file
        #[arg(long)]
        unlimited: bool,
    },

    /// Generate one weighted compilation per date in a range
    ///
    /// Draws tracks from the usage ledger with probability inversely
    /// proportional to how often each track has been used, so rarely-heard
    /// tracks surface first. Each date gets `YYYY-MM-DD.<format>` plus a
    /// tracklist, and play counts are written back between dates.
    ///
    /// Best for: a rotation of daily mixes over a whole library
    Batch {
        /// Folder the compilations are written into (created if missing)
        dest: PathBuf,

        /// First date to generate, inclusive (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last date to generate, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Path to the usage ledger
        ///
        /// Defaults to the platform data directory, e.g.
        /// `~/.local/share/medley/usage.db` on Linux.
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Restrict sampling to these library folders (repeatable)
        ///
        /// Folders must match the `folder_path` stored in the ledger.
        /// Without this flag every active track is eligible.
        #[arg(long = "include")]
        include_folders: Vec<String>,

        /// Maximum number of tracks sampled per date
        #[arg(long)]
        sample_cap: Option<usize>,

        /// Smoothing constant of the inverse-usage weights
        ///
        /// Smaller values bias harder toward never-used tracks.
        #[arg(long)]
        smoothing: Option<f64>,

        /// Target duration in minutes
        #[arg(long, conflicts_with = "unlimited")]
        target_mins: Option<u64>,

        /// Ignore the target duration and pack the whole sample
        #[arg(long)]
        unlimited: bool,

        /// Overflow allowance past the target, in milliseconds
        #[arg(long)]
        overflow_ms: Option<u64>,

        /// Output audio format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Keep tracks in draw order instead of shuffling playback order
        #[arg(long)]
        no_shuffle: bool,

        /// Seed the sampler for a reproducible batch
        #[arg(long)]
        seed: Option<u64>,

        /// JSON settings file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Initialize the usage ledger from a music library (full scan)
    ///
    /// Recursively scans the library for .wav and .mp3 files and creates
    /// the ledger with one row per track, play counts at zero. Fails if
    /// the ledger already exists unless --force is given.
    InitLedger {
        /// Root of the music library to scan
        library: PathBuf,

        /// Path to the usage ledger
        ///
        /// Defaults to the platform data directory, e.g.
        /// `~/.local/share/medley/usage.db` on Linux.
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Replace an existing ledger, discarding all play counts
        #[arg(long)]
        force: bool,
    },

    /// Update the usage ledger with new files (incremental)
    ///
    /// Scans the library and adds only tracks not already in the ledger,
    /// keeping existing play counts. Much faster to live with than
    /// re-initializing after every library change.
    UpdateLedger {
        /// Root of the music library to scan
        library: PathBuf,

        /// Path to the usage ledger
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Tombstone ledger rows whose files no longer exist
        ///
        /// Marked rows keep their history but stop being sampled. Useful
        /// after reorganizing the library.
        #[arg(long)]
        mark_missing: bool,
    },

    /// Show usage ledger statistics
    ///
    /// Displays row counts, total accumulated plays and how many tracks
    /// have never appeared in a compilation.
    Status {
        /// Path to the usage ledger
        #[arg(long)]
        ledger: Option<PathBuf>,
    },

    /// Generate shell completions
    ///
    /// Generates completion scripts for various shells to enable tab
    /// completion of commands and flags.
    ///
    /// Usage: medley completion bash > ~/.local/share/bash-completion/completions/medley
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
