//! Audio compilation assembler that rotates a library evenly over time.
//!
//! Core modules:
//! - [`assemble`] - End-to-end compilation drivers
//! - [`timeline`] - Greedy packing of faded tracks with a tracklist
//! - [`algorithm`] - Usage-weighted sampling without replacement
//! - [`ledger`] - SQLite play-count bookkeeping
//! - [`codec`] - Decoding sources and encoding WAV/MP3 output
//!
//! ### Supporting Modules
//!
//! - [`audio`] - Interleaved clip model with fades and concatenation
//! - [`library`] - Flat and recursive audio file discovery
//! - [`batch`] - One weighted compilation per date in a range
//! - [`config`] - Settings structs and the data directory layout
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//! - [`error`] - Typed errors the batch driver classifies on
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use medley::assemble;
//! use medley::config::AssemblySettings;
//! use std::path::Path;
//!
//! // Pack a folder of tracks into one four-hour mix.
//! let settings = AssemblySettings::default();
//! let mut rng = rand::thread_rng();
//! let report = assemble::assemble_directory(
//!     Path::new("/music/chill"),
//!     Path::new("/mixes/evening"),
//!     None,
//!     &settings,
//!     &mut rng,
//! )?;
//! println!(
//!     "{} tracks, {} seconds",
//!     report.track_count,
//!     report.total_ms / 1000
//! );
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## How Selection Works
//!
//! The weighted mode reads play counts from the ledger and samples without
//! replacement with weight `1/(n_usage + S)`. Tracks accepted into a
//! compilation get their count bumped, so tomorrow's draw leans toward
//! whatever today's did not use. The plain `compile` mode skips all of
//! that and just shuffles or sorts one folder.
//!
//! ## Error Handling
//!
//! Public functions return `Result<T, anyhow::Error>`; conditions callers
//! branch on (missing ledger, empty pool) are typed in [`error`] and can
//! be recovered with `downcast_ref`.

pub mod algorithm;
pub mod assemble;
pub mod audio;
pub mod batch;
pub mod cli;
pub mod codec;
pub mod completion;
pub mod config;
pub mod error;
pub mod ledger;
pub mod library;
pub mod timeline;
