//! Error taxonomy for compilation runs.
//!
//! Most functions in this crate return `anyhow::Result` for rich context
//! chains; the variants here exist for the failures callers need to tell
//! apart. The batch driver downcasts to [`MedleyError`] to decide whether a
//! date is skipped (empty pool) or counted as failed (everything else), and
//! `main` relies on the fatal variants reaching it to exit non-zero.

use std::path::PathBuf;
use thiserror::Error;

/// Failures with defined recovery behavior.
///
/// - [`NoSourceDirectory`](MedleyError::NoSourceDirectory),
///   [`NoEligibleFiles`](MedleyError::NoEligibleFiles) and
///   [`LedgerNotFound`](MedleyError::LedgerNotFound) are fatal: the run
///   aborts with a message and a non-zero exit status.
/// - [`EmptyEligiblePool`](MedleyError::EmptyEligiblePool) is recoverable:
///   the batch driver logs it and moves on to the next date.
/// - [`LedgerPersist`](MedleyError::LedgerPersist) is recovered locally: the
///   caller logs a warning and continues, accepting that the date's usage
///   increments may be lost to the next process start.
#[derive(Debug, Error)]
pub enum MedleyError {
    /// The shuffle-or-sort source directory does not exist.
    #[error("source folder '{}' does not exist", .0.display())]
    NoSourceDirectory(PathBuf),

    /// The source directory exists but holds no `.wav` or `.mp3` files.
    #[error("no .wav or .mp3 files found in source folder '{}'", .0.display())]
    NoEligibleFiles(PathBuf),

    /// The usage ledger must pre-exist; the compile path never creates it.
    #[error("usage ledger '{}' not found; run `medley init-ledger` first", .0.display())]
    LedgerNotFound(PathBuf),

    /// Folder filter plus deleted-flag filter left nothing to sample from.
    #[error("no eligible tracks matched the configured folders")]
    EmptyEligiblePool,

    /// A usage-ledger read or write failed underneath us.
    #[error("usage ledger error: {0}")]
    LedgerPersist(#[from] rusqlite::Error),
}

impl MedleyError {
    /// True for the one variant the batch driver treats as "nothing to
    /// compile today" rather than a failure.
    pub fn is_empty_pool(&self) -> bool {
        matches!(self, MedleyError::EmptyEligiblePool)
    }
}
