//! # Usage Ledger
//!
//! `SQLite`-backed play-count bookkeeping. One row per known track:
//!
//! ```text
//! tracks(id, music_path UNIQUE, folder_path, n_usage, deleted_renamed)
//! ```
//!
//! The ledger is what makes weighted compilations possible across runs:
//! every track accepted into a compilation gets its `n_usage` bumped, and
//! the sampler reads those counts back the next day. Tracks that vanish
//! from disk are tombstoned via `deleted_renamed` instead of deleted, so
//! their history survives a rename-and-rescan.
//!
//! Opening never creates: a missing ledger file is a user-facing error
//! (`medley init-ledger` is the explicit creation path), because silently
//! starting an empty ledger would reset every play count.

use crate::error::MedleyError;
use crate::library::ScannedTrack;

use log::{debug, trace};
use rusqlite::{Connection, OpenFlags};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One ledger row, minus the rowid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub music_path: String,
    pub folder_path: String,
    pub n_usage: u32,
    pub deleted_renamed: bool,
}

/// Aggregate counts for the `status` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerStats {
    /// All rows, tombstones included.
    pub total: usize,
    /// Rows still eligible for sampling.
    pub active: usize,
    /// Sum of `n_usage` over all rows.
    pub total_usage: u64,
    /// Active rows never used in a compilation.
    pub never_used: usize,
}

/// Handle to an opened ledger database.
#[derive(Debug)]
pub struct UsageLedger {
    conn: Connection,
    path: PathBuf,
}

impl UsageLedger {
    /// Open an existing ledger read-write.
    ///
    /// # Errors
    ///
    /// [`MedleyError::LedgerNotFound`] when the file does not exist.
    pub fn open(path: &Path) -> Result<Self, MedleyError> {
        if !path.is_file() {
            return Err(MedleyError::LedgerNotFound(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        trace!("Opened usage ledger at {path:?}");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Create a fresh ledger (or open an existing file and ensure the
    /// schema). Only `init-ledger` should call this.
    pub fn create(path: &Path) -> Result<Self, MedleyError> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tracks (
                id              INTEGER PRIMARY KEY,
                music_path      TEXT    NOT NULL UNIQUE,
                folder_path     TEXT    NOT NULL,
                n_usage         INTEGER NOT NULL DEFAULT 0,
                deleted_renamed INTEGER NOT NULL DEFAULT 0
            )",
            (),
        )?;
        debug!("Created usage ledger at {path:?}");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All rows in id order, which is insertion order and therefore stable
    /// across runs.
    pub fn load(&self) -> Result<Vec<LedgerEntry>, MedleyError> {
        let mut stmt = self.conn.prepare(
            "SELECT music_path, folder_path, n_usage, deleted_renamed FROM tracks ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(LedgerEntry {
                music_path: row.get(0)?,
                folder_path: row.get(1)?,
                n_usage: row.get(2)?,
                deleted_renamed: row.get(3)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        trace!("Loaded {} ledger rows", entries.len());
        Ok(entries)
    }

    /// Register scanned tracks, skipping paths already present so play
    /// counts survive re-scans. Returns how many rows were actually added.
    pub fn insert_tracks(&mut self, tracks: &[ScannedTrack]) -> Result<usize, MedleyError> {
        let tx = self.conn.transaction()?;
        let mut added = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO tracks (music_path, folder_path) VALUES (?1, ?2)",
            )?;
            for track in tracks {
                added += stmt.execute((&track.music_path, &track.folder_path))?;
            }
        }
        tx.commit()?;
        debug!("Registered {added} new tracks ({} scanned)", tracks.len());
        Ok(added)
    }

    /// Write back `n_usage` for the given entries, keyed by `music_path`.
    ///
    /// Entries whose path no longer has a row match nothing and are lost
    /// without an error; the returned count is the number of rows actually
    /// written, so callers can compare it against what they sent and log
    /// the shortfall. Rows not named here are never touched.
    pub fn persist_usage<'a, I>(&mut self, entries: I) -> Result<usize, MedleyError>
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt =
                tx.prepare("UPDATE tracks SET n_usage = ?1 WHERE music_path = ?2")?;
            for entry in entries {
                written += stmt.execute((entry.n_usage, &entry.music_path))?;
            }
        }
        tx.commit()?;
        trace!("Persisted usage for {written} rows");
        Ok(written)
    }

    /// Tombstone rows whose files are no longer on disk. `existing` is the
    /// set of paths the latest scan found; active rows outside it get
    /// `deleted_renamed` set. Returns the number of rows tombstoned.
    pub fn mark_missing(&mut self, existing: &HashSet<String>) -> Result<usize, MedleyError> {
        let known: Vec<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT music_path FROM tracks WHERE deleted_renamed = 0")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut known = Vec::new();
            for row in rows {
                known.push(row?);
            }
            known
        };

        let tx = self.conn.transaction()?;
        let mut marked = 0;
        {
            let mut stmt =
                tx.prepare("UPDATE tracks SET deleted_renamed = 1 WHERE music_path = ?1")?;
            for path in known.iter().filter(|p| !existing.contains(*p)) {
                marked += stmt.execute((path,))?;
            }
        }
        tx.commit()?;
        debug!("Tombstoned {marked} missing tracks");
        Ok(marked)
    }

    pub fn stats(&self) -> Result<LedgerStats, MedleyError> {
        let total: usize =
            self.conn
                .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        let active: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM tracks WHERE deleted_renamed = 0",
            [],
            |row| row.get(0),
        )?;
        let total_usage: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(n_usage), 0) FROM tracks",
            [],
            |row| row.get(0),
        )?;
        let never_used: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM tracks WHERE n_usage = 0 AND deleted_renamed = 0",
            [],
            |row| row.get(0),
        )?;

        Ok(LedgerStats {
            total,
            active,
            total_usage: total_usage as u64,
            never_used,
        })
    }
}
