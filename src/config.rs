//! # Configuration Module
//!
//! Settings for compilation assembly plus the platform-appropriate home of
//! the usage ledger.
//!
//! ## Data Storage
//!
//! The ledger lives in the standard data directory:
//! - Linux: `~/.local/share/medley/usage.db`
//! - macOS: `~/Library/Application Support/medley/usage.db`
//! - Windows: `%APPDATA%\medley\usage.db`
//!
//! ## Settings File
//!
//! `batch` optionally reads a JSON settings file. Every field is optional
//! and falls back to the built-in default, so a file can override a single
//! knob:
//!
//! ```json
//! { "sampler": { "smoothing": 10.0 } }
//! ```
//!
//! Command-line flags override the file, which overrides the defaults.

use crate::codec::OutputFormat;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use std::fs;
use std::path::{Path, PathBuf};

/// How a single compilation is assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblySettings {
    /// Linear fade-in applied to the head of every track, in ms.
    pub fade_in_ms: u64,
    /// Linear fade-out applied to the tail of every track, in ms.
    pub fade_out_ms: u64,
    /// Target duration in ms. `null` in the settings file means no limit;
    /// the default is four hours.
    pub target_ms: Option<u64>,
    /// Extra headroom past the target before packing stops, in ms. Only
    /// the weighted mode uses this.
    pub overflow_ms: u64,
    /// Container format of the exported audio.
    pub format: OutputFormat,
    /// Shuffle playback order instead of keeping it sorted.
    pub shuffle: bool,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            fade_in_ms: 3_000,
            fade_out_ms: 3_000,
            // Four hours of audio.
            target_ms: Some(14_400_000),
            overflow_ms: 120_000,
            format: OutputFormat::Mp3,
            shuffle: true,
        }
    }
}

/// How the weighted sampler draws from the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// Smoothing constant `S` in the `1/(n+S)` weight. Must be positive.
    pub smoothing: f64,
    /// Upper bound on tracks drawn per compilation; clamped to the pool.
    pub sample_cap: usize,
    /// Folder allow-list. Empty means every folder is eligible.
    pub include_folders: Vec<String>,
    /// Seed for the sampler RNG. `None` seeds from OS entropy; setting it
    /// makes a batch reproducible.
    pub seed: Option<u64>,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            smoothing: 5.0,
            sample_cap: 250,
            include_folders: Vec::new(),
            seed: None,
        }
    }
}

/// Everything the settings file can carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub assembly: AssemblySettings,
    pub sampler: SamplerSettings,
}

impl Settings {
    /// Read settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse settings file {:?}", path))
    }

    /// [`Settings::load`] when a path was given, built-in defaults
    /// otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

/// Returns the platform-appropriate ledger file path.
///
/// Locates the standard data directory for the current platform and creates
/// the `medley` subdirectory if it doesn't exist, so the ledger file can be
/// created right after.
///
/// # Errors
///
/// Fails when the platform has no standard data directory or the `medley`
/// subdirectory cannot be created.
///
/// # Examples
///
/// ```no_run
/// use medley::config::default_ledger_path;
///
/// let ledger = default_ledger_path()?;
/// println!("Ledger location: {}", ledger.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn default_ledger_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let medley_dir = data_dir.join("medley");
    fs::create_dir_all(&medley_dir).with_context(|| {
        format!(
            "Failed to create Medley data directory at {}. Please check file permissions.",
            medley_dir.display()
        )
    })?;

    Ok(medley_dir.join("usage.db"))
}

/// Create `dir` and its parents if needed.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))
}
