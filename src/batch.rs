//! # Batch Generation
//!
//! Runs one weighted compilation per calendar day across an inclusive date
//! range, persisting play counts between days so later days are biased
//! away from what earlier days already used.
//!
//! Dates are independent from each other: a day whose eligible pool is
//! empty is skipped, a day that fails for any other reason is logged and
//! counted, and the batch always runs to the end of the range.

use crate::assemble;
use crate::config::{AssemblySettings, SamplerSettings};
use crate::error::MedleyError;
use crate::ledger::UsageLedger;

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use std::path::PathBuf;

/// What to generate and where.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// First compilation date, inclusive.
    pub start: NaiveDate,
    /// Last compilation date, inclusive.
    pub end: NaiveDate,
    /// Usage ledger to draw from and write back to.
    pub ledger_path: PathBuf,
    /// Directory receiving one audio + tracklist pair per date.
    pub dest: PathBuf,
}

/// Per-date outcomes of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Generate compilations for every date in the range, named `YYYY-MM-DD`.
///
/// Play counts accumulate across the range in memory and are written back
/// to the ledger after each date, so a crash mid-batch loses at most the
/// current date. A ledger write failure is logged and the batch moves on;
/// the audio files on disk are the source of truth for what got made.
///
/// # Errors
///
/// Fatal errors are the ones no date could recover from: a reversed date
/// range, a missing ledger, or an unreadable ledger.
pub fn run(
    config: &BatchConfig,
    assembly: &AssemblySettings,
    sampler: &SamplerSettings,
) -> Result<BatchSummary> {
    if config.start > config.end {
        bail!(
            "Start date {} is after end date {}",
            config.start,
            config.end
        );
    }

    let mut ledger = UsageLedger::open(&config.ledger_path)?;
    let mut entries = ledger.load()?;
    info!(
        "Loaded {} ledger rows from {:?}",
        entries.len(),
        config.ledger_path
    );

    let mut rng = match sampler.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut summary = BatchSummary::default();
    let mut date = config.start;
    while date <= config.end {
        let name = date.format("%Y-%m-%d").to_string();
        info!("Generating compilation for {name}");

        match assemble::assemble_from_ledger(
            &entries,
            &name,
            &config.dest,
            assembly,
            sampler,
            &mut rng,
        ) {
            Ok((report, accepted)) => {
                for &index in &accepted {
                    entries[index].n_usage += 1;
                }
                match ledger.persist_usage(accepted.iter().map(|&i| &entries[i])) {
                    Ok(written) if written < accepted.len() => warn!(
                        "Persisted only {written} of {} usage updates for {name}",
                        accepted.len()
                    ),
                    Ok(written) => debug!("Updated usage for {written} tracks"),
                    // Losing one day of counts skews tomorrow's weights a
                    // little; not worth failing the date over.
                    Err(e) => warn!("Error updating usage ledger: {e}"),
                }

                info!("Generated: {}", report.audio_path.display());
                info!("Tracklist saved: {}", report.tracklist_path.display());
                summary.generated += 1;
            }
            Err(e)
                if e.downcast_ref::<MedleyError>()
                    .is_some_and(MedleyError::is_empty_pool) =>
            {
                info!("No eligible tracks for {name}, skipping");
                summary.skipped += 1;
            }
            Err(e) => {
                error!("Failed to generate compilation for {name}: {e:#}");
                summary.failed += 1;
            }
        }

        date = date
            .succ_opt()
            .ok_or_else(|| anyhow!("Date overflow past {date}"))?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::OutputFormat;
    use crate::ledger::UsageLedger;
    use crate::library::ScannedTrack;

    use std::fs;
    use std::path::Path;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write_wav(path: &Path, ms: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..(ms * 8) {
            writer.write_sample(4_000i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn quiet_assembly() -> AssemblySettings {
        AssemblySettings {
            fade_in_ms: 0,
            fade_out_ms: 0,
            target_ms: None,
            overflow_ms: 0,
            format: OutputFormat::Wav,
            shuffle: false,
        }
    }

    #[test]
    fn test_reversed_range_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig {
            start: date(2026, 3, 2),
            end: date(2026, 3, 1),
            ledger_path: dir.path().join("usage.db"),
            dest: dir.path().join("out"),
        };
        let err = run(&config, &quiet_assembly(), &SamplerSettings::default()).unwrap_err();
        assert!(err.to_string().contains("after end date"));
    }

    #[test]
    fn test_missing_ledger_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig {
            start: date(2026, 3, 1),
            end: date(2026, 3, 1),
            ledger_path: dir.path().join("usage.db"),
            dest: dir.path().join("out"),
        };
        let err = run(&config, &quiet_assembly(), &SamplerSettings::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MedleyError>(),
            Some(MedleyError::LedgerNotFound(_))
        ));
    }

    #[test]
    fn test_all_dates_skip_when_pool_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("usage.db");
        {
            let mut ledger = UsageLedger::create(&ledger_path).unwrap();
            ledger
                .insert_tracks(&[ScannedTrack {
                    music_path: "/gone/a.wav".to_string(),
                    folder_path: "/gone".to_string(),
                }])
                .unwrap();
            ledger.mark_missing(&Default::default()).unwrap();
        }

        let dest = dir.path().join("out");
        let config = BatchConfig {
            start: date(2026, 3, 1),
            end: date(2026, 3, 3),
            ledger_path,
            dest: dest.clone(),
        };
        let summary = run(&config, &quiet_assembly(), &SamplerSettings::default()).unwrap();

        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.generated, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
    }

    #[test]
    fn test_two_day_batch_generates_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        fs::create_dir(&music).unwrap();
        let a = music.join("a.wav");
        let b = music.join("b.wav");
        write_wav(&a, 1_000);
        write_wav(&b, 1_000);

        let ledger_path = dir.path().join("usage.db");
        {
            let mut ledger = UsageLedger::create(&ledger_path).unwrap();
            ledger
                .insert_tracks(&[
                    ScannedTrack {
                        music_path: a.to_string_lossy().into_owned(),
                        folder_path: music.to_string_lossy().into_owned(),
                    },
                    ScannedTrack {
                        music_path: b.to_string_lossy().into_owned(),
                        folder_path: music.to_string_lossy().into_owned(),
                    },
                ])
                .unwrap();
        }

        let dest = dir.path().join("out");
        let config = BatchConfig {
            start: date(2026, 3, 1),
            end: date(2026, 3, 2),
            ledger_path: ledger_path.clone(),
            dest: dest.clone(),
        };
        let summary = run(&config, &quiet_assembly(), &SamplerSettings::default()).unwrap();

        assert_eq!(summary.generated, 2);
        assert_eq!(summary.skipped, 0);
        assert!(dest.join("2026-03-01.wav").is_file());
        assert!(dest.join("2026-03-02.wav").is_file());
        assert!(dest.join("2026-03-01_audio_list.txt").is_file());

        // Without a target every track packs every day, so each row was
        // used twice and the counts survived into the ledger file.
        let ledger = UsageLedger::open(&ledger_path).unwrap();
        let entries = ledger.load().unwrap();
        assert!(entries.iter().all(|e| e.n_usage == 2));
    }
}
