//! # Integration Tests for Medley
//!
//! End-to-end coverage from a user perspective: compiling folders,
//! running multi-date batches against a real ledger file, and the
//! binary's CLI surface.

use anyhow::Result;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

use medley::batch::{self, BatchConfig};
use medley::codec::OutputFormat;
use medley::config::{AssemblySettings, SamplerSettings};
use medley::error::MedleyError;
use medley::ledger::UsageLedger;
use medley::{assemble, codec};

/// Write a constant-tone mono 16-bit WAV. At 8 kHz every millisecond is
/// exactly 8 frames, so durations asserted in ms stay exact.
fn write_test_wav(path: &Path, ms: u32, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create test WAV");
    let frames = (u64::from(ms) * u64::from(sample_rate) / 1000) as u32;
    for _ in 0..frames {
        writer.write_sample(8_000i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Test helper to create a ledger file with raw SQL, independent of the
/// library's own creation path. Rows are (music_path, folder_path,
/// n_usage, deleted_renamed).
fn create_test_ledger(path: &Path, rows: &[(&str, &str, u32, bool)]) -> Result<()> {
    let conn = rusqlite::Connection::open(path)?;
    conn.execute(
        "CREATE TABLE tracks (
            id              INTEGER PRIMARY KEY,
            music_path      TEXT    NOT NULL UNIQUE,
            folder_path     TEXT    NOT NULL,
            n_usage         INTEGER NOT NULL DEFAULT 0,
            deleted_renamed INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    for (music_path, folder_path, n_usage, deleted) in rows {
        conn.execute(
            "INSERT INTO tracks (music_path, folder_path, n_usage, deleted_renamed)
             VALUES (?1, ?2, ?3, ?4)",
            (music_path, folder_path, n_usage, deleted),
        )?;
    }
    Ok(())
}

/// Fade-free WAV assembly settings so duration assertions stay simple.
fn flat_settings(target_ms: Option<u64>) -> AssemblySettings {
    AssemblySettings {
        fade_in_ms: 0,
        fade_out_ms: 0,
        target_ms,
        overflow_ms: 0,
        format: OutputFormat::Wav,
        shuffle: false,
    }
}

#[cfg(test)]
mod compile_tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Three tracks of 5, 4 and 3 seconds against a 6-second target: the
    /// 4-second track crosses the target and is kept, the third never
    /// packs, and the tracklist carries exactly two offsets.
    #[test]
    fn test_target_overshoot_keeps_crossing_track() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("source");
        let dest = temp.path().join("dest");
        fs::create_dir(&source)?;
        write_test_wav(&source.join("a.wav"), 5_000, 8_000);
        write_test_wav(&source.join("b.wav"), 4_000, 8_000);
        write_test_wav(&source.join("c.wav"), 3_000, 8_000);

        // Default fades, sorted order, 6 s target.
        let settings = AssemblySettings {
            fade_in_ms: 3_000,
            fade_out_ms: 3_000,
            target_ms: Some(6_000),
            overflow_ms: 0,
            format: OutputFormat::Wav,
            shuffle: false,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let report = assemble::assemble_directory(&source, &dest, Some("mix"), &settings, &mut rng)?;

        assert_eq!(report.track_count, 2);
        assert_eq!(report.total_ms, 9_000);

        let tracklist = fs::read_to_string(&report.tracklist_path)?;
        assert_eq!(tracklist, "00:00:00 - a.wav\n00:00:05 - b.wav");

        // The exported audio really is 9 seconds long.
        let decoded = codec::decode_file(&report.audio_path)?;
        assert_eq!(decoded.duration_ms(), 9_000);
        Ok(())
    }

    #[test]
    fn test_no_target_packs_everything() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("source");
        let dest = temp.path().join("dest");
        fs::create_dir(&source)?;
        for i in 0..3 {
            write_test_wav(&source.join(format!("t{i}.wav")), 1_000, 8_000);
        }

        let mut rng = StdRng::seed_from_u64(1);
        let report =
            assemble::assemble_directory(&source, &dest, Some("all"), &flat_settings(None), &mut rng)?;
        assert_eq!(report.track_count, 3);
        assert_eq!(report.total_ms, 3_000);
        Ok(())
    }

    #[test]
    fn test_output_named_after_destination() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("source");
        let dest = temp.path().join("roadtrip");
        fs::create_dir(&source)?;
        write_test_wav(&source.join("a.wav"), 500, 8_000);

        let mut rng = StdRng::seed_from_u64(1);
        let report =
            assemble::assemble_directory(&source, &dest, None, &flat_settings(None), &mut rng)?;

        assert!(report.audio_path.ends_with("roadtrip.wav"));
        assert!(report.tracklist_path.ends_with("roadtrip_audio_list.txt"));
        assert!(report.audio_path.is_file());
        Ok(())
    }

    #[test]
    fn test_missing_source_directory() {
        let temp = TempDir::new().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = assemble::assemble_directory(
            &temp.path().join("does-not-exist"),
            &temp.path().join("dest"),
            Some("x"),
            &flat_settings(None),
            &mut rng,
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<MedleyError>(),
            Some(MedleyError::NoSourceDirectory(_))
        ));
    }

    #[test]
    fn test_source_without_audio_files() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("liner-notes.txt"), "not audio").unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let err = assemble::assemble_directory(
            &source,
            &temp.path().join("dest"),
            Some("x"),
            &flat_settings(None),
            &mut rng,
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<MedleyError>(),
            Some(MedleyError::NoEligibleFiles(_))
        ));
    }

    /// MP3 export goes through LAME; 8 kHz fixtures would be rejected for
    /// a 192 kbps bitrate, so this uses a 44.1 kHz tone.
    #[test]
    fn test_mp3_export_smoke() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("source");
        let dest = temp.path().join("dest");
        fs::create_dir(&source)?;
        write_test_wav(&source.join("tone.wav"), 500, 44_100);

        let settings = AssemblySettings {
            format: OutputFormat::Mp3,
            ..flat_settings(None)
        };
        let mut rng = StdRng::seed_from_u64(1);
        let report = assemble::assemble_directory(&source, &dest, Some("mix"), &settings, &mut rng)?;

        assert!(report.audio_path.ends_with("mix.mp3"));
        let bytes = fs::read(&report.audio_path)?;
        assert!(!bytes.is_empty());
        Ok(())
    }
}

#[cfg(test)]
mod batch_tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Two days over four 1-second tracks with a 1.5-second limit: each
    /// day packs exactly two tracks, counts accumulate across days and
    /// land in the ledger file, and tracklists carry full paths.
    #[test]
    fn test_two_day_batch_accumulates_usage() -> Result<()> {
        let temp = TempDir::new()?;
        let music = temp.path().join("music");
        fs::create_dir(&music)?;
        let mut paths = Vec::new();
        for i in 0..4 {
            let path = music.join(format!("t{i}.wav"));
            write_test_wav(&path, 1_000, 8_000);
            paths.push(path.to_string_lossy().into_owned());
        }
        let folder = music.to_string_lossy().into_owned();
        let ledger_path = temp.path().join("usage.db");
        let row_specs: Vec<(&str, &str, u32, bool)> =
            paths.iter().map(|p| (p.as_str(), folder.as_str(), 0, false)).collect();
        create_test_ledger(&ledger_path, &row_specs)?;

        let dest = temp.path().join("daily");
        let config = BatchConfig {
            start: date(2026, 3, 1),
            end: date(2026, 3, 2),
            ledger_path: ledger_path.clone(),
            dest: dest.clone(),
        };
        let sampler = SamplerSettings {
            seed: Some(7),
            ..SamplerSettings::default()
        };
        // Shuffled order, so which two tracks pack can differ between the
        // days; the totals below hold either way.
        let assembly = AssemblySettings {
            shuffle: true,
            ..flat_settings(Some(1_500))
        };
        let summary = batch::run(&config, &assembly, &sampler)?;

        assert_eq!(summary.generated, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.failed, 0);
        assert!(dest.join("2026-03-01.wav").is_file());
        assert!(dest.join("2026-03-02.wav").is_file());

        // 1.5 s limit over 1 s tracks: the second track always crosses,
        // so every day packs exactly two.
        let ledger = UsageLedger::open(&ledger_path)?;
        let entries = ledger.load()?;
        let total_usage: u32 = entries.iter().map(|e| e.n_usage).sum();
        assert_eq!(total_usage, 4);
        assert!(entries.iter().all(|e| e.n_usage <= 2));

        // Weighted-mode tracklists label tracks with their full path.
        let tracklist = fs::read_to_string(dest.join("2026-03-01_audio_list.txt"))?;
        assert_eq!(tracklist.lines().count(), 2);
        for line in tracklist.lines() {
            assert!(line.contains(&folder), "expected full path in {line:?}");
            assert!(line.starts_with("00:00:0"));
        }
        Ok(())
    }

    /// Tombstoned rows are never sampled and never modified, even across
    /// a batch that updates their neighbors.
    #[test]
    fn test_tombstoned_rows_survive_untouched() -> Result<()> {
        let temp = TempDir::new()?;
        let music = temp.path().join("music");
        fs::create_dir(&music)?;
        let active = music.join("active.wav");
        write_test_wav(&active, 500, 8_000);
        let active_path = active.to_string_lossy().into_owned();
        let folder = music.to_string_lossy().into_owned();

        let ledger_path = temp.path().join("usage.db");
        create_test_ledger(
            &ledger_path,
            &[
                (active_path.as_str(), folder.as_str(), 0, false),
                ("/gone/old.wav", "/gone", 9, true),
            ],
        )?;

        let config = BatchConfig {
            start: date(2026, 3, 1),
            end: date(2026, 3, 1),
            ledger_path: ledger_path.clone(),
            dest: temp.path().join("daily"),
        };
        let summary = batch::run(&config, &flat_settings(None), &SamplerSettings::default())?;
        assert_eq!(summary.generated, 1);

        let entries = UsageLedger::open(&ledger_path)?.load()?;
        let tombstone = entries.iter().find(|e| e.deleted_renamed).unwrap();
        assert_eq!(tombstone.music_path, "/gone/old.wav");
        assert_eq!(tombstone.n_usage, 9);

        let used = entries.iter().find(|e| !e.deleted_renamed).unwrap();
        assert_eq!(used.n_usage, 1);
        Ok(())
    }

    /// Ledger rows whose files are gone from disk are skipped at decode
    /// time; the date still produces a (silent, empty) compilation and no
    /// counts move.
    #[test]
    fn test_ledger_rows_without_files_produce_empty_day() -> Result<()> {
        let temp = TempDir::new()?;
        let ledger_path = temp.path().join("usage.db");
        create_test_ledger(
            &ledger_path,
            &[
                ("/vanished/one.wav", "/vanished", 0, false),
                ("/vanished/two.wav", "/vanished", 0, false),
            ],
        )?;

        let dest = temp.path().join("daily");
        let config = BatchConfig {
            start: date(2026, 3, 1),
            end: date(2026, 3, 1),
            ledger_path: ledger_path.clone(),
            dest: dest.clone(),
        };
        let summary = batch::run(&config, &flat_settings(None), &SamplerSettings::default())?;

        assert_eq!(summary.generated, 1);
        assert_eq!(fs::read_to_string(dest.join("2026-03-01_audio_list.txt"))?, "");
        // A bare WAV header, no frames.
        assert_eq!(fs::metadata(dest.join("2026-03-01.wav"))?.len(), 44);

        let entries = UsageLedger::open(&ledger_path)?.load()?;
        assert!(entries.iter().all(|e| e.n_usage == 0));
        Ok(())
    }

    #[test]
    fn test_folder_allow_list_restricts_sampling() -> Result<()> {
        let temp = TempDir::new()?;
        let rock = temp.path().join("rock");
        let jazz = temp.path().join("jazz");
        fs::create_dir(&rock)?;
        fs::create_dir(&jazz)?;
        let rock_track = rock.join("r.wav");
        let jazz_track = jazz.join("j.wav");
        write_test_wav(&rock_track, 500, 8_000);
        write_test_wav(&jazz_track, 500, 8_000);

        let rock_path = rock_track.to_string_lossy().into_owned();
        let jazz_path = jazz_track.to_string_lossy().into_owned();
        let rock_folder = rock.to_string_lossy().into_owned();
        let jazz_folder = jazz.to_string_lossy().into_owned();

        let ledger_path = temp.path().join("usage.db");
        create_test_ledger(
            &ledger_path,
            &[
                (rock_path.as_str(), rock_folder.as_str(), 0, false),
                (jazz_path.as_str(), jazz_folder.as_str(), 0, false),
            ],
        )?;

        let config = BatchConfig {
            start: date(2026, 3, 1),
            end: date(2026, 3, 1),
            ledger_path: ledger_path.clone(),
            dest: temp.path().join("daily"),
        };
        let sampler = SamplerSettings {
            include_folders: vec![jazz_folder],
            ..SamplerSettings::default()
        };
        batch::run(&config, &flat_settings(None), &sampler)?;

        let entries = UsageLedger::open(&ledger_path)?.load()?;
        let rock_entry = entries.iter().find(|e| e.music_path == rock_path).unwrap();
        let jazz_entry = entries.iter().find(|e| e.music_path == jazz_path).unwrap();
        assert_eq!(rock_entry.n_usage, 0);
        assert_eq!(jazz_entry.n_usage, 1);
        Ok(())
    }
}

#[cfg(test)]
mod ledger_workflow_tests {
    use super::*;
    use medley::library;
    use std::collections::HashSet;

    /// init-ledger then update-ledger as library calls: a rescan after
    /// adding a file registers only the new one, and mark-missing
    /// tombstones a deleted one.
    #[test]
    fn test_scan_register_rescan_flow() -> Result<()> {
        let temp = TempDir::new()?;
        let music = temp.path().join("music");
        fs::create_dir_all(music.join("albums"))?;
        write_test_wav(&music.join("one.wav"), 200, 8_000);
        write_test_wav(&music.join("albums").join("two.wav"), 200, 8_000);

        let ledger_path = temp.path().join("usage.db");
        let mut ledger = UsageLedger::create(&ledger_path)?;
        let scanned = library::scan_library(&music)?;
        assert_eq!(ledger.insert_tracks(&scanned)?, 2);
        assert_eq!(ledger.stats()?.total, 2);

        // A new file appears; only it gets registered.
        write_test_wav(&music.join("three.wav"), 200, 8_000);
        let rescanned = library::scan_library(&music)?;
        assert_eq!(ledger.insert_tracks(&rescanned)?, 1);
        assert_eq!(ledger.stats()?.total, 3);

        // A file disappears; mark-missing tombstones exactly it.
        fs::remove_file(music.join("one.wav"))?;
        let after_delete = library::scan_library(&music)?;
        let existing: HashSet<String> =
            after_delete.iter().map(|t| t.music_path.clone()).collect();
        assert_eq!(ledger.mark_missing(&existing)?, 1);

        let stats = ledger.stats()?;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.active, 2);
        Ok(())
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn medley_bin() -> Command {
        Command::new(env!("CARGO_BIN_EXE_medley"))
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = medley_bin()
            .arg("--help")
            .output()
            .expect("Failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("medley"));
        assert!(stdout.contains("compile"));
        assert!(stdout.contains("batch"));
        assert!(stdout.contains("init-ledger"));
        assert!(stdout.contains("status"));
    }

    #[test]
    fn test_cli_version_flag() {
        let output = medley_bin()
            .arg("--version")
            .output()
            .expect("Failed to run version command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("medley"));
        assert!(stdout.contains("1.2.0"));
    }

    #[test]
    fn test_completion_generation() {
        let output = medley_bin()
            .args(["completion", "bash"])
            .output()
            .expect("Failed to run completion command");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("_medley"));
        assert!(stdout.contains("complete"));
    }

    #[test]
    fn test_init_ledger_and_status_workflow() -> Result<()> {
        let temp = TempDir::new()?;
        let music = temp.path().join("music");
        fs::create_dir(&music)?;
        write_test_wav(&music.join("a.wav"), 200, 8_000);
        write_test_wav(&music.join("b.wav"), 200, 8_000);
        let ledger_path = temp.path().join("usage.db");

        let init = medley_bin()
            .arg("init-ledger")
            .arg(&music)
            .arg("--ledger")
            .arg(&ledger_path)
            .output()?;
        assert!(init.status.success());
        let stdout = String::from_utf8_lossy(&init.stdout);
        assert!(stdout.contains("2 tracks"));

        // Re-initializing without --force must refuse.
        let again = medley_bin()
            .arg("init-ledger")
            .arg(&music)
            .arg("--ledger")
            .arg(&ledger_path)
            .output()?;
        assert!(!again.status.success());

        let status = medley_bin()
            .arg("status")
            .arg("--ledger")
            .arg(&ledger_path)
            .output()?;
        assert!(status.status.success());
        let stdout = String::from_utf8_lossy(&status.stdout);
        assert!(stdout.contains("2 total, 2 active"));
        Ok(())
    }

    #[test]
    fn test_compile_command_end_to_end() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("source");
        let dest = temp.path().join("dest");
        fs::create_dir(&source)?;
        write_test_wav(&source.join("a.wav"), 2_000, 8_000);
        write_test_wav(&source.join("b.wav"), 1_000, 8_000);

        let output = medley_bin()
            .arg("compile")
            .arg(&source)
            .arg(&dest)
            .args(["--name", "mix", "--format", "wav", "--sorted"])
            .args(["--fade-in-ms", "0", "--fade-out-ms", "0"])
            .output()?;
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Combined audio saved to:"));
        assert!(stdout.contains("Audio list saved to:"));
        assert!(stdout.contains("Total duration of combined audio: 3 seconds"));

        let tracklist = fs::read_to_string(dest.join("mix_audio_list.txt"))?;
        assert_eq!(tracklist, "00:00:00 - a.wav\n00:00:02 - b.wav");
        Ok(())
    }
}
