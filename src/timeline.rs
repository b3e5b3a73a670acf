//! # Timeline Packing
//!
//! Builds a compilation by appending faded tracks end to end while keeping
//! a start-offset tracklist in sync with the audio.
//!
//! The packer is a small state machine:
//!
//! * `Accepting` - tracks are faded, appended and logged in the tracklist.
//! * `Overshot` - the most recent track pushed the total past the duration
//!   limit. That track is still part of the compilation (a compilation that
//!   stops short of its target is worse than one that runs a little long),
//!   but nothing further will be accepted.
//! * `Done` - [`TimelinePacker::finish`] was called and the compilation has
//!   been taken out.
//!
//! A packer without a limit accepts everything it is offered, which is how
//! unbounded compilations ("pack the whole folder") are produced.

use crate::audio::AudioClip;

use std::mem;

/// Render a millisecond offset as a `HH:MM:SS` timestamp. Offsets of a day
/// or more keep counting hours rather than wrapping.
pub fn format_offset(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// One tracklist line: where a track starts and what to call it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    /// Start offset of the track within the compilation.
    pub start_ms: u64,
    /// Display label, a file name or a full path depending on the caller.
    pub track: String,
}

impl TimelineEntry {
    pub fn render(&self) -> String {
        format!("{} - {}", format_offset(self.start_ms), self.track)
    }
}

/// Lifecycle of a [`TimelinePacker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackerState {
    /// Still below the limit, more tracks welcome.
    Accepting,
    /// The limit was crossed; the crossing track was kept, the rest are
    /// turned away.
    Overshot,
    /// The compilation has been finished and taken.
    Done,
}

/// What happened to a pushed track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum PushOutcome {
    /// Track appended, packer still accepting.
    Accepted,
    /// Track appended and it crossed the limit; stop offering tracks.
    Finalized,
    /// Packer was not accepting, the track was dropped untouched.
    Rejected,
}

/// Accumulates faded tracks into one clip plus a matching tracklist.
#[derive(Debug)]
pub struct TimelinePacker {
    audio: AudioClip,
    entries: Vec<TimelineEntry>,
    position_ms: u64,
    fade_in_ms: u64,
    fade_out_ms: u64,
    limit_ms: Option<u64>,
    state: PackerState,
}

impl TimelinePacker {
    /// New packer. `limit_ms` of `None` means no duration limit.
    pub fn new(fade_in_ms: u64, fade_out_ms: u64, limit_ms: Option<u64>) -> Self {
        Self {
            audio: AudioClip::silent(2, 44_100),
            entries: Vec::new(),
            position_ms: 0,
            fade_in_ms,
            fade_out_ms,
            limit_ms,
            state: PackerState::Accepting,
        }
    }

    pub fn state(&self) -> PackerState {
        self.state
    }

    pub fn is_accepting(&self) -> bool {
        self.state == PackerState::Accepting
    }

    /// Total duration accumulated so far.
    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    /// Fade `clip` in and out, append it at the current position and record
    /// a tracklist entry labelled `track`.
    ///
    /// The first push always lands at offset 0. A push that carries the
    /// total strictly past the limit is still appended but returns
    /// [`PushOutcome::Finalized`]; every push after that (or after
    /// [`Self::finish`]) is rejected without touching the compilation.
    pub fn push(&mut self, track: &str, mut clip: AudioClip) -> PushOutcome {
        if !self.is_accepting() {
            return PushOutcome::Rejected;
        }

        clip.fade_in(self.fade_in_ms);
        clip.fade_out(self.fade_out_ms);

        let duration = clip.duration_ms();
        self.entries.push(TimelineEntry {
            start_ms: self.position_ms,
            track: track.to_string(),
        });
        self.audio.append(clip);
        self.position_ms += duration;

        match self.limit_ms {
            Some(limit) if self.position_ms > limit => {
                self.state = PackerState::Overshot;
                PushOutcome::Finalized
            }
            _ => PushOutcome::Accepted,
        }
    }

    /// Take the finished compilation out of the packer. The packer is left
    /// empty and permanently done.
    pub fn finish(&mut self) -> Compilation {
        self.state = PackerState::Done;
        Compilation {
            audio: mem::take(&mut self.audio),
            entries: mem::take(&mut self.entries),
            total_ms: self.position_ms,
        }
    }
}

/// A finished compilation: the combined audio and its tracklist.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub audio: AudioClip,
    pub entries: Vec<TimelineEntry>,
    pub total_ms: u64,
}

impl Compilation {
    /// The tracklist as text, one `HH:MM:SS - label` line per track, no
    /// trailing newline. Empty compilations render as the empty string.
    pub fn tracklist(&self) -> String {
        self.entries
            .iter()
            .map(TimelineEntry::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
