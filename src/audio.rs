//! # Audio Clip Model
//!
//! In-memory audio representation shared by the decoder, the fade processor
//! and the timeline packer. Samples are interleaved `f64` in the -1.0..=1.0
//! range; the struct also carries channel count and sample rate so clips
//! from heterogeneous sources can be concatenated.
//!
//! ## Concatenation Rules
//!
//! A compilation adopts the layout (channel count + sample rate) of the
//! first clip appended to it. Every later clip is converted before the
//! append: channel mismatches are resolved by averaging down to mono and
//! duplicating up to the target count, rate mismatches by
//! linear-interpolation resampling. Good enough for speech/music playlists;
//! this is not a mastering-grade resampler.

/// Interleaved PCM audio with its layout.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Interleaved samples, `frames * channels` entries.
    pub samples: Vec<f64>,
    /// Channel count, at least 1 for any non-default clip.
    pub channels: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for AudioClip {
    fn default() -> Self {
        Self::silent(2, 44_100)
    }
}

impl AudioClip {
    /// An empty clip with the given layout. Duration is zero until samples
    /// are appended.
    pub fn silent(channels: usize, sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            channels,
            sample_rate,
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }

    /// Clip length in whole milliseconds, `frames * 1000 / rate`.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames() as u64 * 1000 / u64::from(self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Ramp the first `ms` milliseconds linearly from silence to full
    /// amplitude. Clamped to the clip length; a window of 0 is a no-op.
    pub fn fade_in(&mut self, ms: u64) {
        let window = self.window_frames(ms);
        if window == 0 {
            return;
        }
        for frame in 0..window {
            let gain = frame as f64 / window as f64;
            self.scale_frame(frame, gain);
        }
    }

    /// Ramp the last `ms` milliseconds linearly from full amplitude to
    /// silence. May overlap a previous fade-in on short clips; the ramps
    /// then multiply, which is the accepted behavior for tracks shorter
    /// than the combined fade windows.
    pub fn fade_out(&mut self, ms: u64) {
        let window = self.window_frames(ms);
        if window == 0 {
            return;
        }
        let total = self.frames();
        for frame in (total - window)..total {
            let gain = (total - frame) as f64 / window as f64;
            self.scale_frame(frame, gain);
        }
    }

    /// Append another clip, converting it to this clip's layout first. An
    /// empty clip adopts the incoming layout instead of converting, so the
    /// first track defines the compilation format.
    pub fn append(&mut self, other: AudioClip) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            self.channels = other.channels;
            self.sample_rate = other.sample_rate;
            self.samples = other.samples;
            return;
        }

        let remixed = convert_channels(&other.samples, other.channels, self.channels);
        let resampled = resample_linear(
            &remixed,
            self.channels,
            other.sample_rate,
            self.sample_rate,
        );
        self.samples.extend_from_slice(&resampled);
    }

    fn window_frames(&self, ms: u64) -> usize {
        let requested = (ms * u64::from(self.sample_rate) / 1000) as usize;
        requested.min(self.frames())
    }

    fn scale_frame(&mut self, frame: usize, gain: f64) {
        let start = frame * self.channels;
        for sample in &mut self.samples[start..start + self.channels] {
            *sample *= gain;
        }
    }
}

/// Remix interleaved samples from one channel count to another. Averaging
/// down to mono first keeps the general case simple; stereo→stereo and
/// mono→mono pass through untouched.
fn convert_channels(samples: &[f64], from: usize, to: usize) -> Vec<f64> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let frames = samples.len() / from;
    let mut out = Vec::with_capacity(frames * to);
    for frame in 0..frames {
        let base = frame * from;
        let mono: f64 = samples[base..base + from].iter().sum::<f64>() / from as f64;
        for _ in 0..to {
            out.push(mono);
        }
    }
    out
}

/// Linear-interpolation resampling of interleaved samples. Simple but
/// effective for concatenation purposes; identical rates pass through.
fn resample_linear(samples: &[f64], channels: usize, from_rate: u32, to_rate: u32) -> Vec<f64> {
    if from_rate == to_rate || channels == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let src_frames = samples.len() / channels;
    let dst_frames = (src_frames as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(dst_frames * channels);

    for dst_frame in 0..dst_frames {
        let src_pos = dst_frame as f64 / ratio;
        let src_frame = src_pos.floor() as usize;
        let frac = src_pos - src_frame as f64;

        for ch in 0..channels {
            let idx0 = src_frame * channels + ch;
            let idx1 = (src_frame + 1).min(src_frames.saturating_sub(1)) * channels + ch;

            let s0 = samples.get(idx0).copied().unwrap_or(0.0);
            let s1 = samples.get(idx1).copied().unwrap_or(0.0);
            out.push(s0 + (s1 - s0) * frac);
        }
    }
    out
}
