//! # Audio File I/O
//!
//! Decoding of source tracks and encoding of finished compilations.
//!
//! Decoding goes through symphonia, so any WAV or MP3 a library realistically
//! contains can be pulled into an [`AudioClip`] regardless of bit depth or
//! channel layout. Encoding writes 16-bit PCM WAV through hound, or CBR
//! 192 kbps MP3 through the bundled LAME encoder.

use crate::audio::AudioClip;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Container format a compilation is exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// 16-bit PCM WAV.
    Wav,
    /// CBR 192 kbps MP3.
    Mp3,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Copy one packet's worth of decoded planes into the interleaved output,
/// normalizing every sample format symphonia can hand back to `f64` in
/// -1.0..=1.0.
macro_rules! interleave_planes {
    ($buf:expr, $channels:expr, $output:expr, $sample:ident => $convert:expr) => {{
        let planes = $buf.planes();
        let frames = $buf.frames();
        for frame in 0..frames {
            for ch in 0..$channels.min(planes.planes().len()) {
                let $sample = planes.planes()[ch][frame];
                $output.push($convert);
            }
        }
    }};
}

/// Decode an entire audio file into an interleaved clip.
///
/// Corrupt packets are skipped rather than aborting the decode; MP3 streams
/// in the wild routinely contain a few. Files symphonia cannot probe at all
/// (or that carry no audio track) are an error.
pub fn decode_file(path: &Path) -> Result<AudioClip> {
    let file =
        File::open(path).with_context(|| format!("Failed to open audio file {:?}", path))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("Unrecognized audio format in {:?}", path))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow!("No audio track found in {:?}", path))?;
    let track_id = track.id;

    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.unwrap_or(44_100);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .with_context(|| format!("No decoder for codec in {:?}", path))?;

    let mut samples: Vec<f64> = Vec::new();
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() != track_id {
                    continue;
                }
                match decoder.decode(&packet) {
                    Ok(decoded) => interleave_decoded(&decoded, channels, &mut samples),
                    // Skip corrupt packets, keep the rest of the stream.
                    Err(SymphoniaError::DecodeError(_)) => continue,
                    Err(e) => {
                        return Err(e)
                            .with_context(|| format!("Failed decoding packet in {:?}", path))
                    }
                }
            }
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e).with_context(|| format!("Failed reading packets of {:?}", path)),
        }
    }

    Ok(AudioClip {
        samples,
        channels,
        sample_rate,
    })
}

fn interleave_decoded(decoded: &AudioBufferRef, channels: usize, output: &mut Vec<f64>) {
    match decoded {
        AudioBufferRef::F32(buf) => interleave_planes!(buf, channels, output, s => f64::from(s)),
        AudioBufferRef::F64(buf) => interleave_planes!(buf, channels, output, s => s),
        AudioBufferRef::S8(buf) => interleave_planes!(buf, channels, output, s => f64::from(s) / 128.0),
        AudioBufferRef::S16(buf) => interleave_planes!(buf, channels, output, s => f64::from(s) / 32768.0),
        AudioBufferRef::S24(buf) => {
            interleave_planes!(buf, channels, output, s => f64::from(s.inner()) / 8_388_608.0)
        }
        AudioBufferRef::S32(buf) => {
            interleave_planes!(buf, channels, output, s => f64::from(s) / 2_147_483_648.0)
        }
        AudioBufferRef::U8(buf) => {
            interleave_planes!(buf, channels, output, s => (f64::from(s) - 128.0) / 128.0)
        }
        AudioBufferRef::U16(buf) => {
            interleave_planes!(buf, channels, output, s => (f64::from(s) - 32768.0) / 32768.0)
        }
        AudioBufferRef::U24(buf) => {
            interleave_planes!(buf, channels, output, s => (f64::from(s.inner()) - 8_388_608.0) / 8_388_608.0)
        }
        AudioBufferRef::U32(buf) => {
            interleave_planes!(buf, channels, output, s => (f64::from(s) - 2_147_483_648.0) / 2_147_483_648.0)
        }
    }
}

/// Encode a clip as 16-bit PCM WAV, returned as in-memory bytes.
pub fn encode_wav(clip: &AudioClip) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let cursor = std::io::Cursor::new(&mut output);

    let spec = hound::WavSpec {
        channels: clip.channels as u16,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer =
        hound::WavWriter::new(cursor, spec).context("Failed to initialize WAV writer")?;
    for &sample in &clip.samples {
        let s = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        writer.write_sample(s).context("Failed to write WAV sample")?;
    }
    writer.finalize().context("Failed to finalize WAV header")?;

    Ok(output)
}

/// Encode a clip as CBR 192 kbps MP3 with LAME, returned as in-memory bytes.
///
/// The mp3lame-encoder error types do not implement `std::error::Error`, so
/// every failure is stringified through `{:?}`.
pub fn encode_mp3(clip: &AudioClip) -> Result<Vec<u8>> {
    use mp3lame_encoder::{Bitrate, Builder, DualPcm, FlushNoGap, Quality};

    let mut builder = Builder::new().ok_or_else(|| anyhow!("LAME encoder init failed"))?;
    builder
        .set_num_channels(clip.channels.min(2) as u8)
        .map_err(|e| anyhow!("LAME set channels failed: {:?}", e))?;
    builder
        .set_sample_rate(clip.sample_rate)
        .map_err(|e| anyhow!("LAME set sample rate failed: {:?}", e))?;
    builder
        .set_brate(Bitrate::Kbps192)
        .map_err(|e| anyhow!("LAME set bitrate failed: {:?}", e))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| anyhow!("LAME set quality failed: {:?}", e))?;
    let mut encoder = builder
        .build()
        .map_err(|e| anyhow!("LAME build failed: {:?}", e))?;

    // LAME takes 16-bit PCM split into left/right planes; mono clips feed
    // the same plane to both sides.
    let num_frames = clip.frames();
    let mut left: Vec<i16> = Vec::with_capacity(num_frames);
    let mut right: Vec<i16> = Vec::with_capacity(num_frames);
    if clip.channels >= 2 {
        for i in 0..num_frames {
            left.push((clip.samples[i * clip.channels].clamp(-1.0, 1.0) * 32767.0) as i16);
            right.push((clip.samples[i * clip.channels + 1].clamp(-1.0, 1.0) * 32767.0) as i16);
        }
    } else {
        for &sample in &clip.samples {
            let s = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
            left.push(s);
            right.push(s);
        }
    }

    let mut mp3_output: Vec<u8> =
        Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(num_frames));

    let input = DualPcm {
        left: &left,
        right: &right,
    };
    let encoded_size = encoder
        .encode(input, mp3_output.spare_capacity_mut())
        .map_err(|e| anyhow!("LAME encode failed: {:?}", e))?;
    // SAFETY: the encoder wrote encoded_size bytes into spare capacity.
    unsafe {
        mp3_output.set_len(encoded_size);
    }

    mp3_output.reserve(7200);
    let flush_size = encoder
        .flush::<FlushNoGap>(mp3_output.spare_capacity_mut())
        .map_err(|e| anyhow!("LAME flush failed: {:?}", e))?;
    // SAFETY: the encoder wrote flush_size bytes into spare capacity.
    unsafe {
        mp3_output.set_len(mp3_output.len() + flush_size);
    }

    Ok(mp3_output)
}

/// Encode a clip in the requested format and write it to `path`.
pub fn export_clip(clip: &AudioClip, path: &Path, format: OutputFormat) -> Result<()> {
    let bytes = match format {
        OutputFormat::Wav => encode_wav(clip)?,
        OutputFormat::Mp3 => encode_mp3(clip)?,
    };
    std::fs::write(path, bytes).with_context(|| format!("Failed to write audio to {:?}", path))
}
