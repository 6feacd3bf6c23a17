//! Ordered audio concatenation
//!
//! Clips are decoded in plan order, each followed by its pause rendered as
//! silence, and the result is written as one 16-bit PCM WAV file. The first
//! clip fixes the output channel count and sample rate; later clips are mixed
//! and resampled into that format.
//!
//! Every clip is decoded before anything touches the output path, and the
//! file is written beside its target and renamed over it, so a failed merge
//! never leaves a truncated deliverable behind.

use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Magic bytes at the start of a RIFF/WAV file
const RIFF_MAGIC: &[u8] = b"RIFF";

/// Frames handed to the resampler per call
const RESAMPLE_CHUNK: usize = 1024;

/// Ordered clips with the pause that follows each one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcatenationPlan {
    clips: Vec<PathBuf>,
    pauses: Vec<u32>,
}

impl ConcatenationPlan {
    /// Create an empty plan
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a plan from parallel clip and pause lists
    ///
    /// The lengths are not checked here; [`merge`](Self::merge) rejects a
    /// mismatch before decoding anything.
    #[must_use]
    pub const fn from_parts(clips: Vec<PathBuf>, pauses: Vec<u32>) -> Self {
        Self { clips, pauses }
    }

    /// Append a clip followed by `pause_ms` of silence
    pub fn add(&mut self, clip: impl Into<PathBuf>, pause_ms: u32) {
        self.clips.push(clip.into());
        self.pauses.push(pause_ms);
    }

    /// Append a clip if synthesis produced one
    ///
    /// Fragments that were entirely ignorable yield no clip and are skipped
    /// along with their pause.
    pub fn add_optional(&mut self, clip: Option<PathBuf>, pause_ms: u32) {
        if let Some(clip) = clip {
            self.add(clip, pause_ms);
        }
    }

    /// Number of clips
    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// True when the plan holds no clips
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Clips in playback order
    #[must_use]
    pub fn clips(&self) -> &[PathBuf] {
        &self.clips
    }

    /// Pauses in milliseconds, one per clip
    #[must_use]
    pub fn pauses(&self) -> &[u32] {
        &self.pauses
    }

    /// Decode every clip and write the concatenation to `output`
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyInput`] if the plan has no clips (no file is created)
    /// - [`Error::ClipCountMismatch`] if clips and pauses differ in length
    /// - [`Error::Decode`] naming the first clip that cannot be read
    /// - [`Error::Encode`] or [`Error::Io`] if the output cannot be written
    pub fn merge(&self, output: &Path) -> Result<PathBuf> {
        if self.clips.is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.clips.len() != self.pauses.len() {
            return Err(Error::ClipCountMismatch {
                clips: self.clips.len(),
                pauses: self.pauses.len(),
            });
        }

        let mut decoded = Vec::with_capacity(self.clips.len());
        for clip in &self.clips {
            decoded.push(decode_clip(clip)?);
        }

        let (channels, sample_rate) = (decoded[0].channels, decoded[0].sample_rate);
        let mut samples = Vec::new();
        for ((pcm, clip), &pause) in decoded.into_iter().zip(&self.clips).zip(&self.pauses) {
            let pcm = pcm.convert(channels, sample_rate, clip)?;
            samples.extend_from_slice(&pcm.samples);
            samples.extend(silence(pause, channels, sample_rate));
        }

        write_wav(output, &samples, channels, sample_rate)?;
        tracing::debug!(
            path = %output.display(),
            clips = self.clips.len(),
            channels,
            sample_rate,
            "clips merged"
        );
        Ok(output.to_path_buf())
    }
}

/// Interleaved PCM in `[-1.0, 1.0]`
#[derive(Debug, Clone, PartialEq)]
struct Pcm {
    channels: u16,
    sample_rate: u32,
    samples: Vec<f32>,
}

impl Pcm {
    fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Convert into the given channel layout and sample rate
    fn convert(self, channels: u16, sample_rate: u32, path: &Path) -> Result<Self> {
        let mixed = if self.channels == channels {
            self
        } else {
            remix(&self, channels)
        };

        if mixed.sample_rate == sample_rate {
            return Ok(mixed);
        }

        let samples = resample(&mixed, sample_rate).map_err(|reason| Error::Decode {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(Self {
            channels,
            sample_rate,
            samples,
        })
    }
}

/// Remap interleaved samples onto `channels` output channels
///
/// Mono output averages every input channel; otherwise each output channel
/// takes the matching input channel, repeating the last one when the input
/// has fewer.
fn remix(pcm: &Pcm, channels: u16) -> Pcm {
    let from = usize::from(pcm.channels.max(1));
    let to = usize::from(channels.max(1));
    let mut samples = Vec::with_capacity(pcm.frames() * to);

    for frame in pcm.samples.chunks_exact(from) {
        if to == 1 {
            #[allow(clippy::cast_precision_loss)]
            let mean = frame.iter().sum::<f32>() / from as f32;
            samples.push(mean);
        } else {
            samples.extend((0..to).map(|c| frame[c.min(from - 1)]));
        }
    }

    Pcm {
        channels,
        sample_rate: pcm.sample_rate,
        samples,
    }
}

/// Resample interleaved PCM with rubato
///
/// The final partial chunk is zero-padded and the resampler's delay is
/// trimmed, so the output length tracks the input duration.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn resample(pcm: &Pcm, to_rate: u32) -> std::result::Result<Vec<f32>, String> {
    use rubato::{FftFixedIn, Resampler};

    let channels = usize::from(pcm.channels.max(1));
    let frames = pcm.frames();
    let expected =
        (frames as u64 * u64::from(to_rate)).div_ceil(u64::from(pcm.sample_rate)) as usize;
    if frames == 0 {
        return Ok(Vec::new());
    }

    let mut resampler = FftFixedIn::<f64>::new(
        pcm.sample_rate as usize,
        to_rate as usize,
        RESAMPLE_CHUNK,
        2,
        channels,
    )
    .map_err(|e| format!("resampler init failed: {e}"))?;

    let mut planar: Vec<Vec<f64>> = vec![Vec::with_capacity(frames); channels];
    for frame in pcm.samples.chunks_exact(channels) {
        for (channel, &sample) in planar.iter_mut().zip(frame) {
            channel.push(f64::from(sample));
        }
    }

    let delay = resampler.output_delay();
    let mut output: Vec<Vec<f64>> = vec![Vec::with_capacity(expected + delay); channels];
    let mut position = 0;

    while output[0].len() < expected + delay {
        let needed = resampler.input_frames_next();
        let chunk: Vec<Vec<f64>> = planar
            .iter()
            .map(|channel| {
                let mut chunk: Vec<f64> = channel
                    .iter()
                    .skip(position)
                    .take(needed)
                    .copied()
                    .collect();
                chunk.resize(needed, 0.0);
                chunk
            })
            .collect();
        position += needed;

        let result = resampler
            .process(&chunk, None)
            .map_err(|e| format!("resample failed: {e}"))?;
        for (out, produced) in output.iter_mut().zip(result) {
            out.extend(produced);
        }
    }

    let mut samples = Vec::with_capacity(expected * channels);
    for index in delay..delay + expected {
        for channel in &output {
            samples.push(channel[index] as f32);
        }
    }
    Ok(samples)
}

/// Interleaved silence lasting `pause_ms`
fn silence(pause_ms: u32, channels: u16, sample_rate: u32) -> impl Iterator<Item = f32> {
    let frames = u64::from(pause_ms) * u64::from(sample_rate) / 1000;
    let count = frames * u64::from(channels);
    std::iter::repeat_n(0.0, usize::try_from(count).unwrap_or(usize::MAX))
}

/// Decode an MP3 or WAV clip, sniffing the container from its header
fn decode_clip(path: &Path) -> Result<Pcm> {
    let data = std::fs::read(path).map_err(|e| Error::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let decoded = if data.starts_with(RIFF_MAGIC) {
        decode_wav(&data)
    } else {
        decode_mp3(&data)
    };

    decoded.map_err(|reason| Error::Decode {
        path: path.to_path_buf(),
        reason,
    })
}

fn decode_wav(data: &[u8]) -> std::result::Result<Pcm, String> {
    let reader = hound::WavReader::new(Cursor::new(data)).map_err(|e| e.to_string())?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?,
        hound::SampleFormat::Int => {
            #[allow(clippy::cast_precision_loss)]
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| e.to_string())?
        }
    };

    Ok(Pcm {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        samples,
    })
}

/// Decode every MP3 frame
///
/// Consecutive frames sharing a format form one run; runs are then joined in
/// the format of the first frame.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn decode_mp3(data: &[u8]) -> std::result::Result<Pcm, String> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(data));
    let mut runs: Vec<Pcm> = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                let channels = frame.channels as u16;
                let sample_rate = frame.sample_rate as u32;
                let samples = frame.data.iter().map(|&s| f32::from(s) / 32768.0);
                match runs.last_mut() {
                    Some(run) if run.channels == channels && run.sample_rate == sample_rate => {
                        run.samples.extend(samples);
                    }
                    _ => runs.push(Pcm {
                        channels,
                        sample_rate,
                        samples: samples.collect(),
                    }),
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(format!("MP3 decode error: {e}")),
        }
    }

    join_runs(runs)
}

/// Append every run to the first, remixed and resampled into its format
fn join_runs(runs: Vec<Pcm>) -> std::result::Result<Pcm, String> {
    let mut runs = runs.into_iter();
    let mut joined = runs.next().ok_or_else(|| "no audio frames".to_string())?;

    for run in runs {
        let run = if run.channels == joined.channels {
            run
        } else {
            remix(&run, joined.channels)
        };
        if run.sample_rate == joined.sample_rate {
            joined.samples.extend(run.samples);
        } else {
            joined.samples.extend(resample(&run, joined.sample_rate)?);
        }
    }

    Ok(joined)
}

/// Encode 16-bit PCM into a temp file beside `output`, then rename over it
fn write_wav(output: &Path, samples: &[f32], channels: u16, sample_rate: u32) -> Result<()> {
    let encode_err = |reason: String| Error::Encode {
        path: output.to_path_buf(),
        reason,
    };

    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut writer = hound::WavWriter::new(BufWriter::new(temp.as_file_mut()), spec)
            .map_err(|e| encode_err(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| encode_err(e.to_string()))?;
        }

        writer.finalize().map_err(|e| encode_err(e.to_string()))?;
    }

    temp.persist(output)
        .map_err(|e| encode_err(e.error.to_string()))?;
    Ok(())
}
