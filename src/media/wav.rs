//! WAV-file devices for running the assistant without a sound card.
//!
//! `WavMicrophone` plays a recording into the session in real time and then
//! keeps sending silence. `WavRecorder` writes everything the assistant says
//! to a WAV file, honouring the scheduled start times.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::audio::INPUT_FRAME_SAMPLES;
use crate::error::{MediaDevice, MediaError};

use super::{AudioInput, AudioOutput, Microphone, PlaybackDevice};

/// Microphone backed by a WAV recording.
pub struct WavMicrophone {
    path: PathBuf,
    frame_samples: usize,
}

impl WavMicrophone {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame_samples: INPUT_FRAME_SAMPLES,
        }
    }
}

#[async_trait]
impl Microphone for WavMicrophone {
    async fn open(&self, sample_rate: u32) -> Result<Box<dyn AudioInput>, MediaError> {
        let path = self.path.clone();
        let samples = tokio::task::spawn_blocking(move || read_mono(&path, sample_rate))
            .await
            .map_err(|e| MediaError::Unavailable {
                device: MediaDevice::Microphone,
                reason: e.to_string(),
            })??;

        info!(
            path = %self.path.display(),
            samples = samples.len(),
            "Microphone recording loaded"
        );

        let period = Duration::from_secs_f64(self.frame_samples as f64 / f64::from(sample_rate));
        Ok(Box::new(WavInput {
            samples,
            position: 0,
            frame_samples: self.frame_samples,
            ticker: tokio::time::interval(period),
            stopped: false,
        }))
    }
}

struct WavInput {
    samples: Vec<f32>,
    position: usize,
    frame_samples: usize,
    ticker: tokio::time::Interval,
    stopped: bool,
}

#[async_trait]
impl AudioInput for WavInput {
    async fn next_frame(&mut self) -> Option<Vec<f32>> {
        if self.stopped {
            return None;
        }
        self.ticker.tick().await;

        let end = (self.position + self.frame_samples).min(self.samples.len());
        let mut frame = self.samples[self.position..end].to_vec();
        self.position = end;
        // Past the end of the recording: silence.
        frame.resize(self.frame_samples, 0.0);
        Some(frame)
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.samples = Vec::new();
    }
}

/// Read a WAV file as mono `f32` at `target_rate`.
fn read_mono(path: &Path, target_rate: u32) -> Result<Vec<f32>, MediaError> {
    let unavailable = |reason: String| MediaError::Unavailable {
        device: MediaDevice::Microphone,
        reason,
    };

    let mut reader = hound::WavReader::open(path)
        .map_err(|e| unavailable(format!("{}: {e}", path.display())))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| unavailable(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| unavailable(e.to_string()))?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(resample_linear(&mono, spec.sample_rate, target_rate))
}

/// Linear-interpolation resampler. Good enough for speech.
fn resample_linear(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || samples.is_empty() || from == 0 || to == 0 {
        return samples.to_vec();
    }
    let ratio = f64::from(from) / f64::from(to);
    let out_len = (samples.len() as f64 / ratio).floor() as usize;
    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = samples[idx.min(samples.len() - 1)];
            let b = samples[(idx + 1).min(samples.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

/// Speaker that records the assistant's speech into numbered WAV files.
pub struct WavRecorder {
    dir: PathBuf,
    sessions: AtomicU64,
}

impl WavRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sessions: AtomicU64::new(0),
        }
    }
}

impl AudioOutput for WavRecorder {
    fn open(&self, sample_rate: u32) -> Result<Box<dyn PlaybackDevice>, MediaError> {
        std::fs::create_dir_all(&self.dir)?;
        let n = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self.dir.join(format!("assistant-{n:03}.wav"));

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(&path, spec).map_err(|e| MediaError::Unavailable {
            device: MediaDevice::Speaker,
            reason: e.to_string(),
        })?;

        debug!(path = %path.display(), "Recording assistant speech");
        Ok(Box::new(RecordingDevice {
            writer: Some(writer),
            opened_at: Instant::now(),
            written: 0,
            sample_rate,
        }))
    }
}

struct RecordingDevice {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    opened_at: Instant,
    written: u64,
    sample_rate: u32,
}

impl PlaybackDevice for RecordingDevice {
    fn current_time(&self) -> f64 {
        self.opened_at.elapsed().as_secs_f64()
    }

    fn play_at(&mut self, samples: &[i16], start: f64) -> Result<(), MediaError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(MediaError::Unavailable {
                device: MediaDevice::Speaker,
                reason: "device closed".to_string(),
            });
        };
        let write_err = |e: hound::Error| MediaError::Unavailable {
            device: MediaDevice::Speaker,
            reason: e.to_string(),
        };

        let offset = (start.max(0.0) * f64::from(self.sample_rate)).round() as u64;
        while self.written < offset {
            writer.write_sample(0_i16).map_err(write_err)?;
            self.written += 1;
        }
        for &sample in samples {
            writer.write_sample(sample).map_err(write_err)?;
        }
        self.written += samples.len() as u64;
        Ok(())
    }

    fn close(&mut self) -> Result<(), MediaError> {
        match self.writer.take() {
            Some(writer) => writer.finalize().map_err(|e| MediaError::Unavailable {
                device: MediaDevice::Speaker,
                reason: e.to_string(),
            }),
            None => Ok(()),
        }
    }
}
