use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Down-mix interleaved samples to mono by averaging channels.
    pub fn to_mono(&self) -> Vec<i16> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        let ch = self.channels as usize;
        self.samples
            .chunks_exact(ch)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / ch as i32) as i16
            })
            .collect()
    }
}

/// Replays a WAV file as live input, one buffer per `buffer_duration_ms`.
///
/// The stream ends when the file is exhausted; a recorder keeps measuring
/// wall-clock time until it is stopped.
pub struct FileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    audio: Option<AudioFile>,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, config: AudioBackendConfig) -> Self {
        Self {
            path: path.into(),
            config,
            audio: None,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn open(&mut self) -> Result<()> {
        if self.audio.is_some() {
            anyhow::bail!("{} is already open", self.path.display());
        }
        let path = self.path.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(&path))
            .await
            .context("WAV loader panicked")??;
        self.audio = Some(audio);
        Ok(())
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let audio = self
            .audio
            .as_ref()
            .context("File backend used before open")?;
        if self.task.is_some() {
            anyhow::bail!("Already capturing");
        }

        let (samples, channels) = if self.config.target_channels == 1 {
            (audio.to_mono(), 1)
        } else {
            (audio.samples.clone(), audio.channels)
        };
        let sample_rate = audio.sample_rate;
        let buffer_ms = self.config.buffer_duration_ms.max(1);
        let per_frame =
            ((sample_rate as u64 * channels as u64 * buffer_ms) / 1000).max(channels as u64) as usize;

        let (tx, rx) = mpsc::channel(100);

        info!(
            "Replaying {} ({}Hz, {} channels, {}ms buffers)",
            self.path.display(),
            sample_rate,
            channels,
            buffer_ms
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(buffer_ms));
            for (index, chunk) in samples.chunks(per_frame).enumerate() {
                ticker.tick().await;
                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms: index as u64 * buffer_ms,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
            debug!("File replay finished");
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.audio = None;
    }

    fn is_open(&self) -> bool {
        self.audio.is_some()
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn name(&self) -> &str {
        "WAV file replay"
    }
}
