use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::{encode_wav, AudioBackend, AudioBackendConfig, AudioFormat, AudioFrame};
use crate::error::{PipelineError, Result};

/// A finished capture, held in memory until it is converted or sent.
#[derive(Debug, Clone)]
pub struct Recording {
    /// Encoded audio bytes
    pub payload: Vec<u8>,
    /// Mime type of `payload`
    pub mime_type: String,
    /// Wall-clock time between start and stop
    pub duration_ms: u64,
    /// When capture stopped
    pub created_at: DateTime<Utc>,
}

impl Recording {
    pub fn format(&self) -> AudioFormat {
        AudioFormat::from_mime(&self.mime_type)
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

#[derive(Default)]
struct CapturedAudio {
    samples: Vec<i16>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    frames: usize,
}

impl CapturedAudio {
    fn push(&mut self, frame: AudioFrame) {
        self.sample_rate.get_or_insert(frame.sample_rate);
        self.channels.get_or_insert(frame.channels);
        self.samples.extend_from_slice(&frame.samples);
        self.frames += 1;
    }
}

struct ActiveCapture {
    started: Instant,
    stop_tx: oneshot::Sender<()>,
    collector: JoinHandle<CapturedAudio>,
}

/// Captures audio from a backend into an in-memory WAV `Recording`.
///
/// The backend is held from `initialize` until `release` (or drop).
pub struct Recorder {
    backend: Box<dyn AudioBackend>,
    config: AudioBackendConfig,
    capture: Option<ActiveCapture>,
}

impl Recorder {
    pub fn new(backend: Box<dyn AudioBackend>, config: AudioBackendConfig) -> Self {
        Self {
            backend,
            config,
            capture: None,
        }
    }

    /// Acquire the input device. Calling it again while open is a no-op.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.backend.is_open() {
            debug!("{} already open", self.backend.name());
            return Ok(());
        }

        self.backend
            .open()
            .await
            .map_err(|e| PipelineError::Permission(format!("{e:#}")))?;

        info!("Recorder initialized with {}", self.backend.name());
        Ok(())
    }

    /// Begin capturing into memory.
    pub async fn start(&mut self) -> Result<()> {
        if !self.backend.is_open() {
            return Err(PipelineError::State("Initialize recorder first".into()));
        }
        if self.capture.is_some() {
            return Err(PipelineError::State("Recording already in progress".into()));
        }

        let rx = self
            .backend
            .start()
            .await
            .map_err(|e| PipelineError::Permission(format!("{e:#}")))?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let collector = tokio::spawn(collect_frames(rx, stop_rx));

        self.capture = Some(ActiveCapture {
            started: Instant::now(),
            stop_tx,
            collector,
        });

        info!("Recording started");
        Ok(())
    }

    /// Finish capture. Returns `None` when nothing was being recorded.
    pub async fn stop(&mut self) -> Result<Option<Recording>> {
        let Some(capture) = self.capture.take() else {
            return Ok(None);
        };

        let duration = capture.started.elapsed();
        let _ = capture.stop_tx.send(());

        if let Err(e) = self.backend.stop().await {
            warn!("Failed to stop {}: {:#}", self.backend.name(), e);
        }

        let captured = capture
            .collector
            .await
            .map_err(|e| PipelineError::State(format!("Capture task failed: {e}")))?;

        let sample_rate = captured.sample_rate.unwrap_or(self.config.target_sample_rate);
        let channels = captured.channels.unwrap_or(self.config.target_channels);
        let payload = encode_wav(&captured.samples, sample_rate, channels)
            .map_err(|e| PipelineError::Io(std::io::Error::other(format!("{e:#}"))))?;

        let recording = Recording {
            payload,
            mime_type: AudioFormat::Wav.mime_type().to_string(),
            duration_ms: duration.as_millis() as u64,
            created_at: Utc::now(),
        };

        info!(
            "Recording stopped: {}ms, {} frames, {} bytes",
            recording.duration_ms,
            captured.frames,
            recording.size()
        );

        Ok(Some(recording))
    }

    pub fn is_active(&self) -> bool {
        self.capture.is_some()
    }

    /// Running time of the current capture
    pub fn elapsed(&self) -> Option<Duration> {
        self.capture.as_ref().map(|c| c.started.elapsed())
    }

    /// Abandon any capture and give the device back.
    pub fn release(&mut self) {
        if let Some(capture) = self.capture.take() {
            capture.collector.abort();
            debug!("Discarded in-progress recording on release");
        }
        if self.backend.is_open() {
            self.backend.release();
            info!("Recorder released {}", self.backend.name());
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.release();
    }
}

async fn collect_frames(
    mut rx: mpsc::Receiver<AudioFrame>,
    mut stop_rx: oneshot::Receiver<()>,
) -> CapturedAudio {
    let mut captured = CapturedAudio::default();

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(frame) => captured.push(frame),
                // Source exhausted; keep what we have until stop.
                None => break,
            },
            _ = &mut stop_rx => {
                while let Ok(frame) = rx.try_recv() {
                    captured.push(frame);
                }
                break;
            }
        }
    }

    captured
}
