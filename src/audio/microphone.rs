//! Microphone capture via cpal.
//!
//! The cpal stream is not `Send` on every host, so it lives on a dedicated
//! thread for the duration of a capture. Samples arrive as f32, are
//! down-mixed to mono when requested, converted to i16 and forwarded as
//! `AudioFrame`s.

use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

struct CaptureThread {
    stop_tx: std_mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Default-input-device backend
pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    device_name: Option<String>,
    capture: Option<CaptureThread>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            device_name: None,
            capture: None,
        }
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn downmix(data: &[f32], channels: u16) -> Vec<i16> {
    let ch = channels.max(1) as usize;
    data.chunks_exact(ch)
        .map(|frame| f32_to_i16(frame.iter().sum::<f32>() / ch as f32))
        .collect()
}

fn run_capture(
    target_channels: u16,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: std_mpsc::Sender<std::result::Result<(), String>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let build = || -> std::result::Result<cpal::Stream, String> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| "No default input device available".to_string())?;
        let supported = device
            .default_input_config()
            .map_err(|e| format!("Failed to get default input config: {e}"))?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let stream_config: cpal::StreamConfig = supported.into();
        let out_channels = if target_channels == 1 { 1 } else { channels };
        let started = Instant::now();

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    let samples = if out_channels == 1 {
                        downmix(data, channels)
                    } else {
                        data.iter().copied().map(f32_to_i16).collect()
                    };
                    let frame = AudioFrame {
                        samples,
                        sample_rate,
                        channels: out_channels,
                        timestamp_ms: started.elapsed().as_millis() as u64,
                    };
                    // Drop the buffer if the consumer fell behind
                    let _ = frame_tx.try_send(frame);
                },
                move |err| {
                    error!("Audio input stream error: {}", err);
                },
                None,
            )
            .map_err(|e| format!("Failed to build input stream: {e}"))?;

        stream
            .play()
            .map_err(|e| format!("Failed to start input stream: {e}"))?;

        Ok(stream)
    };

    match build() {
        Ok(stream) => {
            let _ = ready_tx.send(Ok(()));
            // Blocks until stop() signals or the backend is dropped.
            let _ = stop_rx.recv();
            drop(stream);
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn open(&mut self) -> Result<()> {
        if self.device_name.is_some() {
            bail!("Microphone is already open");
        }

        let name = tokio::task::spawn_blocking(|| -> Result<String> {
            let host = cpal::default_host();
            let device = host
                .default_input_device()
                .context("No default input device available")?;
            device
                .default_input_config()
                .context("Input device refused configuration")?;
            Ok(device.name().unwrap_or_else(|_| "unknown".into()))
        })
        .await
        .context("Device probe panicked")??;

        info!(device = %name, "Microphone opened");
        self.device_name = Some(name);
        Ok(())
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.device_name.is_none() {
            bail!("Microphone used before open");
        }
        if self.capture.is_some() {
            bail!("Already capturing");
        }

        let (frame_tx, frame_rx) = mpsc::channel(100);
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let target_channels = self.config.target_channels;

        let handle = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || run_capture(target_channels, frame_tx, ready_tx, stop_rx))
            .context("Failed to spawn capture thread")?;

        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .context("Capture readiness wait panicked")?;

        match ready {
            Ok(Ok(())) => {
                self.capture = Some(CaptureThread { stop_tx, handle });
                info!("Microphone capture started");
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                bail!(e)
            }
            Err(_) => bail!("Capture thread exited before reporting readiness"),
        }
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(capture) = self.capture.take() else {
            return Ok(());
        };

        let _ = capture.stop_tx.send(());
        tokio::task::spawn_blocking(move || {
            if capture.handle.join().is_err() {
                warn!("Capture thread panicked");
            }
        })
        .await
        .context("Capture join panicked")?;

        info!("Microphone capture stopped");
        Ok(())
    }

    fn release(&mut self) {
        if let Some(capture) = self.capture.take() {
            let _ = capture.stop_tx.send(());
            let _ = capture.handle.join();
        }
        if let Some(name) = self.device_name.take() {
            info!(device = %name, "Microphone released");
        }
    }

    fn is_open(&self) -> bool {
        self.device_name.is_some()
    }

    fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}
