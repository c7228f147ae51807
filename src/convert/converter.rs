use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use super::engine::TranscodeEngine;
use super::probe::is_playable;
use crate::audio::AudioFormat;
use crate::recording::Recording;

/// Something carrying encoded audio that can be fed to the converter.
pub trait AudioPayload {
    fn payload(&self) -> &[u8];
    fn format(&self) -> AudioFormat;
}

impl AudioPayload for Recording {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn format(&self) -> AudioFormat {
        Recording::format(self)
    }
}

/// Output of a conversion: either the transcoded audio or the input as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub payload: Vec<u8>,
    pub format: AudioFormat,
}

impl ConversionResult {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// File name for this result, e.g. `recording_q3.mp3`
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.format.extension())
    }
}

impl AudioPayload for ConversionResult {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn format(&self) -> AudioFormat {
        self.format
    }
}

/// Whether the optional engine could be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Available,
    Unavailable,
}

/// Fixed encoder settings for the MP3 target
#[derive(Debug, Clone)]
pub struct TranscodeSettings {
    pub codec: String,
    pub quality: u8,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            codec: "libmp3lame".to_string(),
            quality: 2, // VBR, high quality
            sample_rate: 44100,
            channels: 2,
        }
    }
}

impl TranscodeSettings {
    fn args(&self, input: &str, output: &str) -> Vec<String> {
        vec![
            "-i".into(),
            input.into(),
            "-codec:a".into(),
            self.codec.clone(),
            "-qscale:a".into(),
            self.quality.to_string(),
            "-ar".into(),
            self.sample_rate.to_string(),
            "-ac".into(),
            self.channels.to_string(),
            output.into(),
        ]
    }
}

const TARGET_FORMAT: AudioFormat = AudioFormat::Mp3;

/// Best-effort MP3 converter.
///
/// Never fails: when the engine is missing or a transcode goes wrong the
/// input comes back unchanged.
pub struct Converter {
    engine: Option<Arc<dyn TranscodeEngine>>,
    settings: TranscodeSettings,
    status: OnceCell<EngineStatus>,
    /// Serializes use of the engine's fixed scratch file names
    scratch: Mutex<()>,
}

impl Converter {
    pub fn new(engine: Arc<dyn TranscodeEngine>) -> Self {
        Self::with_settings(Some(engine), TranscodeSettings::default())
    }

    /// A converter with no engine; every conversion is a pass-through.
    pub fn passthrough() -> Self {
        Self::with_settings(None, TranscodeSettings::default())
    }

    pub fn with_settings(
        engine: Option<Arc<dyn TranscodeEngine>>,
        settings: TranscodeSettings,
    ) -> Self {
        Self {
            engine,
            settings,
            status: OnceCell::new(),
            scratch: Mutex::new(()),
        }
    }

    /// Load the engine once; concurrent callers share the same attempt.
    pub async fn prepare(&self) -> EngineStatus {
        *self
            .status
            .get_or_init(|| async {
                let Some(engine) = &self.engine else {
                    info!("Converter: no transcoding engine configured");
                    return EngineStatus::Unavailable;
                };

                match engine.load().await {
                    Ok(()) => {
                        info!("Converter: {} loaded successfully", engine.name());
                        EngineStatus::Available
                    }
                    Err(e) => {
                        warn!(
                            "Converter: {} not available, will use fallback: {:#}",
                            engine.name(),
                            e
                        );
                        EngineStatus::Unavailable
                    }
                }
            })
            .await
    }

    pub async fn is_conversion_available(&self) -> bool {
        self.prepare().await == EngineStatus::Available
    }

    /// Convert to MP3, or return the input unchanged.
    pub async fn convert<A: AudioPayload + ?Sized>(&self, audio: &A) -> ConversionResult {
        let original = || ConversionResult {
            payload: audio.payload().to_vec(),
            format: audio.format(),
        };

        if audio.format() == TARGET_FORMAT {
            return original();
        }

        let engine = match (self.prepare().await, &self.engine) {
            (EngineStatus::Available, Some(engine)) => engine,
            _ => {
                info!("Converter: using original format ({})", audio.format());
                return original();
            }
        };

        let _guard = self.scratch.lock().await;
        match self.transcode(engine.as_ref(), audio).await {
            Ok(payload) if is_playable(&payload, TARGET_FORMAT) => {
                info!(
                    "Converter: {} -> {} ({} -> {} bytes)",
                    audio.format(),
                    TARGET_FORMAT,
                    audio.payload().len(),
                    payload.len()
                );
                ConversionResult {
                    payload,
                    format: TARGET_FORMAT,
                }
            }
            Ok(payload) => {
                warn!(
                    "Converter: output is not playable audio ({} bytes), using original",
                    payload.len()
                );
                original()
            }
            Err(e) => {
                warn!("Converter: conversion failed, using original: {:#}", e);
                original()
            }
        }
    }

    async fn transcode<A: AudioPayload + ?Sized>(
        &self,
        engine: &dyn TranscodeEngine,
        audio: &A,
    ) -> Result<Vec<u8>> {
        let input = format!("input.{}", audio.format().extension());
        let output = format!("output.{}", TARGET_FORMAT.extension());

        engine.write_file(&input, audio.payload()).await?;
        let result = async {
            engine.exec(&self.settings.args(&input, &output)).await?;
            engine.read_file(&output).await
        }
        .await;

        for name in [&input, &output] {
            if let Err(e) = engine.delete_file(name).await {
                warn!("Converter: failed to clean up {}: {:#}", name, e);
            }
        }

        result
    }

    /// Convert and write `<stem>.<ext>` into `dir`.
    pub async fn export<A: AudioPayload + ?Sized>(
        &self,
        audio: &A,
        dir: &Path,
        stem: &str,
    ) -> Result<(PathBuf, ConversionResult)> {
        let result = self.convert(audio).await;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let path = dir.join(result.file_name(stem));
        tokio::fs::write(&path, &result.payload)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Exported audio to {}", path.display());
        Ok((path, result))
    }
}
