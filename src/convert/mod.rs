//! Optional MP3 transcoding with graceful fallback.

mod converter;
mod engine;
mod probe;

pub use converter::{AudioPayload, ConversionResult, Converter, EngineStatus, TranscodeSettings};
pub use engine::{FfmpegEngine, TranscodeEngine};
pub use probe::is_playable;
