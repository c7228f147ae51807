pub mod backend;
pub mod file;
pub mod format;
pub mod wav;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use file::{AudioFile, FileBackend};
pub use format::AudioFormat;
pub use wav::encode_wav;
