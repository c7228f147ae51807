pub mod audio;
pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod recording;
pub mod session;
pub mod telegram;
pub mod tts;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFormat, AudioFrame,
    AudioSource, FileBackend,
};
pub use cache::{AudioCache, CacheKey, CacheStats, DiskStore, DurableStore};
pub use config::Config;
pub use convert::{ConversionResult, Converter, EngineStatus, FfmpegEngine, TranscodeEngine};
pub use error::{PipelineError, Result};
pub use http::{create_router, AppState};
pub use pipeline::{PracticePipeline, QuestionContext, SubmissionReceipt};
pub use recording::{Recorder, Recording};
pub use session::{SessionConfig, SessionStore, StudentSession};
pub use telegram::{BotTransport, TelegramSender};
pub use tts::{CachedSpeech, SpeechSynthesizer, StreamElementsTts};
