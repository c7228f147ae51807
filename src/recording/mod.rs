//! Microphone recording into in-memory `Recording`s.

mod recorder;

pub use recorder::{Recorder, Recording};
