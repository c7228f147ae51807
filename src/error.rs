use thiserror::Error;

/// Errors surfaced by the recording, sending and session components.
///
/// Conversion failures and cache faults are deliberately absent: those
/// layers log and degrade instead of returning an error.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Audio device access denied, missing, or unsupported.
    #[error("Audio input unavailable: {0}")]
    Permission(String),

    /// Operation invoked out of order (e.g. start before initialize).
    #[error("Invalid recorder state: {0}")]
    State(String),

    /// Payload exceeds the upload ceiling; checked before any I/O.
    #[error("{kind} exceeds {limit_mb}MB limit ({size} bytes)")]
    SizeLimit {
        kind: &'static str,
        size: usize,
        limit_mb: usize,
    },

    /// Remote endpoint failure, carrying the endpoint's own description.
    #[error("{0}")]
    Remote(String),

    /// Caller-supplied data rejected before any work was done.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No active session")]
    NoActiveSession,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
