use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the single persisted session record
pub const SESSION_FILE_NAME: &str = "student_session.json";

/// Configuration for the student session store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding the session record
    pub storage_dir: PathBuf,

    /// How long a session stays valid after creation
    /// Default: 8 hours (one teaching day)
    pub max_duration: Duration,
}

impl SessionConfig {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            ..Self::default()
        }
    }

    pub fn record_path(&self) -> PathBuf {
        self.storage_dir.join(SESSION_FILE_NAME)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".practice-audio"),
            max_duration: Duration::from_secs(8 * 60 * 60),
        }
    }
}
