use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::clock::{Clock, SystemClock};
use super::config::SessionConfig;
use super::session::{format_duration, StudentSession};
use crate::error::Result;

/// Persists the single active student session.
///
/// Expiry is evaluated lazily: a stale record stays on disk until it is
/// read as inactive, cleared, or overwritten. Every accessor re-reads the
/// persisted record so two handles on the same directory agree. Writes go
/// through a temporary file and a rename, so a reader sees either the old
/// record or the new one; the last writer wins.
pub struct SessionStore {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn max_duration(&self) -> Duration {
        self.config.max_duration
    }

    /// Replace any existing session with a fresh one.
    pub async fn create_session(&self, name: &str, photo_data_url: &str) -> Result<StudentSession> {
        let session = StudentSession::new(name, photo_data_url, self.clock.now());

        tokio::fs::create_dir_all(&self.config.storage_dir).await?;
        let json = serde_json::to_vec_pretty(&session)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let path = self.config.record_path();
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        info!("Created session {} for {}", session.session_id, session.name);
        Ok(session)
    }

    /// True only if a session exists and has not outlived `max_duration`.
    pub async fn has_active_session(&self) -> bool {
        self.active_session().await.is_some()
    }

    /// The stored record, expired or not.
    pub async fn get_session(&self) -> Option<StudentSession> {
        self.load().await
    }

    /// The stored record only if it is still valid.
    pub async fn active_session(&self) -> Option<StudentSession> {
        self.load()
            .await
            .filter(|s| !s.is_expired(self.clock.now(), self.config.max_duration))
    }

    pub async fn clear_session(&self) -> Result<()> {
        match tokio::fs::remove_file(self.config.record_path()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!("Session cleared");
        Ok(())
    }

    pub async fn student_name(&self) -> String {
        self.load()
            .await
            .map(|s| s.name)
            .unwrap_or_else(|| "Unknown Student".to_string())
    }

    pub async fn session_duration(&self) -> Duration {
        self.load()
            .await
            .map(|s| s.elapsed(self.clock.now()))
            .unwrap_or_default()
    }

    pub async fn format_session_duration(&self) -> String {
        format_duration(self.session_duration().await)
    }

    async fn load(&self) -> Option<StudentSession> {
        let path = self.config.record_path();

        match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<StudentSession>(&bytes) {
                Ok(session) => Some(session),
                Err(e) => {
                    error!("Error loading session from {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                error!("Error loading session from {}: {}", path.display(), e);
                None
            }
        }
    }
}
