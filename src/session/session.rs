use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The stored identification record for the student at this client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSession {
    /// Name the student typed in
    pub name: String,

    /// Identification photo as a `data:` URL
    pub photo_data_url: String,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// `session_<epoch ms>_<9 random chars>`
    pub session_id: String,
}

impl StudentSession {
    pub fn new(name: &str, photo_data_url: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            photo_data_url: photo_data_url.to_string(),
            started_at: now,
            session_id: generate_session_id(now),
        }
    }

    /// Time since creation; zero if the clock went backwards
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).to_std().unwrap_or_default()
    }

    /// Expired once strictly more than `max_duration` has passed
    pub fn is_expired(&self, now: DateTime<Utc>, max_duration: Duration) -> bool {
        self.elapsed(now) > max_duration
    }
}

pub fn generate_session_id(now: DateTime<Utc>) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", now.timestamp_millis(), &random[..9])
}

/// `"2h 15m"`, or `"15m"` under an hour
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.as_secs() / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
