//! Student session management
//!
//! A session identifies the student (name + photo) and gates recording and
//! sending for a bounded time:
//! - One session per store; creating a new one overwrites the old
//! - Validity checked lazily on every read (default window: 8 hours)
//! - Persisted as a single JSON record

mod clock;
mod config;
mod identification;
mod session;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SessionConfig, SESSION_FILE_NAME};
pub use identification::IdentificationPhoto;
pub use session::{format_duration, generate_session_id, StudentSession};
pub use store::SessionStore;
