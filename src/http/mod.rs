//! HTTP API for a local practice front end
//!
//! - GET /health - Health check
//! - GET/POST/DELETE /session - Inspect, start or end the student session
//! - POST /recordings/start - Begin capturing an answer
//! - POST /recordings/stop - Finish capturing and hold the recording
//! - POST /recordings/send - Convert and deliver the held recording
//! - DELETE /recordings/current - Discard the held (or running) recording

mod handlers;
mod routes;
mod state;

pub use handlers::ErrorResponse;
pub use routes::create_router;
pub use state::AppState;
