use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Student session
        .route(
            "/session",
            get(handlers::get_session)
                .post(handlers::start_session)
                .delete(handlers::end_session),
        )
        // Recording control
        .route("/recordings/start", post(handlers::start_recording))
        .route("/recordings/stop", post(handlers::stop_recording))
        .route("/recordings/send", post(handlers::send_recording))
        .route("/recordings/current", delete(handlers::discard_recording))
        // The practice page is served from a different origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
