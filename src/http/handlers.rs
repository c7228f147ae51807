use super::state::AppState;
use crate::error::PipelineError;
use crate::pipeline::{QuestionContext, SubmissionReceipt};
use crate::session::{format_duration, StudentSession};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub name: String,
    /// `data:image/...;base64,...` captured by the front end's camera
    pub photo_data_url: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl SessionResponse {
    fn inactive() -> Self {
        Self {
            active: false,
            name: None,
            session_id: None,
            started_at: None,
            duration: None,
        }
    }

    fn active(session: StudentSession) -> Self {
        let duration = format_duration(session.elapsed(Utc::now()));
        Self {
            active: true,
            name: Some(session.name),
            session_id: Some(session.session_id),
            started_at: Some(session.started_at),
            duration: Some(duration),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordingStatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StoppedRecordingResponse {
    pub status: String,
    pub duration_ms: u64,
    pub mime_type: String,
    pub size: usize,
}

#[derive(Debug, Deserialize)]
pub struct SendRecordingRequest {
    pub question: String,
    /// One-based question number
    pub question_number: usize,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Pipeline error rendered as a JSON body with a matching status code
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            PipelineError::NoActiveSession => StatusCode::UNAUTHORIZED,
            PipelineError::Permission(_) => StatusCode::FORBIDDEN,
            PipelineError::State(_) => StatusCode::CONFLICT,
            PipelineError::SizeLimit { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PipelineError::Remote(_) => StatusCode::BAD_GATEWAY,
            PipelineError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::Config(_) | PipelineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let converter = state.pipeline.converter().is_conversion_available().await;
    let recorder = state.recorder.lock().await;
    Json(serde_json::json!({
        "status": "healthy",
        "service": "practice-audio",
        "version": env!("CARGO_PKG_VERSION"),
        "recorder": recorder.backend_name(),
        "recording": recorder.is_active(),
        "recording_ms": recorder.elapsed().map(|d| d.as_millis() as u64),
        "converter": converter,
        "telegram": state.pipeline.sender().is_some(),
    }))
}

/// GET /session
pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    match state.pipeline.sessions().active_session().await {
        Some(session) => Json(SessionResponse::active(session)),
        None => Json(SessionResponse::inactive()),
    }
}

/// POST /session
/// Identify the student and start a new session
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let session = state
        .pipeline
        .start_session(&req.name, &req.photo_data_url)
        .await?;

    info!("Session started for {}", session.name);
    Ok((StatusCode::CREATED, Json(SessionResponse::active(session))))
}

/// DELETE /session
pub async fn end_session(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.pipeline.end_session().await?;
    {
        let mut recorder = state.recorder.lock().await;
        let aborted = recorder.stop().await;
        recorder.release();
        aborted?;
    }
    *state.current.lock().await = None;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recordings/start
pub async fn start_recording(
    State(state): State<AppState>,
) -> ApiResult<Json<RecordingStatusResponse>> {
    state.pipeline.require_active_session().await?;

    let mut recorder = state.recorder.lock().await;
    recorder.initialize().await?;
    recorder.start().await?;

    // A new take replaces whatever was waiting to be sent
    *state.current.lock().await = None;

    Ok(Json(RecordingStatusResponse {
        status: "recording".to_string(),
        message: format!("Recording started on {}", recorder.backend_name()),
    }))
}

/// POST /recordings/stop
pub async fn stop_recording(
    State(state): State<AppState>,
) -> ApiResult<Json<StoppedRecordingResponse>> {
    // The device is given back after every take and re-acquired on start
    let recording = {
        let mut recorder = state.recorder.lock().await;
        let stopped = recorder.stop().await;
        recorder.release();
        stopped?
    };

    let recording =
        recording.ok_or_else(|| PipelineError::State("No recording in progress".to_string()))?;

    let response = StoppedRecordingResponse {
        status: "stopped".to_string(),
        duration_ms: recording.duration_ms,
        mime_type: recording.mime_type.clone(),
        size: recording.size(),
    };
    *state.current.lock().await = Some(recording);

    Ok(Json(response))
}

/// POST /recordings/send
/// Convert and deliver the held recording; it is kept on failure so the
/// student can retry.
pub async fn send_recording(
    State(state): State<AppState>,
    Json(req): Json<SendRecordingRequest>,
) -> ApiResult<Json<SubmissionReceipt>> {
    let recording = state
        .current
        .lock()
        .await
        .clone()
        .ok_or_else(|| PipelineError::State("No recording to send".to_string()))?;

    let question = QuestionContext::new(&req.question, req.question_number, req.category.as_deref());
    let receipt = state.pipeline.submit_recording(&recording, &question).await?;

    // Only drop the take that was sent; a newer one may have replaced it
    let mut current = state.current.lock().await;
    if current.as_ref().map(|r| r.created_at) == Some(recording.created_at) {
        *current = None;
    }
    Ok(Json(receipt))
}

/// DELETE /recordings/current
pub async fn discard_recording(State(state): State<AppState>) -> ApiResult<StatusCode> {
    {
        let mut recorder = state.recorder.lock().await;
        // Nothing to keep from an aborted take
        let aborted = recorder.stop().await;
        recorder.release();
        aborted?;
    }
    *state.current.lock().await = None;
    Ok(StatusCode::NO_CONTENT)
}
