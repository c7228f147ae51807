// HTTP control API driven through the router with `oneshot`

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use practice_audio::audio::{AudioBackend, AudioBackendConfig, AudioFrame, FileBackend};
use practice_audio::convert::Converter;
use practice_audio::pipeline::PracticePipeline;
use practice_audio::recording::Recorder;
use practice_audio::session::{SessionConfig, SessionStore};
use practice_audio::telegram::{
    ApiResponse, BotTransport, SendRequest, TelegramSender, TextMessage, UploadKind,
};
use practice_audio::{create_router, AppState, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, Notify};
use tower::ServiceExt;

#[derive(Default)]
struct SpyTransport {
    uploads: Mutex<Vec<SendRequest>>,
}

#[async_trait::async_trait]
impl BotTransport for SpyTransport {
    async fn send_message(&self, _message: &TextMessage) -> Result<ApiResponse> {
        Ok(ApiResponse {
            ok: true,
            result: None,
            description: None,
        })
    }

    async fn upload(&self, request: SendRequest) -> Result<ApiResponse> {
        self.uploads.lock().unwrap().push(request);
        Ok(ApiResponse {
            ok: true,
            result: None,
            description: None,
        })
    }
}

/// Holds audio uploads until the test lets them through
#[derive(Default)]
struct GatedTransport {
    entered: Notify,
    release: Notify,
}

#[async_trait::async_trait]
impl BotTransport for GatedTransport {
    async fn send_message(&self, _message: &TextMessage) -> Result<ApiResponse> {
        Ok(ApiResponse {
            ok: true,
            result: None,
            description: None,
        })
    }

    async fn upload(&self, request: SendRequest) -> Result<ApiResponse> {
        if request.kind == UploadKind::Audio {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(ApiResponse {
            ok: true,
            result: None,
            description: None,
        })
    }
}

/// Backend that only tracks whether the device is held
#[derive(Clone, Default)]
struct CountingBackend {
    open: Arc<AtomicBool>,
    opens: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl AudioBackend for CountingBackend {
    async fn open(&mut self) -> anyhow::Result<()> {
        self.open.store(true, Ordering::SeqCst);
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn start(&mut self) -> anyhow::Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(1);
        tx.send(AudioFrame {
            samples: vec![0; 1600],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: 0,
        })
        .await?;
        Ok(rx)
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn release(&mut self) {
        self.open.store(false, Ordering::SeqCst);
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "counting"
    }
}

struct TestApp {
    router: Router,
    spy: Arc<SpyTransport>,
    _dir: TempDir,
}

fn test_app(with_sender: bool) -> TestApp {
    let spy = Arc::new(SpyTransport::default());
    let transport = with_sender.then(|| spy.clone() as Arc<dyn BotTransport>);
    TestApp {
        spy,
        ..test_app_with(None, transport)
    }
}

/// `backend` defaults to replaying a five second tone
fn test_app_with(
    backend: Option<Box<dyn AudioBackend>>,
    transport: Option<Arc<dyn BotTransport>>,
) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = AudioBackendConfig::default();
    let backend: Box<dyn AudioBackend> = match backend {
        Some(backend) => backend,
        None => {
            let wav = common::write_tone(dir.path(), "mic.wav", 5.0, 16000, 1);
            Box::new(FileBackend::new(wav, config.clone()))
        }
    };
    let recorder = Recorder::new(backend, config);

    let sender = transport.map(|t| Arc::new(TelegramSender::with_transport(t, "42")));
    let pipeline = PracticePipeline::new(
        Arc::new(Converter::passthrough()),
        sender,
        Arc::new(SessionStore::new(SessionConfig::new(dir.path().join("sessions")))),
    );

    TestApp {
        router: create_router(AppState::new(recorder, Arc::new(pipeline))),
        spy: Arc::new(SpyTransport::default()),
        _dir: dir,
    }
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn start_session(app: &Router) {
    let (status, body) = call(
        app,
        Method::POST,
        "/session",
        Some(json!({"name": "Linh", "photo_data_url": common::PHOTO_DATA_URL})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app(true);
    let (status, body) = call(&app.router, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["recording"], false);
    assert!(body["recording_ms"].is_null());
    assert_eq!(body["converter"], false);
    assert_eq!(body["telegram"], true);
}

#[tokio::test]
async fn test_recording_requires_session() {
    let app = test_app(true);

    let (status, body) = call(&app.router, Method::POST, "/recordings/start", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No active session");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = test_app(true);

    let (_, body) = call(&app.router, Method::GET, "/session", None).await;
    assert_eq!(body["active"], false);

    start_session(&app.router).await;
    let (status, body) = call(&app.router, Method::GET, "/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], true);
    assert_eq!(body["name"], "Linh");
    assert_eq!(body["duration"], "0m");
    assert!(body.get("photo_data_url").is_none());

    let (status, _) = call(&app.router, Method::DELETE, "/session", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = call(&app.router, Method::GET, "/session", None).await;
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn test_bad_photo_is_bad_request() {
    let app = test_app(true);
    let (status, body) = call(
        &app.router,
        Method::POST,
        "/session",
        Some(json!({"name": "Linh", "photo_data_url": "nope"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid input"));
}

#[tokio::test]
async fn test_record_and_send() {
    let app = test_app(true);
    start_session(&app.router).await;

    let (status, body) = call(&app.router, Method::POST, "/recordings/start", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "recording");

    // Starting twice conflicts
    let (status, _) = call(&app.router, Method::POST, "/recordings/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let (status, body) = call(&app.router, Method::POST, "/recordings/stop", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["mime_type"], "audio/wav");
    assert!(body["duration_ms"].as_u64().unwrap() >= 300);

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/recordings/send",
        Some(json!({"question": "Do you like cooking?", "question_number": 36})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["file_name"], "recording_q36.wav");
    assert_eq!(body["format"], "wav");

    {
        let uploads = app.spy.uploads.lock().unwrap();
        // Session photo, then the answer
        assert_eq!(uploads.len(), 2);
        let caption = uploads[1].caption.as_deref().unwrap();
        assert!(caption.contains("Food &amp; Cooking"));
    }

    // The recording was consumed
    let (status, _) = call(
        &app.router,
        Method::POST,
        "/recordings/send",
        Some(json!({"question": "Q", "question_number": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_stop_without_start_conflicts() {
    let app = test_app(true);
    let (status, _) = call(&app.router, Method::POST, "/recordings/stop", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_discard_running_recording() {
    let app = test_app(true);
    start_session(&app.router).await;

    call(&app.router, Method::POST, "/recordings/start", None).await;
    let (status, _) = call(&app.router, Method::DELETE, "/recordings/current", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = call(&app.router, Method::GET, "/health", None).await;
    assert_eq!(body["recording"], false);

    let (status, _) = call(&app.router, Method::POST, "/recordings/stop", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_send_without_telegram_is_unavailable() {
    let app = test_app(false);
    start_session(&app.router).await;

    call(&app.router, Method::POST, "/recordings/start", None).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    call(&app.router, Method::POST, "/recordings/stop", None).await;

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/recordings/send",
        Some(json!({"question": "Q", "question_number": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Telegram is not configured");
}

#[tokio::test]
async fn test_device_released_after_each_take() {
    let backend = CountingBackend::default();
    let app = test_app_with(
        Some(Box::new(backend.clone())),
        Some(Arc::new(SpyTransport::default())),
    );
    start_session(&app.router).await;

    let (status, body) = call(&app.router, Method::POST, "/recordings/start", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(backend.open.load(Ordering::SeqCst));

    let (status, body) = call(&app.router, Method::POST, "/recordings/stop", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(!backend.open.load(Ordering::SeqCst));
    assert_eq!(backend.releases.load(Ordering::SeqCst), 1);

    // The next take acquires the device again
    let (status, _) = call(&app.router, Method::POST, "/recordings/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(backend.opens.load(Ordering::SeqCst), 2);

    let (status, _) = call(&app.router, Method::DELETE, "/recordings/current", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!backend.open.load(Ordering::SeqCst));
    assert_eq!(backend.releases.load(Ordering::SeqCst), 2);

    // Ending the session mid-take gives the device back too
    call(&app.router, Method::POST, "/recordings/start", None).await;
    let (status, _) = call(&app.router, Method::DELETE, "/session", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!backend.open.load(Ordering::SeqCst));
    assert_eq!(backend.releases.load(Ordering::SeqCst), 3);

    let (_, body) = call(&app.router, Method::GET, "/health", None).await;
    assert_eq!(body["recording"], false);
}

#[tokio::test]
async fn test_slow_upload_does_not_block_other_requests() {
    let gate = Arc::new(GatedTransport::default());
    let app = test_app_with(Some(Box::new(CountingBackend::default())), Some(gate.clone()));
    start_session(&app.router).await;

    call(&app.router, Method::POST, "/recordings/start", None).await;
    let (status, _) = call(&app.router, Method::POST, "/recordings/stop", None).await;
    assert_eq!(status, StatusCode::OK);

    let router = app.router.clone();
    let send = tokio::spawn(async move {
        call(
            &router,
            Method::POST,
            "/recordings/send",
            Some(json!({"question": "Q", "question_number": 1})),
        )
        .await
    });

    tokio::time::timeout(Duration::from_secs(5), gate.entered.notified())
        .await
        .expect("upload never started");

    // The upload is parked; the rest of the API keeps answering
    let (status, _) = tokio::time::timeout(
        Duration::from_secs(2),
        call(&app.router, Method::GET, "/health", None),
    )
    .await
    .expect("health blocked by send");
    assert_eq!(status, StatusCode::OK);

    let (status, body) = tokio::time::timeout(
        Duration::from_secs(2),
        call(&app.router, Method::POST, "/recordings/start", None),
    )
    .await
    .expect("start blocked by send");
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = tokio::time::timeout(
        Duration::from_secs(2),
        call(&app.router, Method::DELETE, "/recordings/current", None),
    )
    .await
    .expect("discard blocked by send");
    assert_eq!(status, StatusCode::NO_CONTENT);

    gate.release.notify_one();
    let (status, body) = send.await.unwrap();
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["file_name"], "recording_q1.wav");
}
