// Telegram sender against a spy transport and a mock Bot API

mod common;

use axum::{body::Bytes, http::StatusCode, routing::post, Json, Router};
use practice_audio::telegram::{
    ApiResponse, BotTransport, SendRequest, TelegramSender, TextMessage, UploadKind,
    MAX_UPLOAD_BYTES,
};
use practice_audio::{PipelineError, Result};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct SpyTransport {
    uploads: Mutex<Vec<(UploadKind, usize, Option<String>, String)>>,
    messages: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl BotTransport for SpyTransport {
    async fn send_message(&self, message: &TextMessage) -> Result<ApiResponse> {
        self.messages.lock().unwrap().push(message.text.clone());
        Ok(ApiResponse {
            ok: true,
            result: Some(json!({"message_id": 1})),
            description: None,
        })
    }

    async fn upload(&self, request: SendRequest) -> Result<ApiResponse> {
        self.uploads.lock().unwrap().push((
            request.kind,
            request.payload.len(),
            request.caption,
            request.file_name,
        ));
        Ok(ApiResponse {
            ok: true,
            result: Some(json!({"message_id": 2})),
            description: None,
        })
    }
}

fn spy_sender() -> (Arc<SpyTransport>, TelegramSender) {
    let spy = Arc::new(SpyTransport::default());
    let sender = TelegramSender::with_transport(spy.clone(), "42");
    (spy, sender)
}

#[tokio::test]
async fn test_payload_at_ceiling_is_sent() {
    let (spy, sender) = spy_sender();

    let result = sender
        .send_audio(vec![0u8; MAX_UPLOAD_BYTES], Some("caption"), "a.mp3", "audio/mpeg")
        .await
        .unwrap();

    assert_eq!(result["message_id"], 2);
    let uploads = spy.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, UploadKind::Audio);
    assert_eq!(uploads[0].1, MAX_UPLOAD_BYTES);
}

#[tokio::test]
async fn test_payload_over_ceiling_never_reaches_transport() {
    let (spy, sender) = spy_sender();

    let err = sender
        .send_audio(vec![0u8; MAX_UPLOAD_BYTES + 1], None, "a.mp3", "audio/mpeg")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::SizeLimit { .. }), "got {err:?}");

    let err = sender
        .send_photo(vec![0u8; MAX_UPLOAD_BYTES + 1], None, "p.jpg", "image/jpeg")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::SizeLimit { .. }));

    assert!(spy.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_caption_is_omitted() {
    let (spy, sender) = spy_sender();

    sender
        .send_photo(b"jpeg".to_vec(), Some(""), "p.jpg", "image/jpeg")
        .await
        .unwrap();

    let uploads = spy.uploads.lock().unwrap();
    assert_eq!(uploads[0].0, UploadKind::Photo);
    assert_eq!(uploads[0].2, None);
    assert_eq!(uploads[0].3, "p.jpg");
}

#[tokio::test]
async fn test_text_message() {
    let (spy, sender) = spy_sender();

    sender.send_text_message("<b>hi</b>").await.unwrap();
    assert_eq!(*spy.messages.lock().unwrap(), vec!["<b>hi</b>".to_string()]);
}

#[test]
fn test_sender_targets_configured_chat() {
    let sender = TelegramSender::new("http://localhost", "token", "-100123").unwrap();
    assert_eq!(sender.chat_id(), "-100123");

    let (_, sender) = spy_sender();
    assert_eq!(sender.chat_id(), "42");
}

#[test]
fn test_missing_credentials_rejected() {
    assert!(matches!(
        TelegramSender::new("http://localhost", "", "42"),
        Err(PipelineError::Config(_))
    ));
    assert!(matches!(
        TelegramSender::new("http://localhost", "token", " "),
        Err(PipelineError::Config(_))
    ));
}

#[tokio::test]
async fn test_remote_description_becomes_error_message() {
    let router = Router::new().route(
        "/botTEST/sendAudio",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"ok": false, "error_code": 400, "description": "bad request"})),
            )
        }),
    );
    let base = common::spawn_server(router).await;
    let sender = TelegramSender::new(&base, "TEST", "42").unwrap();

    let err = sender
        .send_audio(b"mp3".to_vec(), Some("caption"), "a.mp3", "audio/mpeg")
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Remote(_)));
    assert_eq!(err.to_string(), "bad request");
}

#[tokio::test]
async fn test_upload_carries_caption_and_parse_mode() {
    let captured: Arc<Mutex<Vec<u8>>> = Arc::default();
    let sink = captured.clone();
    let router = Router::new().route(
        "/botTEST/sendAudio",
        post(move |body: Bytes| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().extend_from_slice(&body);
                Json(json!({"ok": true, "result": {"message_id": 7}}))
            }
        }),
    );
    let base = common::spawn_server(router).await;
    let sender = TelegramSender::new(&base, "TEST", "42").unwrap();

    let result = sender
        .send_audio(b"mp3".to_vec(), Some("<b>Q1</b>"), "recording_q1.mp3", "audio/mpeg")
        .await
        .unwrap();
    assert_eq!(result["message_id"], 7);

    let body = String::from_utf8_lossy(&captured.lock().unwrap()).to_string();
    assert!(body.contains("name=\"chat_id\""));
    assert!(body.contains("name=\"audio\"; filename=\"recording_q1.mp3\""));
    assert!(body.contains("<b>Q1</b>"));
    assert!(body.contains("name=\"parse_mode\""));
    assert!(body.contains("HTML"));
}

#[tokio::test]
async fn test_non_json_reply_is_remote_error() {
    let router = Router::new().route(
        "/botTEST/sendMessage",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
    );
    let base = common::spawn_server(router).await;
    let sender = TelegramSender::new(&base, "TEST", "42").unwrap();

    let err = sender.send_text_message("hi").await.unwrap_err();
    assert!(matches!(err, PipelineError::Remote(_)));
    assert!(err.to_string().contains("upstream down"));
}
