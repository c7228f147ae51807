use std::sync::Arc;
use tracing::info;

use super::messages::{ApiResponse, SendRequest, TextMessage, UploadKind};
use super::transport::{BotTransport, HttpTransport};
use crate::error::{PipelineError, Result};

pub const MAX_UPLOAD_MB: usize = 50;
pub const BYTES_PER_MB: usize = 1024 * 1024;
/// Largest payload accepted, inclusive
pub const MAX_UPLOAD_BYTES: usize = MAX_UPLOAD_MB * BYTES_PER_MB;

/// Delivers recordings, photos and notes to one Telegram chat.
///
/// No retries: a failed send is reported to the caller as-is.
pub struct TelegramSender {
    transport: Arc<dyn BotTransport>,
    chat_id: String,
}

impl TelegramSender {
    /// Sender talking to the Bot API at `api_base`.
    pub fn new(api_base: &str, bot_token: &str, chat_id: &str) -> Result<Self> {
        if bot_token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(PipelineError::Config(
                "Bot token and chat ID required".to_string(),
            ));
        }
        Ok(Self::with_transport(
            Arc::new(HttpTransport::new(api_base, bot_token)),
            chat_id,
        ))
    }

    pub fn with_transport(transport: Arc<dyn BotTransport>, chat_id: &str) -> Self {
        Self {
            transport,
            chat_id: chat_id.to_string(),
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub async fn send_text_message(&self, text: &str) -> Result<serde_json::Value> {
        let message = TextMessage {
            chat_id: self.chat_id.clone(),
            text: text.to_string(),
            parse_mode: "HTML",
        };
        let response = self.transport.send_message(&message).await?;
        handle_response(response)
    }

    pub async fn send_audio(
        &self,
        payload: Vec<u8>,
        caption: Option<&str>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<serde_json::Value> {
        self.upload(UploadKind::Audio, payload, caption, file_name, mime_type)
            .await
    }

    pub async fn send_photo(
        &self,
        payload: Vec<u8>,
        caption: Option<&str>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<serde_json::Value> {
        self.upload(UploadKind::Photo, payload, caption, file_name, mime_type)
            .await
    }

    async fn upload(
        &self,
        kind: UploadKind,
        payload: Vec<u8>,
        caption: Option<&str>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<serde_json::Value> {
        check_size(kind, payload.len())?;

        let size = payload.len();
        let request = SendRequest {
            chat_id: self.chat_id.clone(),
            kind,
            payload,
            caption: caption.filter(|c| !c.is_empty()).map(str::to_string),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
        };

        let result = handle_response(self.transport.upload(request).await?)?;
        info!("Sent {} ({} bytes) via {}", file_name, size, kind.method());
        Ok(result)
    }
}

fn check_size(kind: UploadKind, size: usize) -> Result<()> {
    if size > MAX_UPLOAD_BYTES {
        return Err(PipelineError::SizeLimit {
            kind: kind.label(),
            size,
            limit_mb: MAX_UPLOAD_MB,
        });
    }
    Ok(())
}

fn handle_response(response: ApiResponse) -> Result<serde_json::Value> {
    if !response.ok {
        return Err(PipelineError::Remote(
            response
                .description
                .unwrap_or_else(|| "Telegram API error".to_string()),
        ));
    }
    Ok(response.result.unwrap_or(serde_json::Value::Null))
}

/// HTML caption attached to a practice recording.
pub fn format_audio_caption(
    question: &str,
    question_number: usize,
    category: &str,
    duration_ms: u64,
    student_name: Option<&str>,
) -> String {
    let duration_sec = (duration_ms as f64 / 1000.0).round() as u64;

    let mut caption = format!("<b>IELTS Module 2 - Question {question_number}</b>\n\n");
    if let Some(name) = student_name {
        caption.push_str(&format!("<b>Student:</b> {}\n", escape_html(name)));
    }
    caption.push_str(&format!(
        "<b>Category:</b> {}\n<b>Question:</b> {}\n\n<b>Duration:</b> {}s",
        escape_html(category),
        escape_html(question),
        duration_sec
    ));
    caption
}

/// HTML caption announcing a new practice session.
pub fn format_session_caption(student_name: &str, module: &str, started: &str) -> String {
    format!(
        "<b>📚 New Practice Session Started</b>\n\n<b>Student:</b> {}\n<b>Module:</b> {}\n<b>Time:</b> {}",
        escape_html(student_name),
        escape_html(module),
        escape_html(started)
    )
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
