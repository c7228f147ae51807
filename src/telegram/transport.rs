use reqwest::multipart;
use tracing::debug;

use super::messages::{ApiResponse, SendRequest, TextMessage};
use crate::error::{PipelineError, Result};

/// Network side of the sender; swapped for a spy in tests.
#[async_trait::async_trait]
pub trait BotTransport: Send + Sync {
    async fn send_message(&self, message: &TextMessage) -> Result<ApiResponse>;

    async fn upload(&self, request: SendRequest) -> Result<ApiResponse>;
}

/// Bot API over HTTPS
pub struct HttpTransport {
    api_base: String,
    token: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub const DEFAULT_API_BASE: &'static str = "https://api.telegram.org";

    pub fn new(api_base: &str, token: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn parse(resp: reqwest::Response) -> Result<ApiResponse> {
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| {
                PipelineError::Remote(format!("Failed to read response: {}", e.without_url()))
            })?;

        serde_json::from_slice::<ApiResponse>(&body).map_err(|_| {
            PipelineError::Remote(format!(
                "Telegram API error {}: {}",
                status,
                String::from_utf8_lossy(&body).trim()
            ))
        })
    }
}

#[async_trait::async_trait]
impl BotTransport for HttpTransport {
    async fn send_message(&self, message: &TextMessage) -> Result<ApiResponse> {
        let resp = self
            .client
            .post(self.url("sendMessage"))
            .json(message)
            .send()
            .await
            .map_err(|e| PipelineError::Remote(format!("Request failed: {}", e.without_url())))?;

        Self::parse(resp).await
    }

    async fn upload(&self, request: SendRequest) -> Result<ApiResponse> {
        debug!(
            bytes = request.payload.len(),
            file = %request.file_name,
            "Uploading to {}",
            request.kind.method()
        );

        let part = multipart::Part::bytes(request.payload)
            .file_name(request.file_name)
            .mime_str(&request.mime_type)
            .map_err(|e| PipelineError::Remote(format!("Invalid mime type: {e}")))?;

        let mut form = multipart::Form::new()
            .text("chat_id", request.chat_id)
            .part(request.kind.field(), part);

        if let Some(caption) = request.caption {
            form = form.text("caption", caption).text("parse_mode", "HTML");
        }

        let resp = self
            .client
            .post(self.url(request.kind.method()))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::Remote(format!("Request failed: {}", e.without_url())))?;

        Self::parse(resp).await
    }
}
