use serde::{Deserialize, Serialize};

/// Envelope every Bot API method responds with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Multipart field the file is uploaded under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Audio,
    Photo,
}

impl UploadKind {
    pub fn method(self) -> &'static str {
        match self {
            Self::Audio => "sendAudio",
            Self::Photo => "sendPhoto",
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Photo => "photo",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Audio => "Audio",
            Self::Photo => "Photo",
        }
    }
}

/// A file upload addressed to one chat
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub chat_id: String,
    pub kind: UploadKind,
    pub payload: Vec<u8>,
    pub caption: Option<String>,
    pub file_name: String,
    pub mime_type: String,
}

/// JSON body of `sendMessage`
#[derive(Debug, Clone, Serialize)]
pub struct TextMessage {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: &'static str,
}
