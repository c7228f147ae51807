//! Telegram Bot API delivery of recordings, photos and notes.

pub mod messages;
mod sender;
mod transport;

pub use messages::{ApiResponse, SendRequest, TextMessage, UploadKind};
pub use sender::{
    escape_html, format_audio_caption, format_session_caption, TelegramSender, MAX_UPLOAD_BYTES,
    MAX_UPLOAD_MB,
};
pub use transport::{BotTransport, HttpTransport};
