use serde::{Deserialize, Serialize};
use std::fmt;

/// Container formats a recording or conversion result can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    Webm,
    Ogg,
    Mp4,
}

impl AudioFormat {
    /// Map a mime type (parameters such as `;codecs=opus` are ignored).
    ///
    /// Unknown types fall back to `Webm`, the default browser recorders
    /// produce.
    pub fn from_mime(mime: &str) -> Self {
        let base = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match base.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" => Self::Wav,
            "audio/mpeg" | "audio/mp3" => Self::Mp3,
            "audio/ogg" => Self::Ogg,
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Self::Mp4,
            _ => Self::Webm,
        }
    }

    /// Map a file extension, without the dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            "webm" => Some(Self::Webm),
            "ogg" | "oga" => Some(Self::Ogg),
            "mp4" | "m4a" => Some(Self::Mp4),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Webm => "audio/webm",
            Self::Ogg => "audio/ogg",
            Self::Mp4 => "audio/mp4",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Webm => "webm",
            Self::Ogg => "ogg",
            Self::Mp4 => "m4a",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
