use anyhow::{bail, Context, Result};
use base64::Engine;

/// Photo decoded from a `data:<mime>;base64,<data>` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentificationPhoto {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl IdentificationPhoto {
    pub fn from_data_url(data_url: &str) -> Result<Self> {
        let Some((header, data)) = data_url.split_once(',') else {
            bail!("Not a data URL");
        };
        let Some(meta) = header.strip_prefix("data:") else {
            bail!("Not a data URL");
        };

        let mut params = meta.split(';');
        let mime_type = params
            .next()
            .filter(|m| !m.is_empty())
            .unwrap_or("image/jpeg")
            .to_string();
        if !params.any(|p| p == "base64") {
            bail!("Only base64 data URLs are supported");
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .context("Invalid base64 in data URL")?;

        Ok(Self { mime_type, bytes })
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Extension matching the mime type, for upload file names
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}
