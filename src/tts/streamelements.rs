use anyhow::{bail, Context, Result};
use tracing::debug;

use super::SpeechSynthesizer;

/// Cloud speech via a StreamElements-style endpoint.
///
/// `GET <endpoint>?voice=<voice>&text=<text>` returns MP3 bytes.
pub struct StreamElementsTts {
    endpoint: String,
    client: reqwest::Client,
}

impl StreamElementsTts {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.streamelements.com/kappa/v2/speech";

    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for StreamElementsTts {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        debug!(voice, chars = text.len(), "Requesting speech");

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("voice", voice), ("text", text)])
            .send()
            .await
            .context("Speech request failed")?;

        if !resp.status().is_success() {
            bail!("Speech synthesis failed: {}", resp.status());
        }

        let bytes = resp.bytes().await.context("Failed to read speech audio")?;
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "StreamElements"
    }
}
