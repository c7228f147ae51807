//! Text-to-speech with a shared audio cache.
//!
//! Synthesized clips are stored under `CacheKey::new(voice, text)` so the
//! same word or sentence is fetched from the speech service only once.

mod streamelements;

pub use streamelements::StreamElementsTts;

use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{AudioCache, CacheKey};

/// Voices the practice pages offer
pub mod voices {
    pub const US_FEMALE: &str = "en-US-AriaNeural";
    pub const US_MALE: &str = "en-US-GuyNeural";
    pub const UK_FEMALE: &str = "en-GB-SoniaNeural";
    pub const UK_MALE: &str = "en-GB-RyanNeural";

    pub const DEFAULT: &str = US_FEMALE;
}

/// Turns text into encoded audio bytes.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>>;

    fn name(&self) -> &str;
}

/// Outcome of a batch preload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadSummary {
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
}

/// Synthesizer fronted by the audio cache.
pub struct CachedSpeech {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    cache: Arc<AudioCache>,
}

impl CachedSpeech {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, cache: Arc<AudioCache>) -> Self {
        Self { synthesizer, cache }
    }

    /// Audio for `text`, from the cache when possible.
    pub async fn speak(&self, text: &str, voice: &str) -> Result<Arc<Vec<u8>>> {
        let key = CacheKey::new(voice, text);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        debug!("Synthesizing with {}: {}", self.synthesizer.name(), key);
        let audio = self.synthesizer.synthesize(text, voice).await?;
        self.cache.put(&key, audio.clone()).await;
        Ok(Arc::new(audio))
    }

    /// Synthesize without consulting or filling the cache.
    pub async fn speak_uncached(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        self.synthesizer.synthesize(text, voice).await
    }

    /// Warm the cache for a list of texts.
    pub async fn preload(&self, texts: &[String], voice: &str) -> PreloadSummary {
        let results = join_all(texts.iter().map(|text| self.speak(text, voice))).await;

        let failed = results
            .iter()
            .zip(texts)
            .filter_map(|(result, text)| result.as_ref().err().map(|e| (text, e)))
            .inspect(|(text, e)| warn!("Preload failed for {:?}: {:#}", text, e))
            .count();

        PreloadSummary {
            successful: texts.len() - failed,
            failed,
            total: texts.len(),
        }
    }

    pub fn cache(&self) -> &Arc<AudioCache> {
        &self.cache
    }
}
