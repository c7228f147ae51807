use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::AudioBackendConfig;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub converter: ConverterConfig,
    pub cache: CacheConfig,
    pub session: SessionSettings,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    pub tts: TtsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_duration_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct ConverterConfig {
    pub enabled: bool,
    pub ffmpeg_path: String,
}

#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    pub dir: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    pub dir: String,
    pub max_duration_hours: u64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TtsConfig {
    pub endpoint: String,
    pub default_voice: String,
}

impl Config {
    /// Load `path` (any format the `config` crate recognizes by extension),
    /// then apply `PRACTICE_AUDIO__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("PRACTICE_AUDIO").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn backend_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            target_sample_rate: self.audio.sample_rate,
            target_channels: self.audio.channels,
            buffer_duration_ms: self.audio.buffer_duration_ms,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            storage_dir: expand_path(&self.session.dir),
            max_duration: Duration::from_secs(self.session.max_duration_hours * 60 * 60),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        expand_path(&self.cache.dir)
    }

    /// Telegram settings, if present with both token and chat id filled in
    pub fn telegram(&self) -> Option<&TelegramConfig> {
        self.telegram
            .as_ref()
            .filter(|t| !t.bot_token.trim().is_empty() && !t.chat_id.trim().is_empty())
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
