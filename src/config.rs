use anyhow::{bail, Result};
use std::time::Duration;

use crate::providers::API_TIMEOUT;
use crate::state::DEFAULT_MAX_TEXT_CHARS;

pub const DEFAULT_TRANSCRIPTION_URL: &str = "https://api.assemblyai.com";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;
pub const DEFAULT_MAX_AUDIO_SECONDS: f64 = 20.0;

/// Limits and timing used by the request flows.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub max_text_chars: usize,
    pub max_audio_seconds: f64,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            max_audio_seconds: DEFAULT_MAX_AUDIO_SECONDS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_text_chars == 0 {
            bail!("max_text_chars must be greater than 0");
        }
        if self.max_audio_seconds.is_nan() || self.max_audio_seconds <= 0.0 {
            bail!("max_audio_seconds must be greater than 0");
        }
        if self.poll_interval.is_zero() {
            bail!("poll interval must be greater than 0");
        }
        if self.max_poll_attempts == 0 {
            bail!("max_poll_attempts must be greater than 0");
        }
        Ok(())
    }
}

/// Endpoints, credentials and flow settings, resolved from flags and environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub predict_url: Option<String>,
    pub transcription_url: String,
    pub assemblyai_api_key: Option<String>,
    pub request_timeout: Duration,
    pub detector: DetectorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            predict_url: None,
            transcription_url: DEFAULT_TRANSCRIPTION_URL.to_string(),
            assemblyai_api_key: None,
            request_timeout: API_TIMEOUT,
            detector: DetectorConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.predict_url {
            check_http_url("prediction URL", url)?;
        }
        check_http_url("transcription URL", &self.transcription_url)?;
        if self.request_timeout.is_zero() {
            bail!("request timeout must be greater than 0");
        }
        self.detector.validate()
    }
}

fn check_http_url(what: &str, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("{} must start with http:// or https://, got {:?}", what, url);
    }
    Ok(())
}
