// Configuration passed explicitly into every generation

use std::fmt;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://texttospeech.googleapis.com";

/// Maximum characters of plain text sent in one synthesis request.
pub const API_CHAR_LIMIT: usize = 1500;
/// Maximum characters of markup accepted by the synthesis API.
pub const SSML_CHAR_LIMIT: usize = 5000;

#[derive(Clone)]
pub struct TtsConfig {
    /// Empty means "not configured".
    pub api_key: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 60,
        }
    }
}

// Keeps the key out of logs
impl fmt::Debug for TtsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsConfig")
            .field("api_key", &if self.is_configured() { "<set>" } else { "<empty>" })
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl TtsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn from_env() -> Self {
        let api_key = std::env::var("GOOGLE_API_KEY").unwrap_or_default();

        let api_base_url = std::env::var("TTS_API_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let request_timeout_secs = std::env::var("TTS_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            api_key,
            api_base_url,
            request_timeout_secs,
        }
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn synthesize_url(&self) -> String {
        format!(
            "{}/v1/text:synthesize",
            self.api_base_url.trim_end_matches('/')
        )
    }
}

/// Per-orchestrator size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationLimits {
    pub chunk_chars: usize,
    pub markup_chars: usize,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            chunk_chars: API_CHAR_LIMIT,
            markup_chars: SSML_CHAR_LIMIT,
        }
    }
}
