use crate::error::{Result, TtsError};
use crate::voice::Voice;

pub const MIN_SPEAKING_RATE: f32 = 0.25;
pub const MAX_SPEAKING_RATE: f32 = 4.0;
pub const DEFAULT_SPEAKING_RATE: f32 = 1.0;
pub const MIN_PITCH: f32 = -20.0;
pub const MAX_PITCH: f32 = 20.0;
pub const DEFAULT_PITCH: f32 = 0.0;

/// A single generation request.
///
/// Rate and pitch are clamped on the way in, so a constructed request always
/// carries values the API accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: Voice,
    speaking_rate: f32,
    pitch: f32,
    pub is_ssml: bool,
    pub style_instructions: Option<String>,
    /// Skip the remote API and speak on the local engine.
    pub prefer_local: bool,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, voice: Voice) -> Self {
        Self {
            text: text.into(),
            voice,
            speaking_rate: DEFAULT_SPEAKING_RATE,
            pitch: DEFAULT_PITCH,
            is_ssml: false,
            style_instructions: None,
            prefer_local: false,
        }
    }

    #[must_use]
    pub fn with_speaking_rate(mut self, rate: f32) -> Self {
        self.speaking_rate = clamp_or(rate, MIN_SPEAKING_RATE, MAX_SPEAKING_RATE, DEFAULT_SPEAKING_RATE);
        self
    }

    #[must_use]
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = clamp_or(pitch, MIN_PITCH, MAX_PITCH, DEFAULT_PITCH);
        self
    }

    #[must_use]
    pub fn with_ssml(mut self, is_ssml: bool) -> Self {
        self.is_ssml = is_ssml;
        self
    }

    #[must_use]
    pub fn with_style_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.style_instructions = Some(instructions.into());
        self
    }

    #[must_use]
    pub fn with_local_synthesis(mut self, prefer_local: bool) -> Self {
        self.prefer_local = prefer_local;
        self
    }

    pub fn speaking_rate(&self) -> f32 {
        self.speaking_rate
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn voice_id(&self) -> &str {
        &self.voice.id
    }

    pub fn language_code(&self) -> &'static str {
        self.voice.language_code()
    }

    /// Style instructions that are present and not blank.
    pub fn effective_style_instructions(&self) -> Option<&str> {
        self.style_instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(TtsError::Validation("Text cannot be empty".to_string()));
        }
        Ok(())
    }
}

// Non-finite input falls back to the default instead of clamping
fn clamp_or(value: f32, min: f32, max: f32, default: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        default
    }
}
