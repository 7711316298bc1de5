//! Ports the orchestrator talks through.

use async_trait::async_trait;

use crate::config::TtsConfig;
use crate::error::Result;
use crate::voice::VoiceProfile;

/// Input of a single synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisInput {
    Text(String),
    Ssml(String),
}

impl SynthesisInput {
    pub fn as_str(&self) -> &str {
        match self {
            SynthesisInput::Text(s) | SynthesisInput::Ssml(s) => s,
        }
    }

    pub fn is_ssml(&self) -> bool {
        matches!(self, SynthesisInput::Ssml(_))
    }
}

/// One unit of remote work: a chunk of text or the full markup.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisCall {
    pub input: SynthesisInput,
    pub voice_name: String,
    pub language_code: String,
    pub speaking_rate: f32,
    pub pitch: f32,
}

/// Remote text-to-speech service. Returns decoded audio bytes.
#[async_trait]
pub trait SpeechApi: Send + Sync {
    async fn synthesize(&self, config: &TtsConfig, call: &SynthesisCall) -> Result<Vec<u8>>;
}

/// Turns plain text plus a style instruction into markup.
///
/// Implementations return the raw model output; the orchestrator checks its
/// shape.
#[async_trait]
pub trait StyleScripter: Send + Sync {
    async fn generate_styled_script(
        &self,
        text: &str,
        instructions: &str,
        voice: &VoiceProfile,
    ) -> Result<String>;
}

pub const INVALID_SCRIPT_MESSAGE: &str =
    "AI could not generate a valid SSML script from the style instructions. Try rephrasing.";

/// Accept only a bare `<speak>...</speak>` document; anything else is a hard failure.
pub fn validate_styled_script(output: &str) -> Result<String> {
    let script = output.trim();
    if script.starts_with("<speak") && script.ends_with("</speak>") {
        Ok(script.to_string())
    } else {
        tracing::warn!(len = script.len(), "style script is not a speak document");
        Err(crate::error::TtsError::ScriptGeneration(
            INVALID_SCRIPT_MESSAGE.to_string(),
        ))
    }
}
