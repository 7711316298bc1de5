use crate::error::ApiError;
use crate::routes::TtsRequest;

/// Maximum text length, in characters, accepted by one generation.
const MAX_TEXT_CHARS: usize = 50_000;
/// Maximum length of free-form style instructions.
const MAX_STYLE_INSTRUCTIONS_CHARS: usize = 1_000;
const MAX_VOICE_NAME_CHARS: usize = 100;

/// Validate a generation request before it reaches the orchestrator.
///
/// Rate and pitch are only checked for being finite; the request model
/// clamps them into range.
pub fn validate_tts_request(req: &TtsRequest) -> Result<(), ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Text cannot be empty".to_string()));
    }
    if req.text.chars().count() > MAX_TEXT_CHARS {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            MAX_TEXT_CHARS
        )));
    }

    if req.voice_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("voice_id is required".to_string()));
    }

    for (name, value) in [("speaking_rate", req.speaking_rate), ("pitch", req.pitch)] {
        if matches!(value, Some(v) if !v.is_finite()) {
            return Err(ApiError::InvalidInput(format!("{name} must be a finite number")));
        }
    }

    if let Some(instructions) = &req.style_instructions {
        if instructions.chars().count() > MAX_STYLE_INSTRUCTIONS_CHARS {
            return Err(ApiError::InvalidInput(format!(
                "Style instructions too long (max {} characters)",
                MAX_STYLE_INSTRUCTIONS_CHARS
            )));
        }
    }

    Ok(())
}

pub fn validate_voice_name(name: &str) -> Result<(), ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidInput("Voice name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_VOICE_NAME_CHARS {
        return Err(ApiError::InvalidInput(format!(
            "Voice name too long (max {} characters)",
            MAX_VOICE_NAME_CHARS
        )));
    }
    Ok(())
}
