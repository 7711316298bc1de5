//! Style instructions to SSML through an LLM.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lru::LruCache;
use sha2::{Digest, Sha256};
use tracing::{debug, error};

use tts_core::{validate_styled_script, StyleScripter, TtsError, VoiceProfile};

use crate::client::TextGenerator;

pub const SCRIPT_GENERATION_FAILED: &str =
    "An error occurred while generating the voice style script with AI.";

/// Build the scriptwriter prompt for `text` styled by `instructions`.
pub fn build_style_prompt(text: &str, instructions: &str, voice: &VoiceProfile) -> String {
    format!(
        r#"You are an expert SSML scriptwriter for Google Cloud Text-to-Speech, tasked with enhancing plain text based on a style instruction, while preserving the core characteristics of the specified base voice.

**Core Task:** Convert the following plain text to SSML.
**Constraint:** The SSML must subtly apply the style instruction WITHOUT altering the fundamental accent or regional dialect of the base voice. Your enhancements must sound natural.

**Base Voice Profile:**
- Name: "{name}"
- Gender: "{gender}"
- Region/Accent: "{region}"

**User's Style Instruction:**
"{instructions}"

**Rules for SSML Generation:**
1. **Preserve Accent:** Add emotional style ON TOP of the existing accent. A regional voice must still sound like that region. Do NOT generate SSML that neutralizes or changes its regional characteristics.
2. **Subtle Prosody:** Use <prosody> for changes in rate, pitch, and volume. Avoid extreme or abrupt shifts unless the instruction is explicit (e.g., "shout", "whisper", "speak very fast").
3. **Natural Pauses:** Use <break> tags to create natural pauses in speech.
4. **Raw Output Only:** Your entire response must be the raw SSML string. It must start with <speak> and end with </speak>. Do NOT include any explanations, comments, or markdown formatting (like ```xml).

**Plain Text to Convert:**
"{text}"

**Your SSML Output:**"#,
        name = voice.name,
        gender = voice.gender,
        region = voice.region,
        instructions = instructions,
        text = text,
    )
}

/// [`StyleScripter`] backed by a [`TextGenerator`], with an LRU cache of
/// accepted scripts keyed by a SHA-256 of the inputs.
pub struct StyleScriptWriter {
    generator: Arc<dyn TextGenerator>,
    cache: Option<Mutex<LruCache<String, String>>>,
}

impl StyleScriptWriter {
    pub fn new(generator: Arc<dyn TextGenerator>, cache_size: usize) -> Self {
        Self {
            generator,
            cache: NonZeroUsize::new(cache_size).map(|n| Mutex::new(LruCache::new(n))),
        }
    }

    fn cached(&self, key: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        cache.lock().ok()?.get(key).cloned()
    }

    fn remember(&self, key: String, script: &str) {
        if let Some(cache) = &self.cache {
            if let Ok(mut cache) = cache.lock() {
                cache.put(key, script.to_string());
            }
        }
    }
}

fn cache_key(text: &str, instructions: &str, voice: &VoiceProfile) -> String {
    let mut hasher = Sha256::new();
    for part in [
        text,
        instructions,
        voice.name.as_str(),
        voice.gender.as_str(),
        voice.region.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[async_trait]
impl StyleScripter for StyleScriptWriter {
    async fn generate_styled_script(
        &self,
        text: &str,
        instructions: &str,
        voice: &VoiceProfile,
    ) -> Result<String, TtsError> {
        let key = cache_key(text, instructions, voice);
        if let Some(script) = self.cached(&key) {
            debug!("style script cache hit");
            return Ok(script);
        }

        let prompt = build_style_prompt(text, instructions, voice);
        let reply = self.generator.complete(&prompt).await.map_err(|e| {
            error!("Error calling LLM for style script: {e:#}");
            TtsError::ScriptGeneration(SCRIPT_GENERATION_FAILED.to_string())
        })?;

        let script = validate_styled_script(&reply)?;
        self.remember(key, &script);
        Ok(script)
    }
}
