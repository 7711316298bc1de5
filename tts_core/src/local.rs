//! On-device speech fallback.
//!
//! Used when no API key is configured or the caller opts out of the remote
//! API. Audio goes straight to the output device; nothing is returned.

use async_trait::async_trait;

use crate::error::Result;
use crate::request::{MAX_PITCH, MIN_PITCH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVoice {
    pub id: String,
    pub name: String,
    /// BCP-47 tag, e.g. `vi-VN`.
    pub language: String,
}

/// Parameters in the local engine's ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// `None` leaves the engine's default voice in place.
    pub voice: Option<LocalVoice>,
    pub rate: f32,
    /// 0.0..=2.0, 1.0 is neutral.
    pub pitch: f32,
}

/// Platform speech engine.
#[async_trait]
pub trait LocalSynthesizer: Send + Sync {
    fn voices(&self) -> Vec<LocalVoice>;

    /// Resolves when playback ends. Engine failures are `TtsError::Synthesis`.
    async fn speak(&self, utterance: Utterance) -> Result<()>;

    /// Stop any ongoing playback. Must be safe to call when idle.
    fn stop(&self);
}

/// Map remote pitch `[-20, 20]` onto the local `[0, 2]` range.
pub fn map_pitch(pitch: f32) -> f32 {
    (pitch.clamp(MIN_PITCH, MAX_PITCH) + 20.0) / 20.0
}

/// 32-bit rolling string hash (`h * 31 + unit` over UTF-16 code units).
pub fn voice_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Pick a local voice for `voice_id` among voices matching `language_prefix`.
///
/// The same id always maps to the same voice for a given voice list.
pub fn pick_local_voice(voices: &[LocalVoice], voice_id: &str, language_prefix: &str) -> Option<LocalVoice> {
    let candidates: Vec<&LocalVoice> = voices
        .iter()
        .filter(|v| v.language.starts_with(language_prefix))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let index = voice_hash(voice_id).unsigned_abs() as usize % candidates.len();
    Some(candidates[index].clone())
}
