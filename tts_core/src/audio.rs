//! Audio fragments and their assembly into one playable result.

use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;

use crate::error::{Result, TtsError};

pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Encoded audio for one chunk (or the single markup request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFragment {
    pub index: usize,
    pub bytes: Vec<u8>,
}

/// The finished audio handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedAudio {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub fragment_count: usize,
}

impl GeneratedAudio {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// Concatenate fragments in chunk order.
///
/// MP3 frames are self-delimiting, so byte concatenation yields a playable
/// stream.
pub fn merge_fragments(mut fragments: Vec<AudioFragment>) -> Result<GeneratedAudio> {
    if fragments.is_empty() {
        return Err(TtsError::NoContent("No audio content was generated.".to_string()));
    }
    fragments.sort_by_key(|f| f.index);

    let fragment_count = fragments.len();
    let total = fragments.iter().map(|f| f.bytes.len()).sum();
    let mut bytes = Vec::with_capacity(total);
    for fragment in fragments {
        bytes.extend_from_slice(&fragment.bytes);
    }

    Ok(GeneratedAudio {
        bytes,
        content_type: AUDIO_CONTENT_TYPE.to_string(),
        fragment_count,
    })
}

/// Wrap a single fragment without copying.
pub fn single_fragment(fragment: AudioFragment) -> GeneratedAudio {
    GeneratedAudio {
        bytes: fragment.bytes,
        content_type: AUDIO_CONTENT_TYPE.to_string(),
        fragment_count: 1,
    }
}

/// Decode the base64 `audioContent` field of an API response.
pub fn decode_audio_content(encoded: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| TtsError::RemoteApi(format!("audio content is not valid base64: {e}")))
}
