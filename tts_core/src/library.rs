//! Session-scoped library of past generations.
//!
//! Entries hold a shared handle to the audio; removing an entry releases the
//! library's reference, and the buffer is freed once no player holds it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::audio::GeneratedAudio;

const SUMMARY_CHARS: usize = 80;

#[derive(Debug, Clone, Serialize)]
pub struct LibraryEntry {
    pub id: String,
    pub text: String,
    pub voice_name: String,
    #[serde(skip)]
    pub audio: Arc<GeneratedAudio>,
    pub created_at: DateTime<Utc>,
}

impl LibraryEntry {
    /// Text cut to 80 characters for list display.
    pub fn summary(&self) -> String {
        if self.text.chars().count() > SUMMARY_CHARS {
            let head: String = self.text.chars().take(SUMMARY_CHARS).collect();
            format!("{head}...")
        } else {
            self.text.clone()
        }
    }

    pub fn download_file_name(&self) -> String {
        download_file_name(&self.id)
    }
}

pub fn download_file_name(id: &str) -> String {
    format!("v-ai-voice-{id}.mp3")
}

/// Newest-first list of generated audio.
#[derive(Debug, Default)]
pub struct AudioLibrary {
    entries: Vec<LibraryEntry>,
}

impl AudioLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        text: impl Into<String>,
        voice_name: impl Into<String>,
        audio: Arc<GeneratedAudio>,
    ) -> &LibraryEntry {
        let entry = LibraryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            voice_name: voice_name.into(),
            audio,
            created_at: Utc::now(),
        };
        debug!(id = %entry.id, bytes = entry.audio.len(), "added audio to library");
        self.entries.insert(0, entry);
        &self.entries[0]
    }

    pub fn get(&self, id: &str) -> Option<&LibraryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<LibraryEntry> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
