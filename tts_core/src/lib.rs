//! Speech generation for the voice studio.
//!
//! Turns text, a voice and style parameters into one MP3 buffer through the
//! Google Cloud Text-to-Speech API: long text is chunked, chunks are
//! synthesized one by one with progress reporting and cooperative
//! cancellation, and the fragments are concatenated in order. When no API
//! key is configured, a local speech engine can speak the text instead.
pub mod api;
pub mod audio;
pub mod chunker;
pub mod config;
pub mod error;
pub mod google;
pub mod library;
pub mod local;
pub mod orchestrator;
pub mod progress;
pub mod request;
pub mod voice;

pub use api::{validate_styled_script, SpeechApi, StyleScripter, SynthesisCall, SynthesisInput};
pub use audio::{GeneratedAudio, AUDIO_CONTENT_TYPE};
pub use chunker::split_text_into_chunks;
pub use config::{GenerationLimits, TtsConfig, API_CHAR_LIMIT, SSML_CHAR_LIMIT};
pub use error::{Result, TtsError};
pub use google::GoogleTtsClient;
pub use library::{AudioLibrary, LibraryEntry};
pub use local::{LocalSynthesizer, LocalVoice, Utterance};
pub use orchestrator::{GenerationUpdate, SpeechOrchestrator, SynthesisOutcome};
pub use progress::ProgressEvent;
pub use request::SpeechRequest;
pub use voice::{Gender, Region, Voice, VoiceCatalog, VoiceProfile};

/// Cancellation handle passed into each generation.
pub use tokio_util::sync::CancellationToken;
