use thiserror::Error;

/// Errors produced while turning a request into audio.
///
/// Every variant aborts the whole generation; fragments fetched before the
/// failure are discarded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TtsError {
    /// No API key configured, or the voice has no remote identifier.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input rejected before any network call.
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    ScriptGeneration(String),

    /// Non-success response or transport failure from the synthesis API.
    #[error("Failed to fetch from Google TTS API: {0}")]
    RemoteApi(String),

    /// The synthesis API rejected the markup.
    #[error("Invalid SSML. Newer voices like Neural2 require valid SSML. ({0})")]
    InvalidMarkup(String),

    #[error("{0}")]
    NoContent(String),

    /// Aborted through the request's cancellation token.
    #[error("Operation cancelled by user.")]
    Cancelled,

    /// The local speech engine failed.
    #[error("An error occurred during speech synthesis: {0}")]
    Synthesis(String),
}

impl TtsError {
    /// Cancellation is intentional and should not be shown as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TtsError::Cancelled)
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TtsError::Configuration(_) => "configuration",
            TtsError::Validation(_) => "validation",
            TtsError::ScriptGeneration(_) => "script_generation",
            TtsError::RemoteApi(_) => "remote_api",
            TtsError::InvalidMarkup(_) => "invalid_markup",
            TtsError::NoContent(_) => "no_content",
            TtsError::Cancelled => "cancelled",
            TtsError::Synthesis(_) => "synthesis",
        }
    }
}

pub type Result<T, E = TtsError> = std::result::Result<T, E>;
