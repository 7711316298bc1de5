use serde::Serialize;

/// Progress of one generation, emitted in the order the stages run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Style instructions are being turned into markup.
    GeneratingScript,
    /// Synthesizing unit `current` of `total` (1-based).
    Generating { current: usize, total: usize },
    Merging,
    Done,
}

impl ProgressEvent {
    /// Status line for the studio UI.
    pub fn status_message(&self) -> String {
        match self {
            ProgressEvent::GeneratingScript => "AI đang tạo kịch bản theo phong cách...".to_string(),
            ProgressEvent::Generating { current, total } => {
                format!("Đang tạo âm thanh... ({current}/{total})")
            }
            ProgressEvent::Merging => "Đang ghép các đoạn âm thanh...".to_string(),
            ProgressEvent::Done => "Hoàn tất".to_string(),
        }
    }
}
