//! Session audio library: list, download and delete past generations.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use tts_core::LibraryEntry;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LibraryItem {
    pub id: String,
    pub text: String,
    pub summary: String,
    pub voice_name: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: usize,
    pub download_name: String,
}

impl From<&LibraryEntry> for LibraryItem {
    fn from(entry: &LibraryEntry) -> Self {
        Self {
            id: entry.id.clone(),
            text: entry.text.clone(),
            summary: entry.summary(),
            voice_name: entry.voice_name.clone(),
            created_at: entry.created_at,
            size_bytes: entry.audio.len(),
            download_name: entry.download_file_name(),
        }
    }
}

fn missing(id: &str) -> ApiError {
    ApiError::NotFound(format!("library entry '{id}'"))
}

/// Newest first.
pub async fn list_library(State(state): State<AppState>) -> Json<Vec<LibraryItem>> {
    let items = state.library().entries().iter().map(LibraryItem::from).collect();
    Json(items)
}

pub async fn download_audio(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let entry = state.library().get(&id).cloned().ok_or_else(|| missing(&id))?;
    let disposition = format!("attachment; filename=\"{}\"", entry.download_file_name());
    Ok((
        [
            (header::CONTENT_TYPE, entry.audio.content_type.clone()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        entry.audio.bytes.clone(),
    )
        .into_response())
}

pub async fn delete_audio(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.library().remove(&id).ok_or_else(|| missing(&id))?;
    info!(id = %id, "library entry deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_library(State(state): State<AppState>) -> StatusCode {
    state.library().clear();
    info!("library cleared");
    StatusCode::NO_CONTENT
}
