use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tts_core::TtsError;

/// Client closed request (nginx convention); used for cancelled generations.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Tts(#[from] TtsError),
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub kind: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Tts(e) => match e {
                TtsError::Validation(_) => StatusCode::BAD_REQUEST,
                TtsError::Configuration(_) => StatusCode::PRECONDITION_FAILED,
                TtsError::InvalidMarkup(_) => StatusCode::UNPROCESSABLE_ENTITY,
                TtsError::ScriptGeneration(_) | TtsError::RemoteApi(_) | TtsError::NoContent(_) => {
                    StatusCode::BAD_GATEWAY
                }
                TtsError::Cancelled => {
                    StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST)
                }
                TtsError::Synthesis(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "validation",
            ApiError::NotFound(_) => "not_found",
            ApiError::Tts(e) => e.kind(),
        }
    }

    /// Body shared by HTTP responses and WebSocket error frames.
    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.status().as_u16(),
            kind: self.kind(),
        }
    }
}

/// Body extraction failures (malformed JSON, missing fields, wrong content
/// type) answer with the same JSON error shape as validation failures.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            tracing::error!(kind = self.kind(), "{}", self);
        } else {
            tracing::debug!(kind = self.kind(), "{}", self);
        }
        (status, Json(self.to_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (TtsError::Validation("x".into()), 400),
            (TtsError::Configuration("x".into()), 412),
            (TtsError::InvalidMarkup("x".into()), 422),
            (TtsError::ScriptGeneration("x".into()), 502),
            (TtsError::RemoteApi("x".into()), 502),
            (TtsError::NoContent("x".into()), 502),
            (TtsError::Cancelled, 499),
            (TtsError::Synthesis("x".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).status().as_u16(), code);
        }
        assert_eq!(ApiError::NotFound("v".into()).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_body_carries_kind_and_message() {
        let body = ApiError::from(TtsError::Cancelled).to_body();
        assert_eq!(body.error, "Operation cancelled by user.");
        assert_eq!(body.code, 499);
        assert_eq!(body.kind, "cancelled");
    }
}
