//! `/ws/generate`: one generation per socket with live progress.
//!
//! The client sends the request JSON as its first text frame. The server
//! answers with `progress` frames, then either an `audio` frame followed by
//! `{"type":"status","status":"complete"}`, a `cancelled` status, or one
//! `error` frame. Sending the text `cancel`, or closing the socket, cancels
//! the generation before its next remote call.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use tts_core::{CancellationToken, GeneratedAudio, GenerationUpdate, ProgressEvent, TtsError};

use crate::error::ApiError;
use crate::routes::{build_speech_request, TtsRequest};
use crate::AppState;

pub async fn generate_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

async fn run_session(socket: WebSocket, state: AppState) {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    let started = Instant::now();
    let (mut sender, mut receiver) = socket.split();

    let Some(first) = read_request(&mut receiver).await else {
        debug!("socket closed before a request arrived");
        return;
    };
    let request = match first.and_then(|req| build_speech_request(&state, req)) {
        Ok(request) => request,
        Err(e) => {
            state.metrics.ws_generate.record_error();
            let _ = send_json(&mut sender, error_frame(&e)).await;
            let _ = sender.close().await;
            return;
        }
    };
    info!(voice = %request.voice_id(), chars = request.text.chars().count(), "ws generation started");
    let (text, voice_name) = (request.text.clone(), request.voice.name.clone());

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(watch_for_cancel(receiver, cancel.clone()));

    let updates = state
        .orchestrator
        .generate_speech_stream(state.tts_config.clone(), request, cancel.clone());
    tokio::pin!(updates);

    let mut outcome = Err(TtsError::Cancelled);
    while let Some(update) = updates.next().await {
        match update {
            GenerationUpdate::Progress(event) => {
                if send_json(&mut sender, progress_frame(&event)).await.is_err() {
                    debug!("progress frame not delivered, cancelling");
                    cancel.cancel();
                }
            }
            GenerationUpdate::Finished(result) => outcome = result,
        }
    }
    watcher.abort();
    state.metrics.generation.record(&outcome);

    let frames = match outcome {
        Ok(audio) => {
            state
                .metrics
                .ws_generate
                .record_request(started.elapsed().as_millis() as u64);
            let audio = Arc::new(audio);
            let library_id = state.library().add(text, voice_name, Arc::clone(&audio)).id.clone();
            vec![audio_frame(&audio, &library_id), status_frame("complete")]
        }
        Err(e) if e.is_cancelled() => {
            info!("ws generation cancelled");
            vec![status_frame("cancelled")]
        }
        Err(e) => {
            state.metrics.ws_generate.record_error();
            warn!(kind = e.kind(), "ws generation failed: {e}");
            vec![error_frame(&ApiError::from(e))]
        }
    };
    for frame in frames {
        if send_json(&mut sender, frame).await.is_err() {
            break;
        }
    }
    let _ = sender.close().await;
}

/// Wait for the first text frame and parse it as a request.
/// `None` means the socket went away first.
async fn read_request(
    receiver: &mut SplitStream<WebSocket>,
) -> Option<Result<TtsRequest, ApiError>> {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                return Some(
                    serde_json::from_str(text.as_str())
                        .map_err(|e| ApiError::InvalidInput(format!("malformed request: {e}"))),
                )
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
    None
}

async fn watch_for_cancel(mut receiver: SplitStream<WebSocket>, cancel: CancellationToken) {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) if is_cancel_command(text.as_str()) => break,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
    cancel.cancel();
}

fn is_cancel_command(text: &str) -> bool {
    let text = text.trim();
    if text.eq_ignore_ascii_case("cancel") {
        return true;
    }
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("type").and_then(Value::as_str).map(|t| t == "cancel"))
        .unwrap_or(false)
}

async fn send_json(sender: &mut SplitSink<WebSocket, Message>, value: Value) -> Result<(), axum::Error> {
    sender.send(Message::Text(value.to_string().into())).await
}

fn progress_frame(event: &ProgressEvent) -> Value {
    let mut frame = serde_json::to_value(event).unwrap_or_else(|_| json!({}));
    if let Some(fields) = frame.as_object_mut() {
        fields.insert("type".to_string(), json!("progress"));
        fields.insert("message".to_string(), json!(event.status_message()));
    }
    frame
}

fn audio_frame(audio: &GeneratedAudio, library_id: &str) -> Value {
    json!({
        "type": "audio",
        "audio_base64": audio.to_base64(),
        "content_type": audio.content_type,
        "fragment_count": audio.fragment_count,
        "library_id": library_id,
    })
}

fn status_frame(status: &str) -> Value {
    json!({ "type": "status", "status": status })
}

fn error_frame(error: &ApiError) -> Value {
    let body = error.to_body();
    json!({ "type": "error", "error": body.error, "code": body.code, "kind": body.kind })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_command_forms() {
        assert!(is_cancel_command("cancel"));
        assert!(is_cancel_command(" CANCEL\n"));
        assert!(is_cancel_command(r#"{"type":"cancel"}"#));
        assert!(!is_cancel_command(r#"{"type":"progress"}"#));
        assert!(!is_cancel_command("stop"));
    }

    #[test]
    fn test_progress_frame_shape() {
        let frame = progress_frame(&ProgressEvent::Generating { current: 1, total: 2 });
        assert_eq!(frame["type"], "progress");
        assert_eq!(frame["stage"], "generating");
        assert_eq!(frame["current"], 1);
        assert_eq!(frame["total"], 2);
        assert!(frame["message"].is_string());
    }

    #[test]
    fn test_error_frame_shape() {
        let frame = error_frame(&ApiError::from(TtsError::Configuration("API key not configured.".into())));
        assert_eq!(frame["type"], "error");
        assert_eq!(frame["code"], 412);
        assert_eq!(frame["kind"], "configuration");
    }
}
