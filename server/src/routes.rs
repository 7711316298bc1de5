use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use tts_core::{CancellationToken, ProgressEvent, SpeechRequest, Voice};

use crate::error::ApiError;
use crate::metrics::{EndpointMetricsResponse, MetricsResponse, SystemMetrics};
use crate::validation::{validate_tts_request, validate_voice_name};
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    pub voice_id: String,
    pub speaking_rate: Option<f32>,
    pub pitch: Option<f32>,
    #[serde(default)]
    pub is_ssml: bool,
    pub style_instructions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TtsResponse {
    pub audio_base64: String,
    pub content_type: String,
    pub fragment_count: usize,
    /// Id of the library entry holding this audio.
    pub library_id: String,
    pub events: Vec<ProgressEvent>,
}

#[derive(Debug, Deserialize)]
pub struct CloneVoiceRequest {
    pub name: String,
}

/// Validate `req` and resolve its voice against the catalog.
pub fn build_speech_request(state: &AppState, req: TtsRequest) -> Result<SpeechRequest, ApiError> {
    validate_tts_request(&req)?;

    let voice = state
        .catalog()
        .get(&req.voice_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("voice '{}'", req.voice_id)))?;

    let mut request = SpeechRequest::new(req.text, voice).with_ssml(req.is_ssml);
    if let Some(rate) = req.speaking_rate {
        request = request.with_speaking_rate(rate);
    }
    if let Some(pitch) = req.pitch {
        request = request.with_pitch(pitch);
    }
    if let Some(instructions) = req.style_instructions {
        request = request.with_style_instructions(instructions);
    }
    Ok(request)
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_voices(State(state): State<AppState>) -> Json<Vec<Voice>> {
    Json(state.catalog().voices().to_vec())
}

/// Register a voice produced by the cloning flow.
pub async fn clone_voice(
    State(state): State<AppState>,
    payload: Result<Json<CloneVoiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Voice>), ApiError> {
    let Json(req) = payload?;
    validate_voice_name(&req.name)?;
    let voice = state.catalog_mut().add_cloned(req.name.trim()).clone();
    Ok((StatusCode::CREATED, Json(voice)))
}

pub async fn tts_endpoint(
    State(state): State<AppState>,
    payload: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Json<TtsResponse>, ApiError> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    let started = Instant::now();

    let result = match payload {
        Ok(Json(req)) => generate(&state, req).await,
        Err(rejection) => Err(rejection.into()),
    };

    match &result {
        Ok(_) => state
            .metrics
            .tts
            .record_request(started.elapsed().as_millis() as u64),
        Err(_) => state.metrics.tts.record_error(),
    }
    result.map(Json)
}

async fn generate(state: &AppState, req: TtsRequest) -> Result<TtsResponse, ApiError> {
    let request = build_speech_request(state, req)?;
    info!(
        voice = %request.voice_id(),
        chars = request.text.chars().count(),
        styled = request.style_instructions.is_some(),
        "tts request"
    );

    // Dropping this future on client disconnect stops the generation, so the
    // token never needs to fire here.
    let cancel = CancellationToken::new();
    let mut events = Vec::new();
    let result = state
        .orchestrator
        .generate_speech(&state.tts_config, &request, &cancel, |event| events.push(event))
        .await;
    state.metrics.generation.record(&result);

    let audio = Arc::new(result?);
    let library_id = state
        .library()
        .add(request.text.as_str(), request.voice.name.as_str(), Arc::clone(&audio))
        .id
        .clone();
    Ok(TtsResponse {
        audio_base64: audio.to_base64(),
        content_type: audio.content_type.clone(),
        fragment_count: audio.fragment_count,
        library_id,
        events,
    })
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    let mut system = sysinfo::System::new();
    system.refresh_cpu();
    system.refresh_memory();

    let cpu_usage = system.global_cpu_info().cpu_usage();
    let memory_used = system.used_memory();
    let memory_total = system.total_memory();
    let memory_usage_percent = if memory_total > 0 {
        (memory_used as f64 / memory_total as f64 * 100.0) as f32
    } else {
        0.0
    };

    let system_load = if cfg!(unix) {
        Some(sysinfo::System::load_average().one)
    } else {
        None
    };

    Json(MetricsResponse {
        timestamp: chrono::Utc::now(),
        system: SystemMetrics {
            cpu_usage_percent: cpu_usage,
            memory_used_mb: memory_used / 1024 / 1024,
            memory_total_mb: memory_total / 1024 / 1024,
            memory_usage_percent,
            request_count: state.request_count.load(Ordering::Relaxed),
            uptime_seconds: state.started_at.elapsed().as_secs(),
            system_load,
        },
        endpoints: EndpointMetricsResponse {
            tts: state.metrics.tts.stats(),
            ws_generate: state.metrics.ws_generate.stats(),
        },
        generation: state.metrics.generation.stats(),
    })
}
