//! HTTP and WebSocket facade over the speech generation pipeline.
pub mod config;
pub mod error;
pub mod library;
pub mod metrics;
pub mod routes;
pub mod validation;
pub mod ws;

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tts_core::{AudioLibrary, SpeechOrchestrator, TtsConfig, VoiceCatalog};

use crate::config::ServerConfig;
use crate::metrics::AppMetrics;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SpeechOrchestrator>,
    pub catalog: Arc<RwLock<VoiceCatalog>>,
    pub library: Arc<Mutex<AudioLibrary>>,
    pub tts_config: TtsConfig,
    pub config: ServerConfig,
    pub metrics: AppMetrics,
    pub request_count: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        orchestrator: SpeechOrchestrator,
        catalog: VoiceCatalog,
        tts_config: TtsConfig,
        config: ServerConfig,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            catalog: Arc::new(RwLock::new(catalog)),
            library: Arc::new(Mutex::new(AudioLibrary::new())),
            tts_config,
            config,
            metrics: AppMetrics::default(),
            request_count: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    // Guards are not Send: never hold one across an await point.
    pub fn catalog(&self) -> RwLockReadGuard<'_, VoiceCatalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn catalog_mut(&self) -> RwLockWriteGuard<'_, VoiceCatalog> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn library(&self) -> MutexGuard<'_, AudioLibrary> {
        self.library.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &header {
        request.headers_mut().insert("x-request-id", value.clone());
    }
    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .flatten()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        warn!("CORS_ALLOWED_ORIGINS not set or empty, allowing all origins");
        base.allow_origin(Any)
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        base.allow_origin(AllowOrigin::list(origins))
    }
}

/// Routes served both at the root and under `/api`.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(routes::health_check))
        .route("/healthz", get(routes::health_check))
        .route("/voices", get(routes::list_voices))
        .route("/voices/clone", post(routes::clone_voice))
        .route("/tts", post(routes::tts_endpoint))
        .route("/ws/generate", get(ws::generate_ws))
        .route("/library", get(library::list_library).delete(library::clear_library))
        .route(
            "/library/{id}",
            get(library::download_audio).delete(library::delete_audio),
        )
        .route("/metrics", get(routes::metrics_endpoint))
}

pub fn app(state: AppState) -> Router {
    let config = state.config.clone();
    let api = api_routes();

    let mut router = Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(config.request_timeout()))
                .layer(cors_layer(&config))
                .into_inner(),
        );

    // Global limit: all clients share one bucket, which behaves the same
    // behind proxies where peer addresses are not meaningful.
    let per_minute = config.rate_limit_per_minute.max(1);
    let governor = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / u64::from(per_minute)).max(1))
        .burst_size(per_minute)
        .key_extractor(GlobalKeyExtractor)
        .finish();
    match governor {
        Some(conf) => {
            info!("Rate limiting: {} requests per minute", per_minute);
            router = router.layer(GovernorLayer::new(Arc::new(conf)));
        }
        None => warn!("invalid rate limit configuration, rate limiting disabled"),
    }

    router.with_state(state)
}
