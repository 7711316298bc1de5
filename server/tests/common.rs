//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use server::{app, config::ServerConfig, AppState};
use tts_core::{
    GenerationLimits, SpeechApi, SpeechOrchestrator, StyleScripter, SynthesisCall, TtsConfig,
    TtsError, VoiceCatalog, VoiceProfile,
};

/// Records every call and answers with `F{n}`.
#[derive(Default)]
pub struct FakeSpeechApi {
    pub calls: Mutex<Vec<SynthesisCall>>,
    pub delay: Option<Duration>,
    pub error: Option<TtsError>,
}

impl FakeSpeechApi {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SpeechApi for FakeSpeechApi {
    async fn synthesize(&self, _config: &TtsConfig, call: &SynthesisCall) -> Result<Vec<u8>, TtsError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call.clone());
            calls.len() - 1
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(format!("F{n}").into_bytes()),
        }
    }
}

pub struct FakeScripter {
    pub reply: String,
    pub calls: AtomicUsize,
}

#[async_trait]
impl StyleScripter for FakeScripter {
    async fn generate_styled_script(
        &self,
        _text: &str,
        _instructions: &str,
        _voice: &VoiceProfile,
    ) -> Result<String, TtsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub api: Arc<FakeSpeechApi>,
    pub state: AppState,
}

pub struct TestAppBuilder {
    api: FakeSpeechApi,
    api_key: String,
    chunk_chars: usize,
    scripter: Option<Arc<FakeScripter>>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            api: FakeSpeechApi::default(),
            api_key: "test-key".to_string(),
            chunk_chars: 1500,
            scripter: None,
        }
    }

    pub fn without_api_key(mut self) -> Self {
        self.api_key.clear();
        self
    }

    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars;
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.api.delay = Some(delay);
        self
    }

    pub fn with_api_error(mut self, error: TtsError) -> Self {
        self.api.error = Some(error);
        self
    }

    pub fn with_scripter(mut self, reply: &str) -> Self {
        self.scripter = Some(Arc::new(FakeScripter {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }));
        self
    }

    pub fn build(self) -> TestApp {
        let api = Arc::new(self.api);
        let mut orchestrator = SpeechOrchestrator::new(api.clone()).with_limits(GenerationLimits {
            chunk_chars: self.chunk_chars,
            ..GenerationLimits::default()
        });
        if let Some(scripter) = self.scripter {
            orchestrator = orchestrator.with_style_scripter(scripter);
        }

        let state = AppState::new(
            orchestrator,
            VoiceCatalog::default(),
            TtsConfig::new(self.api_key),
            ServerConfig::default(),
        );
        TestApp {
            router: app(state.clone()),
            api,
            state,
        }
    }
}

/// Create a test app instance backed by a fake speech API.
pub fn create_test_app() -> TestApp {
    TestAppBuilder::new().build()
}
