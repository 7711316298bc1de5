//! Google Cloud Text-to-Speech REST client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::api::{SpeechApi, SynthesisCall, SynthesisInput};
use crate::audio::decode_audio_content;
use crate::config::TtsConfig;
use crate::error::{Result, TtsError};

/// Structure for the `text:synthesize` request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: RequestInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum RequestInput<'a> {
    Text(&'a str),
    Ssml(&'a str),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f32,
    pitch: f32,
}

/// Structure for the success response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: Option<String>,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct GoogleTtsClient {
    client: Client,
}

impl GoogleTtsClient {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TtsError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SpeechApi for GoogleTtsClient {
    async fn synthesize(&self, config: &TtsConfig, call: &SynthesisCall) -> Result<Vec<u8>> {
        let body = build_request_body(call);
        debug!(
            voice = %call.voice_name,
            language = %call.language_code,
            ssml = call.input.is_ssml(),
            chars = call.input.as_str().chars().count(),
            "sending synthesis request"
        );

        let response = self
            .client
            .post(config.synthesize_url())
            .query(&[("key", config.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| TtsError::RemoteApi(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TtsError::RemoteApi(e.without_url().to_string()))?;

        if !status.is_success() {
            error!(status = status.as_u16(), "Google TTS API error: {}", text);
            return Err(map_error_response(&text));
        }

        parse_success_response(&text)
    }
}

fn build_request_body(call: &SynthesisCall) -> serde_json::Value {
    let input = match &call.input {
        SynthesisInput::Text(text) => RequestInput::Text(text),
        SynthesisInput::Ssml(ssml) => RequestInput::Ssml(ssml),
    };
    let request = SynthesizeRequest {
        input,
        voice: VoiceSelection {
            language_code: &call.language_code,
            name: &call.voice_name,
        },
        audio_config: AudioConfig {
            audio_encoding: "MP3",
            speaking_rate: call.speaking_rate,
            pitch: call.pitch,
        },
    };
    // Serializing plain structs of strings and floats cannot fail
    serde_json::to_value(request).unwrap_or_default()
}

/// Map a non-success body to an error; markup complaints get their own kind.
fn map_error_response(body: &str) -> TtsError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error)
        .and_then(|err| err.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "Unknown API error.".to_string());

    if message.to_lowercase().contains("ssml") {
        TtsError::InvalidMarkup(message)
    } else {
        TtsError::RemoteApi(message)
    }
}

fn parse_success_response(body: &str) -> Result<Vec<u8>> {
    let parsed: SynthesizeResponse = serde_json::from_str(body)
        .map_err(|e| TtsError::RemoteApi(format!("invalid response body: {e}")))?;

    match parsed.audio_content.filter(|c| !c.is_empty()) {
        Some(content) => decode_audio_content(&content),
        None => Err(TtsError::NoContent(
            "API response did not contain audio content.".to_string(),
        )),
    }
}
