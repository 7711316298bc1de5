use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{LlmConfig, LlmProvider};

/// Anything that can answer a single prompt with text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Structure for the Gemini `generateContent` request
#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Structure for the Gemini `generateContent` response
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Structure for the OpenAI Chat API request
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u16,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Structure for the OpenAI Chat API response
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct LlmClient {
    provider: LlmProvider,
    model: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!("no API key configured for {:?}", config.provider));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            provider: config.provider,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            base_url: config.base_url().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete_gemini(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let req_body = GenerateContentRequest {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
        };

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&req_body)
            .send()
            .await
            .map_err(|e| anyhow!("Gemini request failed: {}", e.without_url()))?
            .error_for_status()
            .map_err(|e| anyhow!("Gemini returned an error: {}", e.without_url()))?
            .json::<GenerateContentResponse>()
            .await
            .context("Gemini response is not valid JSON")?;

        gemini_reply_text(response)
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let req_body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message { role: "system", content: "You are an expert SSML scriptwriter." },
                Message { role: "user", content: prompt },
            ],
            max_tokens: 2048,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&req_body)
            .send()
            .await?
            .error_for_status()? // convert non-200 into error
            .json::<ChatResponse>()
            .await?;

        openai_reply_text(response)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(provider = ?self.provider, model = %self.model, chars = prompt.len(), "LLM completion");
        match self.provider {
            LlmProvider::Gemini => self.complete_gemini(prompt).await,
            LlmProvider::OpenAI => self.complete_openai(prompt).await,
        }
    }
}

fn gemini_reply_text(response: GenerateContentResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(anyhow!("Gemini returned no text"));
    }
    Ok(text)
}

fn openai_reply_text(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| anyhow!("OpenAI returned no choices"))
}
