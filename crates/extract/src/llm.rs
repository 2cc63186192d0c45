use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::prompt;

/// One prompt in, one completion out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Ollama `/api/generate` client, shared by extraction and answering.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    json_mode: bool,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    /// Plain-text completions at temperature 0.
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            json_mode: false,
            client: reqwest::Client::new(),
        }
    }

    /// Ask Ollama to constrain output to JSON.
    pub fn json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    fn request<'a>(&'a self, prompt: &'a str) -> OllamaRequest<'a> {
        OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: self.json_mode.then_some("json"),
            options: OllamaOptions { temperature: 0.0 },
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self.client
            .post(&url)
            .json(&self.request(prompt))
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama request failed: {}", response.status());
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(ollama_response.response)
    }
}

fn is_json(candidate: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(candidate).is_ok()
}

/// Generate, then re-prompt up to `max_retries` times to fix invalid JSON.
pub async fn generate_json_with_retry(
    llm: &dyn TextGenerator,
    prompt: &str,
    max_retries: usize,
) -> Result<String> {
    let mut candidate = llm.generate(prompt).await?;

    for attempt in 0..max_retries {
        if is_json(&candidate) {
            return Ok(candidate);
        }

        warn!(attempt = attempt + 1, max_retries, "LLM returned invalid JSON, asking for a fix");
        candidate = llm.generate(&prompt::build_retry_prompt(&candidate)).await?;
    }

    if is_json(&candidate) {
        return Ok(candidate);
    }

    anyhow::bail!("Failed to get valid JSON after {} retries", max_retries)
}
