//! Ollama Local LLM Provider
//!
//! LLM provider for locally-running Ollama models via `/api/generate`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    LlmProvider, LlmResponse, ResponseMetadata, ResponseTiming, TokenUsage, clean_response,
    http_client, validate_endpoint,
};
use crate::config::LlmConfig;
use crate::constants::network::HEALTH_CHECK_TIMEOUT_SECS;
use crate::types::{LlmError, Result};

const DEFAULT_API_BASE: &str = "http://127.0.0.1:11434";
const PROVIDER: &str = "ollama";

/// Ollama Local LLM Provider
pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_base = config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
        let api_base = validate_endpoint(api_base, PROVIDER)?;

        info!("Using Ollama at {} with model {}", api_base, config.model);

        Ok(Self {
            api_base,
            model: config.model.clone(),
            temperature: config.temperature,
            client: http_client(config.timeout_secs, PROVIDER)?,
        })
    }

    fn build_request<'a>(&'a self, system: &'a str, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            system,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        }
    }

    /// Map a decoded body onto the completion contract.
    fn interpret(body: GenerateResponse) -> std::result::Result<String, LlmError> {
        if !body.done {
            return Err(LlmError::incomplete_response(
                "Ollama reported the generation as not finished",
            )
            .provider(PROVIDER));
        }
        let text = clean_response(&body.response);
        if text.is_empty() {
            return Err(
                LlmError::empty_response("Ollama finished without any text").provider(PROVIDER),
            );
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<LlmResponse> {
        debug!(
            "Sending {} chars to Ollama (model: {})",
            prompt.len(),
            self.model
        );

        let start_time = Instant::now();
        let url = format!("{}/api/generate", self.api_base);

        let response = self
            .client
            .post(&url)
            .json(&self.build_request(system, prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    warn!(
                        "Failed to connect to Ollama at {}. Is Ollama running? Start with: ollama serve",
                        self.api_base
                    );
                }
                LlmError::from_transport(&e, PROVIDER)
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, &body, PROVIDER).into());
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            LlmError::request_failed(format!("Failed to parse Ollama response: {}", e))
                .provider(PROVIDER)
        })?;
        let elapsed = start_time.elapsed();

        let usage = TokenUsage::from_ollama(
            body.prompt_eval_count.unwrap_or(0),
            body.eval_count.unwrap_or(0),
        );
        let api_ms = body.total_duration.map(|ns| ns / 1_000_000);
        let content = Self::interpret(body)?;

        debug!("Received {} chars from Ollama", content.len());
        Ok(LlmResponse::with_metrics(
            content,
            usage,
            ResponseTiming::with_api_time(elapsed, api_ms),
            ResponseMetadata {
                model: self.model.clone(),
                provider: PROVIDER.to_string(),
            },
        ))
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.api_base);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(tags) = resp.json::<TagsResponse>().await {
                    let model_available = tags.models.iter().any(|m| {
                        m.name == self.model
                            || m.name.starts_with(self.model.trim_end_matches(":latest"))
                    });

                    if model_available {
                        info!("Ollama is available with model: {}", self.model);
                        Ok(true)
                    } else {
                        warn!(
                            "Ollama is running but model '{}' not found. Pull with: ollama pull {}",
                            self.model, self.model
                        );
                        Ok(false)
                    }
                } else {
                    info!("Ollama is available");
                    Ok(true)
                }
            }
            Ok(resp) => {
                warn!("Ollama API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Ollama not available: {}. Start with: ollama serve", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    /// Nanoseconds
    #[serde(default)]
    total_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
