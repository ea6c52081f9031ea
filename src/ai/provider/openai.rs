//! OpenAI-compatible Chat Completions Provider
//!
//! Works against api.openai.com and any server exposing the same
//! `/chat/completions` route (vLLM, LM Studio, llama.cpp server).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
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

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const PROVIDER: &str = "openai";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// Optional for self-hosted compatible servers
    api_key: Option<SecretString>,
    api_base: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty())
            .map(SecretString::from);

        let api_base = config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
        let api_base = validate_endpoint(api_base, PROVIDER)?;

        if api_key.is_none() && api_base == DEFAULT_API_BASE {
            warn!("No OpenAI API key configured. Set OPENAI_API_KEY or llm.api_key");
        }

        info!("Using OpenAI-compatible API at {} with model {}", api_base, config.model);

        Ok(Self {
            api_key,
            api_base,
            model: config.model.clone(),
            temperature: config.temperature,
            client: http_client(config.timeout_secs, PROVIDER)?,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(
                "Authorization",
                format!("Bearer {}", key.expose_secret()),
            ),
            None => request,
        }
    }

    fn build_request<'a>(&'a self, system: &'a str, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        }
    }

    fn interpret(body: ChatCompletionResponse) -> std::result::Result<String, LlmError> {
        let Some(choice) = body.choices.into_iter().next() else {
            return Err(LlmError::empty_response("No choices in response").provider(PROVIDER));
        };
        if choice.finish_reason.as_deref() == Some("length") {
            return Err(LlmError::incomplete_response(
                "Output stopped at the token limit (finish_reason=length)",
            )
            .provider(PROVIDER));
        }
        let text = clean_response(choice.message.content.as_deref().unwrap_or_default());
        if text.is_empty() {
            return Err(LlmError::empty_response("No content in response").provider(PROVIDER));
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<LlmResponse> {
        debug!(
            "Sending {} chars to OpenAI-compatible API (model: {})",
            prompt.len(),
            self.model
        );

        let start_time = Instant::now();
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .authorized(self.client.post(&url))
            .json(&self.build_request(system, prompt))
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e, PROVIDER))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, &body, PROVIDER).into());
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            LlmError::request_failed(format!("Failed to parse OpenAI response: {}", e))
                .provider(PROVIDER)
        })?;
        let elapsed = start_time.elapsed();

        let usage = body
            .usage
            .as_ref()
            .map(|u| TokenUsage::from_openai(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();
        let content = Self::interpret(body)?;

        Ok(LlmResponse::with_metrics(
            content,
            usage,
            ResponseTiming::from_duration(elapsed),
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
        let url = format!("{}/models", self.api_base);

        let response = self
            .authorized(self.client.get(&url))
            .timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI-compatible API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!("OpenAI API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("OpenAI API check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AskError, LlmErrorKind};
    use axum::{Json, Router, http::HeaderMap, routing::post};
    use serde_json::{Value, json};

    async fn stub(reply: Value) -> String {
        let router = Router::new().route(
            "/chat/completions",
            post(move |headers: HeaderMap, Json(request): Json<Value>| {
                let reply = reply.clone();
                async move {
                    assert_eq!(headers["authorization"], "Bearer sk-test");
                    assert_eq!(request["messages"][0]["role"], "system");
                    assert_eq!(request["messages"][1]["role"], "user");
                    Json(reply)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{}", addr)
    }

    fn provider_for(api_base: String) -> OpenAiProvider {
        OpenAiProvider::new(&LlmConfig {
            provider: "openai".to_string(),
            model: "gpt-test".to_string(),
            api_base: Some(api_base),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = provider_for("http://127.0.0.1:9".to_string());
        let debug = format!("{:?}", provider);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-test"));
    }

    #[tokio::test]
    async fn test_complete() {
        let base = stub(json!({
            "choices": [{"message": {"content": "A Go CLI."}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 30, "completion_tokens": 4}
        }))
        .await;

        let response = provider_for(base).complete("sys", "classify").await.unwrap();
        assert_eq!(response.content, "A Go CLI.");
        assert_eq!(response.usage.input_tokens, 30);
        assert_eq!(response.metadata.model, "gpt-test");
    }

    #[tokio::test]
    async fn test_length_finish_is_incomplete() {
        let base = stub(json!({
            "choices": [{"message": {"content": "cut"}, "finish_reason": "length"}]
        }))
        .await;
        let err = provider_for(base).complete("sys", "p").await.unwrap_err();
        assert!(matches!(
            err,
            AskError::Llm(LlmError { kind: LlmErrorKind::IncompleteResponse, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_content_is_empty() {
        let base = stub(json!({"choices": [{"message": {"content": null}}]})).await;
        let err = provider_for(base).complete("sys", "p").await.unwrap_err();
        assert!(matches!(
            err,
            AskError::Llm(LlmError { kind: LlmErrorKind::EmptyResponse, .. })
        ));
    }
}
