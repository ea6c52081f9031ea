//! HTTP Server
//!
//! ```text
//! POST /analyze          multipart question + files → {"answer": ...}
//! POST /analyze-stream   multipart question + files → text/event-stream
//! GET  /health           {"status": "ok", "llm_available": bool}
//! GET  /*                static files from server.static_dir
//! ```

mod api;
pub mod upload;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{info, warn};

use crate::ai::SharedProvider;
use crate::config::Config;
use crate::types::Result;

/// Router state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: SharedProvider,
}

impl AppState {
    pub fn new(config: Config, provider: SharedProvider) -> Self {
        Self {
            config: Arc::new(config),
            provider,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.server.static_dir);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/analyze", post(api::analyze))
        .route("/analyze-stream", post(api::analyze_stream))
        .route("/health", get(api::health))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);

    if !state.config.server.static_dir.is_dir() {
        warn!(
            "Static directory '{}' does not exist; only the API will be served",
            state.config.server.static_dir.display()
        );
    }

    let listener = TcpListener::bind(&addr).await?;
    info!(
        "Listening on http://{} (provider: {}, model: {})",
        addr,
        state.provider.name(),
        state.provider.model()
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::upload::tests::{multipart_body, multipart_request};
    use super::*;
    use crate::ai::{LlmProvider, LlmResponse};
    use crate::engine::{EventKind, ProgressEvent};
    use crate::types::{AskError, LlmError};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// Pops scripted replies in order, then answers "1. FINISH".
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<String>>>,
        healthy: bool,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                healthy: true,
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<LlmResponse> {
            let next = self.replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok("1. FINISH".to_string()))
                .map(LlmResponse::content_only)
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(self.healthy)
        }
    }

    fn router(provider: Arc<ScriptedProvider>) -> Router {
        build_router(AppState::new(Config::default(), provider))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn sse_events(response: axum::response::Response) -> Vec<ProgressEvent> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim()).unwrap())
            .collect()
    }

    fn project_files() -> Vec<(&'static str, &'static str)> {
        vec![("README.md", "Hello"), ("src/main.go", "package main")]
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(ScriptedProvider::new(vec![]))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["llm_available"], true);
    }

    #[tokio::test]
    async fn test_analyze_returns_answer() {
        let provider = ScriptedProvider::new(vec![
            Ok("Go Backend".to_string()),
            Ok("1. READ_FILE src/main.go\n2. FINISH".to_string()),
            Ok("A tiny Go program.".to_string()),
        ]);
        let body = multipart_body(Some("What is this?"), &project_files());

        let response = router(provider)
            .oneshot(multipart_request("/analyze", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["answer"], "A tiny Go program.");
    }

    #[tokio::test]
    async fn test_analyze_rejects_missing_question() {
        let body = multipart_body(None, &project_files());
        let response = router(ScriptedProvider::new(vec![]))
            .oneshot(multipart_request("/analyze", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(
            json_body(response).await["error"]
                .as_str()
                .unwrap()
                .contains("question")
        );
    }

    #[tokio::test]
    async fn test_analyze_synthesis_failure_is_500() {
        let provider = ScriptedProvider::new(vec![
            Ok("Go Backend".to_string()),
            Ok("1. FINISH".to_string()),
            Err(AskError::from(LlmError::empty_response("no text"))),
        ]);
        let body = multipart_body(Some("q"), &project_files());

        let response = router(provider)
            .oneshot(multipart_request("/analyze", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            json_body(response).await["error"]
                .as_str()
                .unwrap()
                .contains("final answer")
        );
    }

    #[tokio::test]
    async fn test_stream_ends_with_result() {
        let provider = ScriptedProvider::new(vec![
            Ok("Go Backend".to_string()),
            Ok("1. FINISH".to_string()),
            Ok("The answer.".to_string()),
        ]);
        let body = multipart_body(Some("q"), &project_files());

        let response = router(provider)
            .oneshot(multipart_request("/analyze-stream", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );

        let events = sse_events(response).await;
        assert_eq!(events.first().unwrap().step, "initial");
        let last = events.last().unwrap();
        assert_eq!(last.kind, EventKind::Result);
        assert_eq!(last.data, "The answer.");
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn test_stream_restarts_on_transient_error() {
        let provider = ScriptedProvider::new(vec![
            Ok("Go Backend".to_string()),
            Ok("1. FINISH".to_string()),
            Err(AskError::from(LlmError::request_failed("503").transient())),
            Ok("Go Backend".to_string()),
            Ok("1. FINISH".to_string()),
            Ok("Recovered.".to_string()),
        ]);
        let body = multipart_body(Some("q"), &project_files());

        let response = router(provider)
            .oneshot(multipart_request("/analyze-stream", body))
            .await
            .unwrap();
        let events = sse_events(response).await;

        assert_eq!(events.iter().filter(|e| e.step == "retry").count(), 1);
        let last = events.last().unwrap();
        assert_eq!(last.kind, EventKind::Result);
        assert_eq!(last.data, "Recovered.");
    }

    #[tokio::test]
    async fn test_stream_ends_with_error_when_not_transient() {
        let provider = ScriptedProvider::new(vec![
            Ok("Go Backend".to_string()),
            Ok("1. FINISH".to_string()),
            Err(AskError::from(LlmError::incomplete_response("cut off"))),
        ]);
        let body = multipart_body(Some("q"), &project_files());

        let response = router(provider)
            .oneshot(multipart_request("/analyze-stream", body))
            .await
            .unwrap();
        let events = sse_events(response).await;

        assert!(events.iter().all(|e| e.step != "retry"));
        let last = events.last().unwrap();
        assert_eq!(last.kind, EventKind::Error);
        assert!(last.message.contains("final answer"));
    }

    #[tokio::test]
    async fn test_static_fallback() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>codeask</h1>").unwrap();
        let mut config = Config::default();
        config.server.static_dir = dir.path().to_path_buf();
        let router = build_router(AppState::new(config, ScriptedProvider::new(vec![])));

        let response = router
            .oneshot(Request::get("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<h1>codeask</h1>");
    }
}
