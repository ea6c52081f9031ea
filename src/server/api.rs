//! Axum handlers.
//!
//! Each handler receives [`AppState`] via [`axum::extract::State`]. A request
//! owns its upload directory; for the streaming route it moves into the
//! spawned analysis task, so the directory lives until the stream ends.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use backon::{ExponentialBuilder, Retryable};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::{error, info, warn};

use super::AppState;
use super::upload::{Upload, receive};
use crate::constants::server::{
    EVENT_CHANNEL_CAPACITY, KEEP_ALIVE_SECS, RESTART_BASE_DELAY_MS, RESTART_MAX_DELAY_SECS,
};
use crate::engine::{AnalysisEngine, ChannelReporter, ProgressEvent, ProgressReporter};
use crate::types::{AskError, Result};

// =============================================================================
// Helpers
// =============================================================================

fn json_error(status: StatusCode, err: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn upload_status(err: &AskError) -> StatusCode {
    match err {
        AskError::Upload(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn accept(multipart: Multipart) -> std::result::Result<Upload, Response> {
    receive(multipart).await.map_err(|e| {
        warn!("Rejected upload: {}", e);
        json_error(upload_status(&e), e)
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /analyze
pub(super) async fn analyze(State(state): State<AppState>, multipart: Multipart) -> Response {
    let upload = match accept(multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    let mut engine = AnalysisEngine::new(
        &state.config,
        state.provider.clone(),
        upload.dir.path(),
        upload.question.as_str(),
    );

    match engine.run().await {
        Ok(answer) => (StatusCode::OK, Json(json!({ "answer": answer }))).into_response(),
        Err(e) => {
            error!("Analysis failed: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// POST /analyze-stream
pub(super) async fn analyze_stream(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Response {
    let upload = match accept(multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(stream_analysis(state, upload, ChannelReporter::new(tx)));

    let events = ReceiverStream::new(rx).map(|event| {
        Ok::<_, Infallible>(
            Event::default().data(serde_json::to_string(&event).unwrap_or_default()),
        )
    });

    Sse::new(events)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(KEEP_ALIVE_SECS)))
        .into_response()
}

/// GET /health
pub(super) async fn health(State(state): State<AppState>) -> Response {
    let llm_available = state.provider.health_check().await.unwrap_or(false);
    Json(json!({ "status": "ok", "llm_available": llm_available })).into_response()
}

// =============================================================================
// Streaming run
// =============================================================================

/// Run the analysis and finish the stream with a `result` or `error` event.
/// `upload` is dropped (and its directory removed) when this returns.
async fn stream_analysis(state: AppState, upload: Upload, reporter: ChannelReporter) {
    let terminal = match run_with_restart(&state, &upload, &reporter).await {
        Ok(answer) => ProgressEvent::result(answer),
        Err(AskError::Cancelled) => {
            info!("Client disconnected, analysis stopped");
            return;
        }
        Err(e) => {
            error!("Streaming analysis failed: {}", e);
            ProgressEvent::error("final", e.to_string())
        }
    };
    reporter.report(terminal).await;
}

/// Restart the whole analysis on transient LLM errors, at most
/// `server.stream_retries` times.
async fn run_with_restart(
    state: &AppState,
    upload: &Upload,
    reporter: &ChannelReporter,
) -> Result<String> {
    let retries = state.config.server.stream_retries;
    let attempts = AtomicUsize::new(0);

    let attempt = || {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt > 0 {
                reporter
                    .report(ProgressEvent::progress(
                        "retry",
                        format!(
                            "Transient LLM error, restarting analysis (attempt {} of {})...",
                            attempt + 1,
                            retries + 1
                        ),
                    ))
                    .await;
            }
            let mut engine = AnalysisEngine::new(
                &state.config,
                state.provider.clone(),
                upload.dir.path(),
                upload.question.as_str(),
            );
            engine.run_with(reporter).await
        }
    };

    attempt
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(RESTART_BASE_DELAY_MS))
                .with_max_delay(Duration::from_secs(RESTART_MAX_DELAY_SECS))
                .with_max_times(retries),
        )
        .when(|e: &AskError| e.is_transient() && !reporter.is_closed())
        .notify(|e: &AskError, delay: Duration| {
            warn!("Analysis failed transiently ({}), restarting in {:?}", e, delay);
        })
        .await
}
