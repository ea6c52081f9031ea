//! Progress events and where they go
//!
//! The engine reports through [`ProgressReporter`]. A plain run uses
//! [`SilentReporter`]; the streaming endpoint uses [`ChannelReporter`], whose
//! `is_closed` turns true once the client has gone away.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Progress,
    Step,
    /// Terminal: carries the answer in `data`
    Result,
    /// Terminal: the run failed
    Error,
}

/// One line of the progress stream, serialized as the SSE `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub step: String,
    pub message: String,
    pub iteration: usize,
    pub total: usize,
    #[serde(default)]
    pub data: String,
}

impl ProgressEvent {
    fn new(kind: EventKind, step: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            step: step.to_string(),
            message: message.into(),
            iteration: 0,
            total: 0,
            data: String::new(),
        }
    }

    pub fn progress(step: &str, message: impl Into<String>) -> Self {
        Self::new(EventKind::Progress, step, message)
    }

    pub fn step(step: &str, message: impl Into<String>) -> Self {
        Self::new(EventKind::Step, step, message)
    }

    pub fn result(answer: impl Into<String>) -> Self {
        let mut event = Self::new(
            EventKind::Result,
            "complete",
            "Analysis completed successfully!",
        );
        event.data = answer.into();
        event
    }

    pub fn error(step: &str, message: impl Into<String>) -> Self {
        Self::new(EventKind::Error, step, message)
    }

    /// Attach the exploration position
    pub fn at(mut self, iteration: usize, total: usize) -> Self {
        self.iteration = iteration;
        self.total = total;
        self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::Result | EventKind::Error)
    }
}

#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, event: ProgressEvent);

    /// Nobody is listening any more; the engine stops at the next boundary.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

#[async_trait]
impl ProgressReporter for SilentReporter {
    async fn report(&self, _event: ProgressEvent) {}
}

/// Forwards events into a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelReporter {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ProgressReporter for ChannelReporter {
    async fn report(&self, event: ProgressEvent) {
        if self.tx.send(event).await.is_err() {
            debug!("Progress receiver dropped");
        }
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Keeps every event; used by engine and server tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CollectingReporter {
    events: std::sync::Mutex<Vec<ProgressEvent>>,
}

#[cfg(test)]
impl CollectingReporter {
    pub(crate) fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ProgressReporter for CollectingReporter {
    async fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}
