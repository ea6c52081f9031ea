//! codeask - Ask Questions About a Codebase
//!
//! Upload a project (or point at a local directory), ask a question in plain
//! language, and get an answer produced by an LLM that explores the code
//! iteratively: it reads the structure, plans which files to open, reads and
//! analyzes them, and finally synthesizes an answer from what it learned.
//!
//! ## Quick Start
//!
//! ```ignore
//! use codeask::{AnalysisEngine, Config, ai::create_provider};
//!
//! let config = Config::default();
//! let provider = create_provider(&config.llm)?;
//! let mut engine = AnalysisEngine::new(&config, provider, "./my-project", "Where is auth handled?");
//! let answer = engine.run().await?;
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: the exploration state machine and progress events
//! - [`explorer`]: directory walk, file reading, path resolution
//! - [`knowledge`]: per-request knowledge store and context summary
//! - [`plan`]: parsing model output into actions
//! - [`ai`]: LLM providers and prompt templates
//! - [`server`]: axum HTTP surface (JSON and SSE)
//! - [`config`]: figment-based configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod engine;
pub mod explorer;
pub mod knowledge;
pub mod plan;
pub mod server;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::error::{AskError, LlmError, LlmErrorKind, Result};

// =============================================================================
// Engine Re-exports
// =============================================================================

pub use engine::{
    AnalysisEngine, ChannelReporter, EnginePhase, EventKind, ProgressEvent, ProgressReporter,
    SilentReporter,
};
pub use knowledge::KnowledgeStore;
pub use plan::{Action, LinePlanParser, PlanParser, parse_plan};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{LlmProvider, LlmResponse, SharedProvider, create_provider};
