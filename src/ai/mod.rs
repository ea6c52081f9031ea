//! AI Integration Layer
//!
//! LLM backends and the prompts the analysis engine sends them.

pub mod prompt;
pub mod provider;

pub use prompt::{Prompt, PromptTemplates, fit_prompt};
pub use provider::{
    LlmProvider, LlmResponse, OllamaProvider, OpenAiProvider, ResponseMetadata, ResponseTiming,
    SharedProvider, TokenUsage, create_provider,
};
