//! Ask Command
//!
//! Run the analysis engine on a local directory and print the answer.
//!
//! Usage:
//!   codeask ask <DIR> <QUESTION> [--no-progress]

use std::path::PathBuf;

use tracing::info;

use crate::ai::create_provider;
use crate::cli::{ConsoleReporter, Output};
use crate::config::Config;
use crate::engine::{AnalysisEngine, ProgressEvent, ProgressReporter};
use crate::types::{AskError, Result};

pub struct AskOptions {
    pub dir: PathBuf,
    pub question: String,
    /// Hide per-step progress lines
    pub quiet_progress: bool,
}

pub async fn run(config: Config, options: AskOptions) -> Result<()> {
    if !options.dir.is_dir() {
        return Err(AskError::not_found(options.dir.display().to_string()));
    }
    let question = options.question.trim();
    if question.is_empty() {
        return Err(AskError::Config("question must not be empty".to_string()));
    }

    let provider = create_provider(&config.llm)?;
    info!(
        "Asking {} ({}) about {}",
        provider.name(),
        provider.model(),
        options.dir.display()
    );

    let reporter = ConsoleReporter::new(options.quiet_progress);
    let mut engine = AnalysisEngine::new(&config, provider, &options.dir, question);
    let output = Output::new();

    match engine.run_with(&reporter).await {
        Ok(answer) => {
            reporter.report(ProgressEvent::result(answer.as_str())).await;
            output.section("Answer");
            println!("{}", answer);
            Ok(())
        }
        Err(e) => {
            reporter
                .report(ProgressEvent::error("final", e.to_string()))
                .await;
            output.error(&format!(
                "{} files read, {} notes recorded before failure",
                engine.knowledge().file_count(),
                engine.knowledge().notes().len()
            ));
            Err(e)
        }
    }
}
