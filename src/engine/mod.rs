//! Analysis Engine
//!
//! Drives one question through the exploration loop:
//!
//! ```text
//! InitialAnalysis ─▶ Exploring { 1..=N } ─▶ Synthesizing ─▶ Done
//! ```
//!
//! - **Initial analysis**: directory structure, README, manifest discovery,
//!   and a one-line project classification
//! - **Exploration**: ask the model for a plan, execute its `READ_FILE` and
//!   `ANALYZE` steps, stop on `FINISH` or when the iteration budget runs out
//! - **Synthesis**: one final call over the accumulated context
//!
//! Every failure before synthesis is recorded as a note in the knowledge
//! store and the run carries on. Only a synthesis failure (or a closed
//! reporter) ends the run with an error.

pub mod events;
pub mod phase;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

pub use events::{ChannelReporter, EventKind, ProgressEvent, ProgressReporter, SilentReporter};
pub use phase::EnginePhase;

use crate::ai::{Prompt, PromptTemplates, SharedProvider, fit_prompt};
use crate::config::{AnalysisConfig, Config, ExplorerConfig};
use crate::constants::explorer::README_CANDIDATES;
use crate::constants::summary::MAX_STRUCTURE_CHARS;
use crate::explorer::{FileResolver, build_structure, read_file};
use crate::knowledge::{KnowledgeStore, build_context_summary};
use crate::plan::{Action, LinePlanParser, PlanParser, is_terminal};
use crate::types::{AskError, Result, truncate_chars, truncate_with_ellipsis};

/// Longest project type kept from the classification answer
const PROJECT_TYPE_CHARS: usize = 120;

pub struct AnalysisEngine {
    question: String,
    knowledge: Arc<KnowledgeStore>,
    resolver: FileResolver,
    provider: SharedProvider,
    parser: Arc<dyn PlanParser>,
    analysis: AnalysisConfig,
    explorer: ExplorerConfig,
    phase: EnginePhase,
}

impl AnalysisEngine {
    pub fn new(
        config: &Config,
        provider: SharedProvider,
        project_root: impl AsRef<Path>,
        question: impl Into<String>,
    ) -> Self {
        let knowledge = Arc::new(KnowledgeStore::new(project_root));
        let resolver = FileResolver::new(
            Arc::clone(&knowledge),
            config.manifests.clone(),
            config.analysis.max_file_retry_attempts,
        );

        Self {
            question: question.into(),
            knowledge,
            resolver,
            provider,
            parser: Arc::new(LinePlanParser),
            analysis: config.analysis.clone(),
            explorer: config.explorer.clone(),
            phase: EnginePhase::Initializing,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn PlanParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeStore> {
        &self.knowledge
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// Run to completion without progress reporting.
    pub async fn run(&mut self) -> Result<String> {
        self.run_with(&SilentReporter).await
    }

    /// Run to completion, reporting each step. Terminal `result`/`error`
    /// events are left to the caller.
    #[instrument(skip_all, fields(root = %self.knowledge.project_root().display(), provider = self.provider.name()))]
    pub async fn run_with(&mut self, reporter: &dyn ProgressReporter) -> Result<String> {
        info!("Starting analysis: {}", self.question);

        self.enter(EnginePhase::InitialAnalysis);
        reporter
            .report(ProgressEvent::progress(
                "initial",
                "Starting initial project analysis...",
            ))
            .await;
        self.initial_analysis(reporter).await?;

        reporter
            .report(ProgressEvent::progress(
                "exploration",
                "Starting exploration loop...",
            ))
            .await;
        self.explore(reporter).await?;

        Self::check_cancelled(reporter)?;
        self.enter(EnginePhase::Synthesizing);
        reporter
            .report(ProgressEvent::progress("final", "Generating final answer..."))
            .await;
        let answer = self.synthesize().await?;

        self.enter(EnginePhase::Done);
        info!(
            "Analysis complete ({} files read, answer {} chars)",
            self.knowledge.file_count(),
            answer.len()
        );
        Ok(answer)
    }

    fn enter(&mut self, next: EnginePhase) {
        if self.phase.can_advance_to(next) {
            debug!("Phase {} -> {}", self.phase, next);
            self.phase = next;
        } else {
            warn!("Ignoring backward phase change {} -> {}", self.phase, next);
        }
    }

    fn check_cancelled(reporter: &dyn ProgressReporter) -> Result<()> {
        if reporter.is_closed() {
            info!("Reporter closed, cancelling analysis");
            return Err(AskError::Cancelled);
        }
        Ok(())
    }

    /// Fit the prompt and send it.
    async fn ask(&self, prompt: Prompt) -> Result<String> {
        let user = fit_prompt(&prompt.user, self.analysis.max_prompt_length);
        let response = self.provider.complete(prompt.system, &user).await?;
        debug!(
            "LLM answered with {} chars ({} tokens, {} ms)",
            response.content.len(),
            response.usage.total(),
            response.timing.total_ms
        );
        Ok(response.content)
    }

    fn summary(&self) -> String {
        build_context_summary(
            &self.knowledge.snapshot(),
            &self.question,
            self.analysis.max_prompt_length,
        )
    }

    // =========================================================================
    // Initial analysis
    // =========================================================================

    async fn initial_analysis(&self, reporter: &dyn ProgressReporter) -> Result<()> {
        let root = self.knowledge.project_root().to_path_buf();

        reporter
            .report(ProgressEvent::step(
                "structure",
                "Analyzing directory structure...",
            ))
            .await;
        match build_structure(&root, self.analysis.max_directory_depth, &self.explorer) {
            Ok(structure) => {
                self.knowledge.set_structure(structure);
                self.knowledge
                    .add_history("Directory structure analysis complete.");
            }
            Err(e) => {
                warn!("Structure analysis failed: {}", e);
                self.knowledge
                    .add_note(format!("Error during initial analysis: {}", e));
            }
        }

        let discovered = self.resolver.discover_project_files();
        debug!("{} dependency files discovered", discovered);

        Self::check_cancelled(reporter)?;
        self.read_readme(&root, reporter).await;

        Self::check_cancelled(reporter)?;
        reporter
            .report(ProgressEvent::step("classify", "Determining project type..."))
            .await;
        self.classify().await;

        Ok(())
    }

    async fn read_readme(&self, root: &Path, reporter: &dyn ProgressReporter) {
        let Some(name) = README_CANDIDATES
            .iter()
            .find(|name| root.join(name).is_file())
        else {
            debug!("No README found");
            return;
        };

        reporter
            .report(ProgressEvent::step("readme", format!("Reading {}...", name)))
            .await;

        let path = root.join(name);
        match read_file(&path, self.analysis.max_file_read_size) {
            Ok(content) => {
                self.knowledge.set_readme_excerpt(&content);
                self.knowledge.add_file_content(&path, content);
                self.knowledge.add_history(format!("{} file read.", name));
            }
            Err(e) => {
                self.knowledge
                    .add_note(format!("Could not read {}: {}", name, e));
            }
        }
    }

    async fn classify(&self) {
        let snapshot = self.knowledge.snapshot();
        let structure = snapshot
            .structure
            .as_ref()
            .and_then(|s| serde_json::to_string(s).ok())
            .unwrap_or_default();
        let prompt = PromptTemplates::classify(
            &snapshot.project_name(),
            truncate_chars(&structure, MAX_STRUCTURE_CHARS),
        );

        match self.ask(prompt).await {
            Ok(answer) => {
                let line = answer.lines().map(str::trim).find(|l| !l.is_empty());
                if let Some(line) = line {
                    let project_type = truncate_chars(line, PROJECT_TYPE_CHARS);
                    self.knowledge.set_project_type(project_type);
                    self.knowledge
                        .add_history(format!("Estimated project type: {}", project_type));
                }
            }
            Err(e) => {
                warn!("Project classification failed: {}", e);
                self.knowledge
                    .add_note(format!("Project type classification failed: {}", e));
            }
        }
    }

    // =========================================================================
    // Exploration
    // =========================================================================

    async fn explore(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let total = self.analysis.max_exploration_iterations;

        for iteration in 1..=total {
            Self::check_cancelled(reporter)?;
            self.enter(EnginePhase::Exploring { iteration });
            info!("Exploration iteration {}/{}", iteration, total);

            reporter
                .report(
                    ProgressEvent::step(
                        "iteration",
                        format!("Planning iteration {} of {}...", iteration, total),
                    )
                    .at(iteration, total),
                )
                .await;

            let plan = match self.plan_next_steps().await {
                Ok(plan) => plan,
                Err(e) => {
                    warn!("Planning failed in iteration {}: {}", iteration, e);
                    self.knowledge
                        .add_note(format!("Planning error in iteration {}: {}", iteration, e));
                    reporter
                        .report(
                            ProgressEvent::step("planning", format!("Planning error: {}", e))
                                .at(iteration, total),
                        )
                        .await;
                    continue;
                }
            };

            if is_terminal(&plan) {
                info!("Planner finished exploration");
                reporter
                    .report(
                        ProgressEvent::step("finish", "Exploration complete.").at(iteration, total),
                    )
                    .await;
                return Ok(());
            }

            self.knowledge
                .set_current_plan(plan.iter().map(ToString::to_string).collect());
            reporter
                .report(
                    ProgressEvent::step(
                        "planning",
                        format!("Executing plan with {} actions...", plan.len()),
                    )
                    .at(iteration, total),
                )
                .await;

            if self.execute_plan(&plan, iteration, reporter).await? {
                info!("Plan requested FINISH after its actions");
                return Ok(());
            }
        }

        info!("Iteration budget of {} exhausted", total);
        Ok(())
    }

    async fn plan_next_steps(&self) -> Result<Vec<Action>> {
        let prompt = PromptTemplates::plan(&self.question, &self.summary());
        let raw = self.ask(prompt).await?;
        let plan = self.parser.parse(&raw);
        debug!("Parsed {} actions from plan", plan.len());
        Ok(plan)
    }

    /// Execute actions in order. Returns `true` when a `Finish` was reached.
    async fn execute_plan(
        &self,
        plan: &[Action],
        iteration: usize,
        reporter: &dyn ProgressReporter,
    ) -> Result<bool> {
        let total = self.analysis.max_exploration_iterations;

        for action in plan {
            Self::check_cancelled(reporter)?;

            if !matches!(action, Action::Finish) {
                reporter
                    .report(
                        ProgressEvent::step(action.label(), format!("Executing: {}", action))
                            .at(iteration, total),
                    )
                    .await;
                self.knowledge.add_history(action.to_string());
            }

            let outcome = match action {
                Action::ReadFile(path) => self.execute_read_file(path),
                Action::Analyze(subject) => self.execute_analyze(subject).await,
                Action::Finish => return Ok(true),
            };

            reporter
                .report(ProgressEvent::step(action.label(), outcome).at(iteration, total))
                .await;
        }

        Ok(false)
    }

    /// Returns the progress message for the step.
    fn execute_read_file(&self, requested: &str) -> String {
        let relative = match self.resolver.resolve(requested) {
            Ok(relative) => relative,
            Err(e) => {
                info!("Could not resolve '{}': {}", requested, e);
                self.knowledge
                    .add_note(format!("Failed to read '{}': {}", requested, e));
                return format!("Failed to read: {}", requested);
            }
        };

        let path = self.resolver.root().join(&relative);
        match read_file(&path, self.analysis.max_file_read_size) {
            Ok(content) => {
                let size = content.len();
                self.knowledge.add_file_content(&path, content);
                if relative != requested.trim() {
                    self.knowledge.add_note(format!(
                        "'{}' was not found; read '{}' instead",
                        requested, relative
                    ));
                }
                format!("Successfully read: {} ({} bytes)", relative, size)
            }
            Err(e) => {
                warn!("Read of '{}' failed: {}", relative, e);
                self.knowledge.record_failed_attempt(requested.trim());
                self.knowledge
                    .add_note(format!("Failed to read '{}': {}", requested, e));
                format!("Failed to read: {}", requested)
            }
        }
    }

    async fn execute_analyze(&self, subject: &str) -> String {
        let prompt = PromptTemplates::analyze(&self.summary(), subject);
        match self.ask(prompt).await {
            Ok(analysis) => {
                self.knowledge
                    .add_note(format!("Analysis of '{}': {}", subject, analysis));
                format!(
                    "Analysis complete: {}",
                    truncate_with_ellipsis(subject, 60)
                )
            }
            Err(e) => {
                warn!("Analysis of '{}' failed: {}", subject, e);
                self.knowledge
                    .add_note(format!("Failed to analyze '{}': {}", subject, e));
                format!("Analysis failed: {}", truncate_with_ellipsis(subject, 60))
            }
        }
    }

    // =========================================================================
    // Synthesis
    // =========================================================================

    async fn synthesize(&self) -> Result<String> {
        let prompt = PromptTemplates::synthesize(&self.summary(), &self.question);
        self.ask(prompt).await.map_err(|e| match e {
            AskError::Llm(inner) => AskError::Synthesis(inner),
            other => other,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
