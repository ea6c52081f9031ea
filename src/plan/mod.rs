//! Exploration plan parsing
//!
//! The planner model answers in free text. [`PlanParser`] is the seam between
//! that text and the engine: the line-oriented regex parser below is the
//! default, and a structured-output parser can replace it without touching
//! the engine loop.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// One step proposed by the planner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Project-relative path, verbatim from the model (quotes included)
    ReadFile(String),
    Analyze(String),
    Finish,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile(path) => write!(f, "READ_FILE {}", path),
            Self::Analyze(subject) => write!(f, "ANALYZE {}", subject),
            Self::Finish => write!(f, "FINISH"),
        }
    }
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ReadFile(_) => "read",
            Self::Analyze(_) => "analyze",
            Self::Finish => "finish",
        }
    }
}

/// Whether a parsed plan ends exploration without executing anything.
pub fn is_terminal(plan: &[Action]) -> bool {
    matches!(plan, [] | [Action::Finish])
}

pub trait PlanParser: Send + Sync {
    /// Extract actions in input order. Nothing follows a `Finish`, and
    /// `ReadFile`/`Analyze` never carry an empty argument.
    fn parse(&self, raw: &str) -> Vec<Action>;
}

static ACTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+\.\s*(READ_FILE|ANALYZE|FINISH)\s*(.*)$").expect("action regex compiles")
});

/// Matches `N. KEYWORD argument` lines and skips everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinePlanParser;

impl PlanParser for LinePlanParser {
    fn parse(&self, raw: &str) -> Vec<Action> {
        let mut plan = Vec::new();

        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some(caps) = ACTION_LINE.captures(line) else {
                continue;
            };
            let argument = caps.get(2).map_or("", |m| m.as_str().trim());

            match &caps[1] {
                "FINISH" => {
                    plan.push(Action::Finish);
                    break;
                }
                _ if argument.is_empty() => {}
                "READ_FILE" => plan.push(Action::ReadFile(argument.to_string())),
                "ANALYZE" => plan.push(Action::Analyze(argument.to_string())),
                _ => {}
            }
        }

        plan
    }
}

/// Parse with the default [`LinePlanParser`].
pub fn parse_plan(raw: &str) -> Vec<Action> {
    LinePlanParser.parse(raw)
}
