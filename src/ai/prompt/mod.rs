//! Prompt Templates
//!
//! One system/user pair per engine step. The context summary always comes
//! first in the user prompt; [`fit_prompt`] cuts the tail when a prompt is
//! over the configured length.

use std::borrow::Cow;

use tracing::warn;

use crate::types::truncate_chars;

/// A system instruction plus the user prompt sent with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: &'static str,
    pub user: String,
}

pub struct PromptTemplates;

impl PromptTemplates {
    pub fn classify(project_name: &str, structure: &str) -> Prompt {
        Prompt {
            system: "You are a software architecture expert.",
            user: format!(
                "Project: {}\n\
                 Project Structure (partial): {}\n\
                 ---\n\
                 Based on the structure, what is the type of this project (e.g., Go Backend, React Frontend)?\n\
                 Be brief (1 sentence).",
                project_name, structure
            ),
        }
    }

    pub fn plan(question: &str, summary: &str) -> Prompt {
        Prompt {
            system: "You are a code exploration planner. Respond ONLY with the numbered list of actions.",
            user: format!(
                "Objective: Answer \"{}\"\n\
                 Current Context:\n\
                 {}\n\
                 ---\n\
                 Propose the next 3-5 logical steps. Use actions: READ_FILE <path>, ANALYZE <subject>, FINISH.\n\
                 Only request files that appear in the structure, and do not request unavailable files again.\n\
                 MANDATORY output format: Simple numbered list.\n\
                 Example:\n\
                 1. READ_FILE main.go\n\
                 2. ANALYZE the application entry point\n",
                question, summary
            ),
        }
    }

    pub fn analyze(summary: &str, subject: &str) -> Prompt {
        Prompt {
            system: "You are a code analysis assistant.",
            user: format!(
                "Context: {}\n---\nAnalyze the following question: \"{}\"",
                summary, subject
            ),
        }
    }

    pub fn synthesize(summary: &str, question: &str) -> Prompt {
        Prompt {
            system: "You are an expert AI assistant who synthesizes technical information.",
            user: format!(
                "Final collected context:\n\
                 {}\n\
                 ---\n\
                 Synthesize all this information to provide a complete and structured answer to the user's initial question: \"{}\"",
                summary, question
            ),
        }
    }
}

/// Cut `user` to `max_chars` characters, logging when anything is dropped.
pub fn fit_prompt(user: &str, max_chars: usize) -> Cow<'_, str> {
    let cut = truncate_chars(user, max_chars);
    if cut.len() == user.len() {
        Cow::Borrowed(user)
    } else {
        warn!(
            "Prompt is being truncated from {} to {} characters",
            user.chars().count(),
            max_chars
        );
        Cow::Borrowed(cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_prompt_carries_question_and_keywords() {
        let prompt = PromptTemplates::plan("What does it do?", "SUMMARY");
        assert!(prompt.user.contains("Objective: Answer \"What does it do?\""));
        assert!(prompt.user.contains("SUMMARY"));
        assert!(prompt.user.contains("READ_FILE <path>, ANALYZE <subject>, FINISH"));
        assert!(prompt.system.contains("numbered list"));
    }

    #[test]
    fn test_context_comes_before_instruction() {
        let prompt = PromptTemplates::synthesize("CTX", "Q?");
        let ctx = prompt.user.find("CTX").unwrap();
        let question = prompt.user.find("\"Q?\"").unwrap();
        assert!(ctx < question);

        let prompt = PromptTemplates::analyze("CTX", "entry point");
        assert!(prompt.user.ends_with("Analyze the following question: \"entry point\""));
    }

    #[test]
    fn test_classify_prompt() {
        let prompt = PromptTemplates::classify("shop", "{\"main.go\": \"12 bytes\"}");
        assert!(prompt.user.starts_with("Project: shop\n"));
        assert!(prompt.user.contains("main.go"));
        assert_eq!(prompt.system, "You are a software architecture expert.");
    }

    #[test]
    fn test_fit_prompt() {
        assert!(matches!(fit_prompt("short", 10), Cow::Borrowed("short")));
        assert_eq!(fit_prompt("abcdefghij", 4), "abcd");
        assert_eq!(fit_prompt("ééééé", 2), "éé");
    }
}
