//! Context Summary Builder
//!
//! Formats a [`KnowledgeSnapshot`] into the bounded text block every planning,
//! analysis, and synthesis prompt starts with. Each section has its own
//! budget; the block as a whole is not cut here, only reported when it gets
//! close to the prompt limit (prompt fitting happens in `ai::prompt`).

use std::fmt::Write;

use tracing::warn;

use super::KnowledgeSnapshot;
use crate::constants::summary::{
    ENTRY_CHARS, FILE_EXCERPT_CHARS, MAX_LISTED_FILES, MAX_RECENT_ENTRIES, MAX_STRUCTURE_CHARS,
    PROMPT_WARNING_MARGIN, STRUCTURE_TRUNCATED_MARKER,
};
use crate::types::{single_line_excerpt, truncate_chars, truncate_with_ellipsis};

const NONE: &str = "(none)\n";

pub fn build_context_summary(
    snapshot: &KnowledgeSnapshot,
    question: &str,
    max_prompt_length: usize,
) -> String {
    let mut out = String::new();

    // write! into a String cannot fail
    let _ = writeln!(out, "User question: \"{}\"", question);
    let _ = writeln!(
        out,
        "Project: {} (Type: {})",
        snapshot.project_name(),
        snapshot.project_type
    );

    if let Some(structure) = &snapshot.structure
        && let Ok(json) = serde_json::to_string_pretty(structure)
    {
        let rendered = if json.chars().count() > MAX_STRUCTURE_CHARS {
            format!(
                "{}{}",
                truncate_chars(&json, MAX_STRUCTURE_CHARS),
                STRUCTURE_TRUNCATED_MARKER
            )
        } else {
            json
        };
        let _ = writeln!(
            out,
            "\nProject structure (partial):\n```json\n{}\n```",
            rendered
        );
    }

    out.push_str("\nFiles read (excerpts):\n");
    if snapshot.file_contents.is_empty() {
        out.push_str(NONE);
    } else {
        for (path, content) in snapshot.file_contents.iter().take(MAX_LISTED_FILES) {
            let _ = writeln!(
                out,
                "- `{}`: {}...",
                path,
                single_line_excerpt(content, FILE_EXCERPT_CHARS)
            );
        }
        let remaining = snapshot.file_contents.len().saturating_sub(MAX_LISTED_FILES);
        if remaining > 0 {
            let _ = writeln!(out, "... and {} other files read.", remaining);
        }
    }

    out.push_str("\nUnavailable files (do not request them again):\n");
    if snapshot.failed_attempts.is_empty() {
        out.push_str(NONE);
    } else {
        for (path, attempts) in &snapshot.failed_attempts {
            let _ = writeln!(out, "- {} (tried {} times)", path, attempts);
        }
    }

    out.push_str("\nAvailable dependency files:\n");
    if snapshot.dependency_files.is_empty() {
        out.push_str("(none detected)\n");
    } else {
        for (tag, path) in &snapshot.dependency_files {
            let _ = writeln!(out, "- {}: {}", tag, path);
        }
    }

    out.push_str("\nRecent history/notes:\n");
    if snapshot.journal.is_empty() {
        out.push_str(NONE);
    } else {
        let start = snapshot.journal.len().saturating_sub(MAX_RECENT_ENTRIES);
        for entry in &snapshot.journal[start..] {
            let _ = writeln!(out, "- {}", truncate_with_ellipsis(&entry.text, ENTRY_CHARS));
        }
    }

    let length = out.chars().count();
    if length > max_prompt_length.saturating_sub(PROMPT_WARNING_MARGIN) {
        warn!("Context summary is potentially too long ({} chars)", length);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::{ProjectTree, TreeNode};
    use crate::knowledge::KnowledgeStore;

    fn store() -> KnowledgeStore {
        KnowledgeStore::new("/work/shop")
    }

    #[test]
    fn test_empty_store_sections() {
        let summary = build_context_summary(&store().snapshot(), "What is this?", 7500);
        assert!(summary.starts_with("User question: \"What is this?\"\n"));
        assert!(summary.contains("Project: shop (Type: Unknown)"));
        assert!(summary.contains("Files read (excerpts):\n(none)"));
        assert!(summary.contains("Available dependency files:\n(none detected)"));
        assert!(summary.contains("Recent history/notes:\n(none)"));
        assert!(!summary.contains("```json"));
    }

    #[test]
    fn test_file_listing_is_capped() {
        let store = store();
        for i in 0..7 {
            store.add_file_content(
                std::path::Path::new(&format!("f{}.txt", i)),
                format!("line one `code`\nline two {}", "z".repeat(200)),
            );
        }
        let summary = build_context_summary(&store.snapshot(), "q", 7500);

        assert_eq!(summary.matches("- `f").count(), 5);
        assert!(summary.contains("... and 2 other files read."));
        assert!(summary.contains("- `f0.txt`: line one code line two "));
        let line = summary.lines().find(|l| l.starts_with("- `f0.txt`")).unwrap();
        assert_eq!(line.len(), "- `f0.txt`: ".len() + 80 + 3);
    }

    #[test]
    fn test_failed_and_dependency_sections() {
        let store = store();
        store.record_failed_attempt("missing.txt");
        store.record_failed_attempt("missing.txt");
        store.add_dependency_file("go", "go.mod");
        let summary = build_context_summary(&store.snapshot(), "q", 7500);

        assert!(summary.contains("- missing.txt (tried 2 times)"));
        assert!(summary.contains("- go: go.mod"));
    }

    #[test]
    fn test_recent_entries_window_and_cut() {
        let store = store();
        for i in 0..10 {
            store.add_note(format!("note {}", i));
        }
        store.add_history(format!("ANALYZE {}", "y".repeat(120)));
        let summary = build_context_summary(&store.snapshot(), "q", 7500);

        assert!(!summary.contains("- note 4\n"));
        assert!(summary.contains("- note 5\n"));
        assert!(summary.contains("- note 9\n"));
        let cut = format!("- ANALYZE {}...", "y".repeat(72));
        assert!(summary.contains(&cut));
    }

    #[test]
    fn test_structure_is_truncated() {
        let store = store();
        let mut tree = ProjectTree::new();
        for i in 0..200 {
            tree.insert(format!("file_{:03}.rs", i), TreeNode::File("10 bytes".into()));
        }
        store.set_structure(tree);
        let summary = build_context_summary(&store.snapshot(), "q", 7500);

        assert!(summary.contains(STRUCTURE_TRUNCATED_MARKER));
        assert!(summary.contains("file_000.rs"));
        assert!(!summary.contains("file_199.rs"));
    }
}
