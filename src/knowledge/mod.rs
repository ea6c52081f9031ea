//! Knowledge Store
//!
//! Per-request record of everything learned about the project: structure,
//! classification, file contents, notes, action history, and the negative
//! knowledge (failed paths) that steers later planning.
//!
//! All state sits behind a single `Mutex`; every method takes `&self` so the
//! store can be shared as `Arc<KnowledgeStore>` between the engine, the
//! resolver, and progress reporting.

pub mod summary;

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::constants::explorer::{README_EXCERPT_CHARS, UNKNOWN_PROJECT_TYPE};
use crate::explorer::ProjectTree;
use crate::types::{truncate_chars, truncate_with_ellipsis};

pub use summary::build_context_summary;

// =============================================================================
// Journal
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Analysis observation or recorded failure
    Note,
    /// Executed action
    History,
}

/// Notes and history share one chronological journal so the summary can
/// show the most recent entries of either kind in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub kind: EntryKind,
    pub text: String,
}

// =============================================================================
// State
// =============================================================================

/// Point-in-time copy of the store, consumed by the summary builder.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeSnapshot {
    pub project_root: PathBuf,
    pub structure: Option<ProjectTree>,
    pub project_type: String,
    pub readme_excerpt: Option<String>,
    pub file_contents: BTreeMap<String, String>,
    pub journal: Vec<JournalEntry>,
    pub current_plan: Vec<String>,
    pub failed_attempts: BTreeMap<String, u32>,
    pub available_files: Vec<String>,
    pub dependency_files: BTreeMap<String, String>,
}

impl KnowledgeSnapshot {
    /// Final component of the project root
    pub fn project_name(&self) -> String {
        self.project_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.project_root.display().to_string())
    }
}

pub struct KnowledgeStore {
    project_root: PathBuf,
    state: Mutex<KnowledgeSnapshot>,
}

impl KnowledgeStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        let given = project_root.as_ref();
        let project_root = std::path::absolute(given).unwrap_or_else(|e| {
            warn!("Could not resolve absolute path for {}: {}", given.display(), e);
            given.to_path_buf()
        });

        let state = KnowledgeSnapshot {
            project_root: project_root.clone(),
            project_type: UNKNOWN_PROJECT_TYPE.to_string(),
            ..Default::default()
        };

        Self {
            project_root,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, KnowledgeSnapshot> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn snapshot(&self) -> KnowledgeSnapshot {
        self.lock().clone()
    }

    // =========================================================================
    // Initial analysis
    // =========================================================================

    pub fn set_structure(&self, structure: ProjectTree) {
        self.lock().structure = Some(structure);
    }

    pub fn structure(&self) -> Option<ProjectTree> {
        self.lock().structure.clone()
    }

    /// Replace the project type when `project_type` is non-empty and differs.
    /// Returns whether the stored value changed.
    pub fn set_project_type(&self, project_type: &str) -> bool {
        let project_type = project_type.trim();
        let mut state = self.lock();
        if project_type.is_empty() || state.project_type == project_type {
            return false;
        }
        state.project_type = project_type.to_string();
        info!("Project type updated: {}", project_type);
        true
    }

    pub fn project_type(&self) -> String {
        self.lock().project_type.clone()
    }

    /// Keep the first characters of the first README seen.
    pub fn set_readme_excerpt(&self, content: &str) {
        let mut state = self.lock();
        if state.readme_excerpt.is_none() {
            state.readme_excerpt = Some(truncate_chars(content, README_EXCERPT_CHARS).to_string());
        }
    }

    pub fn readme_excerpt(&self) -> Option<String> {
        self.lock().readme_excerpt.clone()
    }

    // =========================================================================
    // File contents
    // =========================================================================

    /// Key for `path` relative to the project root, `/`-separated.
    ///
    /// Absolute paths outside the root collapse to their file name so that
    /// no absolute path ever becomes a key.
    pub fn relative_key(&self, path: &Path) -> String {
        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.project_root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => {
                    warn!("'{}' is outside the project root", path.display());
                    path.file_name().map(PathBuf::from).unwrap_or_default()
                }
            }
        } else {
            path.to_path_buf()
        };

        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn add_file_content(&self, path: &Path, content: String) {
        let key = self.relative_key(path);
        info!("Content added for '{}'", key);
        self.lock().file_contents.insert(key, content);
    }

    pub fn file_content(&self, relative: &str) -> Option<String> {
        self.lock().file_contents.get(relative).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.lock().file_contents.len()
    }

    // =========================================================================
    // Notes & history
    // =========================================================================

    fn append(&self, kind: EntryKind, text: String) -> bool {
        let mut state = self.lock();
        let last_of_kind = state.journal.iter().rev().find(|e| e.kind == kind);
        if last_of_kind.is_some_and(|e| e.text == text) {
            return false;
        }
        debug!("{:?} added: {}", kind, truncate_with_ellipsis(&text, 100));
        state.journal.push(JournalEntry { kind, text });
        true
    }

    /// Append an observation; an exact repeat of the previous note is dropped.
    pub fn add_note(&self, note: impl Into<String>) -> bool {
        self.append(EntryKind::Note, note.into())
    }

    /// Append an action description; an exact repeat of the previous one is dropped.
    pub fn add_history(&self, action: impl Into<String>) -> bool {
        self.append(EntryKind::History, action.into())
    }

    fn entries(&self, kind: EntryKind) -> Vec<String> {
        self.lock()
            .journal
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.text.clone())
            .collect()
    }

    pub fn notes(&self) -> Vec<String> {
        self.entries(EntryKind::Note)
    }

    pub fn history(&self) -> Vec<String> {
        self.entries(EntryKind::History)
    }

    pub fn set_current_plan(&self, plan: Vec<String>) {
        self.lock().current_plan = plan;
    }

    pub fn current_plan(&self) -> Vec<String> {
        self.lock().current_plan.clone()
    }

    // =========================================================================
    // Resolution bookkeeping
    // =========================================================================

    /// Increment the failure counter for `path`, returning the new count.
    pub fn record_failed_attempt(&self, path: &str) -> u32 {
        let mut state = self.lock();
        let count = state.failed_attempts.entry(path.to_string()).or_insert(0);
        *count += 1;
        debug!("Failed attempt #{} for '{}'", *count, path);
        *count
    }

    pub fn failed_attempts(&self, path: &str) -> u32 {
        self.lock().failed_attempts.get(path).copied().unwrap_or(0)
    }

    pub fn add_available_file(&self, path: &str) {
        let mut state = self.lock();
        if !state.available_files.iter().any(|p| p == path) {
            debug!("Available file recorded: '{}'", path);
            state.available_files.push(path.to_string());
        }
    }

    pub fn available_files(&self) -> Vec<String> {
        self.lock().available_files.clone()
    }

    /// One slot per ecosystem tag; the last write wins.
    pub fn add_dependency_file(&self, tag: &str, path: &str) {
        info!("Dependency file found: {} -> {}", tag, path);
        self.lock()
            .dependency_files
            .insert(tag.to_string(), path.to_string());
    }

    pub fn dependency_files(&self) -> BTreeMap<String, String> {
        self.lock().dependency_files.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let store = KnowledgeStore::new("/tmp/project");
        assert_eq!(store.project_type(), "Unknown");
        assert!(store.readme_excerpt().is_none());
        assert!(store.structure().is_none());
        assert_eq!(store.snapshot().project_name(), "project");
    }

    #[test]
    fn test_note_deduplication() {
        let store = KnowledgeStore::new("/tmp/project");
        assert!(store.add_note("A"));
        assert!(!store.add_note("A"));
        assert_eq!(store.notes(), vec!["A"]);

        store.add_note("B");
        store.add_note("A");
        assert_eq!(store.notes(), vec!["A", "B", "A"]);
        assert_eq!(store.notes().iter().filter(|n| *n == "A").count(), 2);
    }

    #[test]
    fn test_history_deduplication_is_per_kind() {
        let store = KnowledgeStore::new("/tmp/project");
        store.add_history("READ_FILE main.go");
        store.add_note("read failed");
        assert!(!store.add_history("READ_FILE main.go"));
        assert_eq!(store.history(), vec!["READ_FILE main.go"]);
        assert_eq!(store.snapshot().journal.len(), 2);
    }

    #[test]
    fn test_project_type_write_if_different() {
        let store = KnowledgeStore::new("/tmp/project");
        assert!(!store.set_project_type("  "));
        assert_eq!(store.project_type(), "Unknown");
        assert!(store.set_project_type("Go Backend"));
        assert!(!store.set_project_type("Go Backend"));
        assert!(store.set_project_type("Go CLI"));
        assert_eq!(store.project_type(), "Go CLI");
    }

    #[test]
    fn test_readme_excerpt_set_once() {
        let store = KnowledgeStore::new("/tmp/project");
        let long = "x".repeat(800);
        store.set_readme_excerpt(&long);
        store.set_readme_excerpt("second");
        assert_eq!(store.readme_excerpt().unwrap().len(), 500);
    }

    #[test]
    fn test_file_content_keys_are_relative() {
        let dir = TempDir::new().unwrap();
        let store = KnowledgeStore::new(dir.path());

        store.add_file_content(&dir.path().join("src").join("main.go"), "package main".into());
        store.add_file_content(Path::new("./README.md"), "Hello".into());
        store.add_file_content(Path::new("/elsewhere/secret.txt"), "x".into());

        let keys: Vec<String> = store.snapshot().file_contents.keys().cloned().collect();
        assert_eq!(keys, vec!["README.md", "secret.txt", "src/main.go"]);
        assert_eq!(store.file_content("src/main.go").as_deref(), Some("package main"));
    }

    #[test]
    fn test_failed_attempts_and_available_files() {
        let store = KnowledgeStore::new("/tmp/project");
        assert_eq!(store.failed_attempts("missing.txt"), 0);
        assert_eq!(store.record_failed_attempt("missing.txt"), 1);
        assert_eq!(store.record_failed_attempt("missing.txt"), 2);
        assert_eq!(store.failed_attempts("missing.txt"), 2);

        store.add_available_file("go.mod");
        store.add_available_file("go.mod");
        assert_eq!(store.available_files(), vec!["go.mod"]);

        store.add_dependency_file("go", "go.mod");
        store.add_dependency_file("go", "go.sum");
        assert_eq!(store.dependency_files()["go"], "go.sum");
    }

    #[test]
    fn test_concurrent_appends() {
        let store = Arc::new(KnowledgeStore::new("/tmp/project"));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.add_note(format!("thread {} note {}", t, i));
                        store.add_history(format!("thread {} action {}", t, i));
                        store.record_failed_attempt("shared.txt");
                        store.add_available_file(&format!("file{}.rs", i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.notes().len(), 400);
        assert_eq!(store.history().len(), 400);
        assert_eq!(store.failed_attempts("shared.txt"), 400);
        assert_eq!(store.available_files().len(), 50);
    }
}
