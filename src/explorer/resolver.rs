//! File Resolver
//!
//! Maps a path proposed by the model to a file that actually exists.
//!
//! ## Resolution order
//!
//! 1. Paths that already failed `max_retry_attempts` times: rejected with
//!    [`AskError::RetryLimitExceeded`] without touching the counter
//! 2. Exact regular file under the project root: marked available, returned
//! 3. Manifest alternatives from name keywords, then from the project type
//! 4. Otherwise the failure is charged to the requested path

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::manifest::{
    COMMON_FILES, existing_for_tag, find_in_root, tags_for_name, tags_for_project_type,
};
use super::sanitize_relative_path;
use crate::config::ManifestConfig;
use crate::knowledge::KnowledgeStore;
use crate::types::{AskError, Result};

pub struct FileResolver {
    root: PathBuf,
    knowledge: Arc<KnowledgeStore>,
    manifests: ManifestConfig,
    max_retry_attempts: u32,
}

impl FileResolver {
    pub fn new(
        knowledge: Arc<KnowledgeStore>,
        manifests: ManifestConfig,
        max_retry_attempts: u32,
    ) -> Self {
        Self {
            root: knowledge.project_root().to_path_buf(),
            knowledge,
            manifests,
            max_retry_attempts,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `requested` to an existing path relative to the project root.
    pub fn resolve(&self, requested: &str) -> Result<String> {
        let requested = requested.trim();

        let attempts = self.knowledge.failed_attempts(requested);
        if attempts >= self.max_retry_attempts {
            return Err(AskError::RetryLimitExceeded {
                path: requested.to_string(),
                attempts,
            });
        }

        if let Some(relative) = sanitize_relative_path(requested)
            && self.root.join(&relative).is_file()
        {
            self.knowledge.add_available_file(&relative);
            return Ok(relative);
        }

        for candidate in self.alternatives_for(requested) {
            if let Some(found) = find_in_root(&self.root, &candidate).into_iter().next() {
                info!("Resolved '{}' to alternative '{}'", requested, found);
                self.knowledge.add_available_file(&found);
                return Ok(found);
            }
        }

        let count = self.knowledge.record_failed_attempt(requested);
        debug!("No file for '{}' (failure #{})", requested, count);
        Err(AskError::NoAlternativeFound {
            path: requested.to_string(),
        })
    }

    /// Candidate manifest names for `requested`, deduplicated, name hints first.
    fn alternatives_for(&self, requested: &str) -> Vec<String> {
        let file_name = Path::new(requested)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| requested.to_string());

        let mut tags = tags_for_name(&file_name);
        for tag in tags_for_project_type(&self.knowledge.project_type()) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let mut candidates: Vec<String> = Vec::new();
        for tag in tags {
            for entry in self.manifests.get(tag).unwrap_or_default() {
                if !candidates.contains(entry) {
                    candidates.push(entry.clone());
                }
            }
        }
        candidates
    }

    /// Existing manifests of one ecosystem.
    pub fn available_alternatives(&self, tag: &str) -> Vec<String> {
        existing_for_tag(&self.root, &self.manifests, tag)
    }

    /// Seed the store with every manifest and common file present at the root.
    ///
    /// Returns the number of files recorded.
    pub fn discover_project_files(&self) -> usize {
        let mut found = 0;

        for (tag, entries) in self.manifests.iter() {
            for entry in entries {
                for name in find_in_root(&self.root, entry) {
                    self.knowledge.add_available_file(&name);
                    self.knowledge.add_dependency_file(tag, &name);
                    found += 1;
                }
            }
        }

        for name in COMMON_FILES {
            if self.root.join(name).is_file() {
                self.knowledge.add_available_file(name);
                found += 1;
            }
        }

        info!("Discovered {} project files", found);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn resolver_for(dir: &TempDir, max_attempts: u32) -> (FileResolver, Arc<KnowledgeStore>) {
        let store = Arc::new(KnowledgeStore::new(dir.path()));
        let resolver = FileResolver::new(Arc::clone(&store), ManifestConfig::default(), max_attempts);
        (resolver, store)
    }

    #[test]
    fn test_exact_path_is_returned() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        let (resolver, store) = resolver_for(&dir, 3);

        assert_eq!(resolver.resolve("src/main.rs").unwrap(), "src/main.rs");
        assert_eq!(resolver.resolve("./src/main.rs").unwrap(), "src/main.rs");
        assert_eq!(store.available_files(), vec!["src/main.rs"]);
    }

    #[test]
    fn test_composer_alternative() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("composer.json"), "{}").unwrap();
        let (resolver, store) = resolver_for(&dir, 3);

        assert_eq!(resolver.resolve("composer-info.php").unwrap(), "composer.json");
        assert!(store.available_files().contains(&"composer.json".to_string()));
        assert_eq!(store.failed_attempts("composer-info.php"), 0);
    }

    #[test]
    fn test_project_type_alternative() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("go.mod"), "module demo").unwrap();
        let (resolver, store) = resolver_for(&dir, 3);

        assert!(resolver.resolve("dependencies.txt").is_err());
        store.set_project_type("Go Backend");
        assert_eq!(resolver.resolve("dependencies.txt").unwrap(), "go.mod");
    }

    #[test]
    fn test_retry_limit() {
        let dir = TempDir::new().unwrap();
        let (resolver, store) = resolver_for(&dir, 3);

        for _ in 0..3 {
            assert!(matches!(
                resolver.resolve("missing.txt"),
                Err(AskError::NoAlternativeFound { .. })
            ));
        }
        for _ in 0..4 {
            assert!(matches!(
                resolver.resolve("missing.txt"),
                Err(AskError::RetryLimitExceeded { attempts: 3, .. })
            ));
        }
        assert_eq!(store.failed_attempts("missing.txt"), 3);
    }

    #[test]
    fn test_exhausted_path_stays_rejected_even_if_it_exists() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("logo.bin"), [0u8, 1, 2]).unwrap();
        let (resolver, store) = resolver_for(&dir, 3);

        for _ in 0..3 {
            assert_eq!(resolver.resolve("logo.bin").unwrap(), "logo.bin");
            store.record_failed_attempt("logo.bin");
        }
        for _ in 0..3 {
            assert!(matches!(
                resolver.resolve("logo.bin"),
                Err(AskError::RetryLimitExceeded { attempts: 3, .. })
            ));
        }
        assert_eq!(store.failed_attempts("logo.bin"), 3);
    }

    #[test]
    fn test_directory_is_not_resolved_as_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let (resolver, store) = resolver_for(&dir, 3);

        assert!(matches!(
            resolver.resolve("src"),
            Err(AskError::NoAlternativeFound { .. })
        ));
        assert!(!store.available_files().contains(&"src".to_string()));
        assert_eq!(store.failed_attempts("src"), 1);
    }

    #[test]
    fn test_escaping_paths_are_not_resolved() {
        let dir = TempDir::new().unwrap();
        let inner = dir.path().join("project");
        fs::create_dir(&inner).unwrap();
        fs::write(dir.path().join("outside.txt"), "secret").unwrap();

        let store = Arc::new(KnowledgeStore::new(&inner));
        let resolver = FileResolver::new(Arc::clone(&store), ManifestConfig::default(), 3);

        assert!(resolver.resolve("../outside.txt").is_err());
        let absolute = dir.path().join("outside.txt");
        assert!(resolver.resolve(&absolute.to_string_lossy()).is_err());
        assert_eq!(store.failed_attempts("../outside.txt"), 1);
    }

    #[test]
    fn test_discover_project_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("App.csproj"), "<Project/>").unwrap();
        fs::write(dir.path().join("README.md"), "Hello").unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM scratch").unwrap();
        let (resolver, store) = resolver_for(&dir, 3);

        assert_eq!(resolver.discover_project_files(), 4);
        let deps = store.dependency_files();
        assert_eq!(deps["npm"], "package.json");
        assert_eq!(deps["dotnet"], "App.csproj");
        let available = store.available_files();
        assert!(available.contains(&"README.md".to_string()));
        assert!(available.contains(&"Dockerfile".to_string()));
    }

    #[test]
    fn test_available_alternatives() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "flask").unwrap();
        fs::write(dir.path().join("pyproject.toml"), "").unwrap();
        let (resolver, _) = resolver_for(&dir, 3);

        assert_eq!(
            resolver.available_alternatives("python"),
            vec!["requirements.txt", "pyproject.toml"]
        );
        assert!(resolver.available_alternatives("rust").is_empty());
    }
}
