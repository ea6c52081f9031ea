//! Dependency-manifest matching
//!
//! The per-ecosystem table itself lives in [`ManifestConfig`]; this module
//! answers which table entries exist in a project root and which ecosystems a
//! requested name or a project type points at.

use glob::Pattern;
use std::fs;
use std::path::Path;

use crate::config::ManifestConfig;
use crate::types::log_filter_error;

/// Documentation and tooling files recorded as available when present.
pub const COMMON_FILES: &[&str] = &[
    "README.md",
    "README.txt",
    "README.rst",
    "LICENSE",
    "LICENSE.txt",
    "LICENSE.md",
    "CHANGELOG.md",
    "CHANGELOG.txt",
    "docker-compose.yml",
    "docker-compose.yaml",
    "Dockerfile",
    ".gitignore",
    ".env",
    ".env.example",
    "Makefile",
    "makefile",
];

/// Requested-name hints: a lowercase name containing the keyword points at the tag.
const NAME_HINTS: &[(&str, &str)] = &[
    ("composer", "composer"),
    ("package", "npm"),
    ("requirements", "python"),
    ("cargo", "rust"),
    ("gemfile", "ruby"),
    ("gradle", "java"),
];

/// Project-type words → tag.
const TYPE_HINTS: &[(&str, &str)] = &[
    ("go", "go"),
    ("golang", "go"),
    ("node", "npm"),
    ("nodejs", "npm"),
    ("react", "npm"),
    ("javascript", "npm"),
    ("typescript", "npm"),
    ("python", "python"),
    ("django", "python"),
    ("flask", "python"),
    ("rust", "rust"),
    ("java", "java"),
    ("kotlin", "java"),
    ("spring", "java"),
    ("ruby", "ruby"),
    ("rails", "ruby"),
    ("php", "composer"),
    ("laravel", "composer"),
    ("symfony", "composer"),
    ("dotnet", "dotnet"),
    ("c#", "dotnet"),
];

fn push_unique(tags: &mut Vec<&'static str>, tag: &'static str) {
    if !tags.contains(&tag) {
        tags.push(tag);
    }
}

/// Ecosystems suggested by the requested file name, e.g. `composer-info.php` → composer.
pub fn tags_for_name(requested: &str) -> Vec<&'static str> {
    let lower = requested.to_lowercase();
    let mut tags = Vec::new();
    for (keyword, tag) in NAME_HINTS {
        if lower.contains(keyword) {
            push_unique(&mut tags, tag);
        }
    }
    tags
}

/// Ecosystems suggested by the classified project type.
///
/// Matching is per word so "Go" does not fire on "Django" or "MongoDB".
pub fn tags_for_project_type(project_type: &str) -> Vec<&'static str> {
    let lower = project_type.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '#'))
        .filter(|w| !w.is_empty())
        .collect();

    let mut tags = Vec::new();
    for (word, tag) in TYPE_HINTS {
        if words.contains(word) {
            push_unique(&mut tags, tag);
        }
    }
    tags
}

fn is_pattern(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}

/// Names of root-level entries matching a manifest table entry.
///
/// Literal entries must be regular files; glob entries (`*.csproj`) are
/// matched against the root listing, sorted for stable output.
pub fn find_in_root(root: &Path, entry: &str) -> Vec<String> {
    if !is_pattern(entry) {
        return if root.join(entry).is_file() {
            vec![entry.to_string()]
        } else {
            Vec::new()
        };
    }

    let Some(pattern) = log_filter_error(Pattern::new(entry), "Invalid manifest pattern") else {
        return Vec::new();
    };
    let Some(listing) = log_filter_error(fs::read_dir(root), "Cannot list project root") else {
        return Vec::new();
    };

    let mut hits: Vec<String> = listing
        .filter_map(|e| log_filter_error(e, "Skipping unreadable entry"))
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| pattern.matches(name))
        .collect();
    hits.sort();
    hits
}

/// Every existing manifest for `tag`, in table order.
pub fn existing_for_tag(root: &Path, manifests: &ManifestConfig, tag: &str) -> Vec<String> {
    manifests
        .get(tag)
        .unwrap_or_default()
        .iter()
        .flat_map(|entry| find_in_root(root, entry))
        .collect()
}
