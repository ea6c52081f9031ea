//! Project exploration: directory structure, file reading, and file resolution

pub mod manifest;
pub mod reader;
pub mod resolver;
pub mod structure;

use std::path::{Component, Path};

pub use reader::read_file;
pub use resolver::FileResolver;
pub use structure::{ProjectTree, TreeNode, build_structure, contains_entry};

/// Normalize a project-relative path to `/`-separated form.
///
/// Returns `None` for empty paths, absolute paths, and anything containing
/// `..`, so callers can never reach outside the project root.
pub fn sanitize_relative_path(path: &str) -> Option<String> {
    let path = path.trim().replace('\\', "/");
    let mut parts = Vec::new();
    for component in Path::new(&path).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_relative_path() {
        assert_eq!(sanitize_relative_path("src/main.rs").as_deref(), Some("src/main.rs"));
        assert_eq!(sanitize_relative_path("./a//b.txt").as_deref(), Some("a/b.txt"));
        assert_eq!(sanitize_relative_path("dir\\file.go").as_deref(), Some("dir/file.go"));
        assert_eq!(sanitize_relative_path("../etc/passwd"), None);
        assert_eq!(sanitize_relative_path("a/../../b"), None);
        assert_eq!(sanitize_relative_path("/etc/passwd"), None);
        assert_eq!(sanitize_relative_path("  "), None);
        assert_eq!(sanitize_relative_path("."), None);
    }
}
