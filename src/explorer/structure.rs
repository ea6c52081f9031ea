//! Directory structure walk
//!
//! Produces the bounded-depth tree the model sees as "project structure".
//! Only the configured ignore lists apply; `.gitignore` and hidden-file rules
//! are switched off.

use ignore::{DirEntry, WalkBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::ExplorerConfig;
use crate::constants::explorer::{DEPTH_LIMIT_KEY, DIR_SUFFIX};
use crate::types::{Result, format_size};

/// Entry name → node. Directory keys carry a trailing `/`.
pub type ProjectTree = BTreeMap<String, TreeNode>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Size string, e.g. `"12 bytes"`
    File(String),
    Directory(ProjectTree),
    /// Depth limit reached below this point
    Placeholder(String),
    /// Subdirectory could not be listed
    Error(String),
}

/// Walk `root` up to `max_depth` levels, applying the explorer filters.
///
/// Only a failure to list `root` itself is returned as an error.
pub fn build_structure(
    root: &Path,
    max_depth: usize,
    filters: &ExplorerConfig,
) -> Result<ProjectTree> {
    fs::read_dir(root)?;

    let mut tree = ProjectTree::new();
    if max_depth == 0 {
        tree.insert(DEPTH_LIMIT_KEY.to_string(), depth_placeholder(max_depth));
        return Ok(tree);
    }

    let filters = filters.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .max_depth(Some(max_depth))
        .filter_entry(move |entry| entry.depth() == 0 || is_kept(entry, &filters))
        .build();

    for result in walker {
        match result {
            Ok(entry) if entry.depth() == 0 => {}
            Ok(entry) => insert_entry(&mut tree, root, &entry, max_depth),
            Err(e) => {
                let Some(path) = error_path(&e) else {
                    debug!("Skipping walk error: {}", e);
                    continue;
                };
                if path == root {
                    continue;
                }
                debug!("Cannot list {}: {}", path.display(), e);
                let reason = match e.io_error() {
                    Some(io) => io.to_string(),
                    None => e.to_string(),
                };
                if let Some((parents, name)) = split_relative(root, path)
                    && let Some(parent) = subtree_mut(&mut tree, &parents)
                {
                    parent.insert(
                        format!("{}{}", name, DIR_SUFFIX),
                        TreeNode::Error(format!("access error: {}", reason)),
                    );
                }
            }
        }
    }

    Ok(tree)
}

fn is_kept(entry: &DirEntry, filters: &ExplorerConfig) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_some_and(|t| t.is_dir()) {
        !filters.is_ignored_dir(&name)
    } else {
        !filters.is_ignored_dir(&name) && !filters.is_ignored_file(&name)
    }
}

fn depth_placeholder(max_depth: usize) -> TreeNode {
    TreeNode::Placeholder(format!("(depth limit {} reached)", max_depth))
}

fn insert_entry(tree: &mut ProjectTree, root: &Path, entry: &DirEntry, max_depth: usize) {
    let Some((parents, name)) = split_relative(root, entry.path()) else {
        return;
    };
    let Some(parent) = subtree_mut(tree, &parents) else {
        return;
    };

    if entry.file_type().is_some_and(|t| t.is_dir()) {
        let mut children = ProjectTree::new();
        if entry.depth() >= max_depth {
            children.insert(DEPTH_LIMIT_KEY.to_string(), depth_placeholder(max_depth));
        }
        parent.insert(format!("{}{}", name, DIR_SUFFIX), TreeNode::Directory(children));
    } else {
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        parent.insert(name, TreeNode::File(format_size(size)));
    }
}

/// Parent directory names and entry name of `path` relative to `root`.
fn split_relative(root: &Path, path: &Path) -> Option<(Vec<String>, String)> {
    let mut parts: Vec<String> = path
        .strip_prefix(root)
        .ok()?
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    let name = parts.pop()?;
    Some((parts, name))
}

fn subtree_mut<'a>(tree: &'a mut ProjectTree, parents: &[String]) -> Option<&'a mut ProjectTree> {
    let mut current = tree;
    for name in parents {
        match current.get_mut(&format!("{}{}", name, DIR_SUFFIX))? {
            TreeNode::Directory(sub) => current = sub,
            _ => return None,
        }
    }
    Some(current)
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Partial(errs) => errs.iter().find_map(error_path),
        _ => None,
    }
}

/// Whether any level of the tree holds an entry called `name`.
pub fn contains_entry(tree: &ProjectTree, name: &str) -> bool {
    tree.iter().any(|(key, node)| {
        key.trim_end_matches(DIR_SUFFIX) == name
            || matches!(node, TreeNode::Directory(sub) if contains_entry(sub, name))
    })
}
