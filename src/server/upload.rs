//! Multipart upload into a per-request temporary directory.

use axum::extract::Multipart;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::constants::server::UPLOAD_DIR_PREFIX;
use crate::explorer::sanitize_relative_path;
use crate::types::{AskError, Result, format_size};

/// A received request: the question plus the uploaded project.
///
/// The directory is removed when this value is dropped.
#[derive(Debug)]
pub struct Upload {
    pub question: String,
    pub dir: TempDir,
    pub files: usize,
}

fn upload_error(e: impl std::fmt::Display) -> AskError {
    AskError::Upload(e.to_string())
}

/// Read every multipart field. The `question` field is the question; every
/// field carrying a file name is written below the temp dir at that
/// (sanitized) relative path.
pub async fn receive(mut multipart: Multipart) -> Result<Upload> {
    let dir = tempfile::Builder::new()
        .prefix(UPLOAD_DIR_PREFIX)
        .tempdir()?;
    let mut question = String::new();
    let mut files = 0usize;

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let relative = sanitize_relative_path(&file_name)
                .ok_or_else(|| upload_error(format!("invalid file name '{}'", file_name)))?;
            let target = dir.path().join(&relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let bytes = field.bytes().await.map_err(upload_error)?;
            debug!("Saving '{}' ({})", relative, format_size(bytes.len() as u64));
            tokio::fs::write(&target, &bytes).await?;
            files += 1;
        } else if field.name() == Some("question") {
            question = field.text().await.map_err(upload_error)?.trim().to_string();
        }
    }

    if question.is_empty() {
        return Err(upload_error("missing question"));
    }
    if files == 0 {
        return Err(upload_error("no files uploaded"));
    }

    info!("Received {} files into {}", files, dir.path().display());
    Ok(Upload {
        question,
        dir,
        files,
    })
}
