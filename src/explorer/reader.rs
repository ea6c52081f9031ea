//! File reading with binary detection and head/tail truncation

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::constants::explorer::{BINARY_SNIFF_BYTES, TRUNCATION_MARKER};
use crate::types::{AskError, Result};

/// Read a text file. Anything larger than `max_size` keeps its first
/// `max_size / 2` bytes and its last `max_size - max_size / 2` bytes.
pub fn read_file(path: &Path, max_size: usize) -> Result<String> {
    let shown = path.display().to_string();
    let metadata = fs::metadata(path).map_err(|_| AskError::not_found(&shown))?;

    if metadata.is_dir() {
        return Err(AskError::NotAFile { path: shown });
    }

    let mut head = Vec::with_capacity(BINARY_SNIFF_BYTES);
    File::open(path)?
        .take(BINARY_SNIFF_BYTES as u64)
        .read_to_end(&mut head)?;
    if head.contains(&0) {
        return Err(AskError::BinaryFile { path: shown });
    }

    let bytes = fs::read(path)?;
    if bytes.len() > max_size {
        warn!(
            "File '{}' ({} bytes) is too large, reading head and tail",
            shown,
            bytes.len()
        );
        let head_len = max_size / 2;
        let tail_len = max_size - head_len;
        let start = String::from_utf8_lossy(&bytes[..head_len]);
        let end = String::from_utf8_lossy(&bytes[bytes.len() - tail_len..]);
        return Ok(format!("{}{}{}", start, TRUNCATION_MARKER, end));
    }

    info!("Reading file '{}' ({} bytes)", shown, bytes.len());
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
