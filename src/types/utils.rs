//! Shared utility functions for text bounding and common operations.
//!
//! All truncation helpers respect UTF-8 character boundaries: model output and
//! uploaded files routinely contain multi-byte characters, and slicing a `str`
//! mid-character panics.

use std::fmt::Display;

// =============================================================================
// String Utilities
// =============================================================================

/// Prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate to `max_chars` characters, appending `...` when anything was cut.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    let cut = truncate_chars(s, max_chars);
    if cut.len() < s.len() {
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

/// Collapse text onto one line for prompt listings.
///
/// Backticks are removed so the excerpt cannot break the surrounding
/// markdown; newlines become spaces.
pub fn single_line_excerpt(s: &str, max_chars: usize) -> String {
    let flat: String = s
        .chars()
        .filter(|c| *c != '`')
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    truncate_chars(&flat, max_chars).to_string()
}

/// Filter an iterator of Results, logging errors at debug level before discarding.
///
/// Use this instead of `.filter_map(|r| r.ok())` when you want visibility into
/// what errors are being discarded.
pub fn log_filter_error<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!("{}: {}", context, e);
            None
        }
    }
}

/// Human-readable byte size used in the project tree.
pub fn format_size(bytes: u64) -> String {
    format!("{} bytes", bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("日本語です", 2), "日本");
        assert_eq!(truncate_chars("", 4), "");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("abcdef", 3), "abc...");
        assert_eq!(truncate_with_ellipsis("abc", 3), "abc");
    }

    #[test]
    fn test_single_line_excerpt() {
        let text = "fn main() {\n    println!(\"`hi`\");\n}";
        let excerpt = single_line_excerpt(text, 200);
        assert!(!excerpt.contains('\n'));
        assert!(!excerpt.contains('`'));
        assert!(excerpt.starts_with("fn main() {     println!"));

        assert_eq!(single_line_excerpt("a\nb\nc", 3), "a b");
    }

    #[test]
    fn test_log_filter_error() {
        let ok: Result<i32, String> = Ok(3);
        let err: Result<i32, String> = Err("boom".to_string());
        assert_eq!(log_filter_error(ok, "ctx"), Some(3));
        assert_eq!(log_filter_error(err, "ctx"), None);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(42), "42 bytes");
    }
}
