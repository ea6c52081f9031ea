pub mod error;
pub mod utils;

pub use error::{AskError, LlmError, LlmErrorKind, Result};
pub use utils::{
    format_size, log_filter_error, single_line_excerpt, truncate_chars, truncate_with_ellipsis,
};
