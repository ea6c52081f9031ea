//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Context summary budgets
pub mod summary {
    /// Structure JSON is hard-cut at this many characters
    pub const MAX_STRUCTURE_CHARS: usize = 1800;

    /// Marker appended when the structure JSON was cut
    pub const STRUCTURE_TRUNCATED_MARKER: &str = "\n... (structure truncated)";

    /// Read files listed individually
    pub const MAX_LISTED_FILES: usize = 5;

    /// Single-line excerpt length per listed file
    pub const FILE_EXCERPT_CHARS: usize = 80;

    /// Most recent notes/history entries included
    pub const MAX_RECENT_ENTRIES: usize = 6;

    /// Per-entry cut for notes/history lines
    pub const ENTRY_CHARS: usize = 80;

    /// Warn when the summary comes within this many characters of the prompt limit
    pub const PROMPT_WARNING_MARGIN: usize = 500;
}

/// File exploration constants
pub mod explorer {
    /// Bytes sniffed for NUL when detecting binary content
    pub const BINARY_SNIFF_BYTES: usize = 1024;

    /// Inserted between head and tail of an oversized file
    pub const TRUNCATION_MARKER: &str = "\n\n[... content truncated (file too large) ...]\n\n";

    /// Key and value of the placeholder emitted at the depth limit
    pub const DEPTH_LIMIT_KEY: &str = "...";

    /// Suffix distinguishing directory keys from file keys
    pub const DIR_SUFFIX: &str = "/";

    /// README names tried at the project root, first hit wins
    pub const README_CANDIDATES: &[&str] = &["README.md", "README.txt", "README.rst", "README"];

    /// Characters of the README kept as the excerpt
    pub const README_EXCERPT_CHARS: usize = 500;

    /// Placeholder project type before classification succeeds
    pub const UNKNOWN_PROJECT_TYPE: &str = "Unknown";
}

/// HTTP server constants
pub mod server {
    /// Prefix for per-request upload directories
    pub const UPLOAD_DIR_PREFIX: &str = "codeask-upload-";

    /// Buffered progress events per streaming request
    pub const EVENT_CHANNEL_CAPACITY: usize = 64;

    /// SSE keep-alive interval (seconds)
    pub const KEEP_ALIVE_SECS: u64 = 15;

    /// First delay of the stream restart backoff (milliseconds)
    pub const RESTART_BASE_DELAY_MS: u64 = 500;

    /// Upper bound for the stream restart backoff (seconds)
    pub const RESTART_MAX_DELAY_SECS: u64 = 8;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// Timeout for provider health probes (seconds)
    pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;
}
