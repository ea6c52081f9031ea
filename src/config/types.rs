//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/codeask/) and project (.codeask/) level configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::{AskError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Exploration bounds
    pub analysis: AnalysisConfig,

    /// Directory walk filters
    pub explorer: ExplorerConfig,

    /// Dependency-ecosystem tag → manifest names or glob patterns
    pub manifests: ManifestConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `AskError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AskError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(AskError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if !crate::ai::provider::KNOWN_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AskError::Config(format!(
                "Unknown LLM provider '{}'. Valid values: {}",
                self.llm.provider,
                crate::ai::provider::KNOWN_PROVIDERS.join(", ")
            )));
        }

        let a = &self.analysis;
        for (name, value) in [
            ("max_exploration_iterations", a.max_exploration_iterations),
            ("max_prompt_length", a.max_prompt_length),
            ("max_file_retry_attempts", a.max_file_retry_attempts as usize),
        ] {
            if value == 0 {
                return Err(AskError::Config(format!(
                    "analysis.{} must be greater than 0",
                    name
                )));
            }
        }

        if a.max_file_read_size < 2 {
            return Err(AskError::Config(format!(
                "analysis.max_file_read_size must be at least 2, got {}",
                a.max_file_read_size
            )));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(AskError::Config(
                "server.max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Directory served for every non-API path
    pub static_dir: PathBuf,

    /// Request body limit for uploads
    pub max_upload_bytes: usize,

    /// Full restarts of a streaming analysis after a transient LLM failure
    pub stream_retries: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            static_dir: PathBuf::from("static"),
            max_upload_bytes: 32 * 1024 * 1024,
            stream_retries: 2,
        }
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

/// API keys are never serialized and are redacted in debug output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("ollama" or "openai")
    pub provider: String,

    /// Model name
    pub model: String,

    /// Base URL; each provider has its own default
    pub api_base: Option<String>,

    /// API key for OpenAI-compatible backends. Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for LLM generation
    pub temperature: f32,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3:latest".to_string(),
            api_base: None,
            api_key: None,
            timeout_secs: crate::constants::network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.2,
        }
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Planning rounds before synthesis is forced
    pub max_exploration_iterations: usize,

    /// Directory levels rendered into the structure
    pub max_directory_depth: usize,

    /// Bytes read from a single file before head/tail truncation
    pub max_file_read_size: usize,

    /// Characters sent to the model per prompt
    pub max_prompt_length: usize,

    /// Failed resolutions tolerated per requested path
    pub max_file_retry_attempts: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_exploration_iterations: 6,
            max_directory_depth: 5,
            max_file_read_size: 150_000,
            max_prompt_length: 7500,
            max_file_retry_attempts: 3,
        }
    }
}

// =============================================================================
// Explorer Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Directory names never descended into
    pub ignore_dirs: Vec<String>,

    /// Name prefixes skipped for files and directories
    pub ignore_prefixes: Vec<String>,

    /// Lowercase extensions (with dot) skipped for files
    pub ignore_extensions: Vec<String>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: owned(&[
                ".git",
                ".vscode",
                "node_modules",
                "__pycache__",
                "venv",
                ".venv",
                "target",
                "build",
                "dist",
                "vendor",
                ".idea",
                ".composer",
                "cache",
                "logs",
                "tmp",
                "temp",
            ]),
            ignore_prefixes: owned(&[".", "_"]),
            ignore_extensions: owned(&[
                ".log", ".tmp", ".bak", ".swp", ".map", ".lock", ".ds_store", ".pyc", ".pyo",
                ".class", ".o", ".so", ".dll", ".exe", ".jar", ".war", ".ear", ".zip", ".gz",
                ".tar", ".rar", ".7z", ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
                ".odt", ".ods", ".odp", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp",
                ".mp3", ".wav", ".ogg", ".mp4", ".mov", ".avi", ".webm",
            ]),
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl ExplorerConfig {
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d == name) || self.has_ignored_prefix(name)
    }

    pub fn has_ignored_prefix(&self, name: &str) -> bool {
        self.ignore_prefixes
            .iter()
            .any(|p| !p.is_empty() && name.starts_with(p.as_str()))
    }

    pub fn is_ignored_file(&self, name: &str) -> bool {
        if self.has_ignored_prefix(name) {
            return true;
        }
        match name.rfind('.') {
            Some(idx) if idx > 0 => {
                let ext = name[idx..].to_lowercase();
                self.ignore_extensions.iter().any(|e| *e == ext)
            }
            _ => false,
        }
    }
}

// =============================================================================
// Manifest Configuration
// =============================================================================

/// Ecosystem tag → manifest file names; entries may be glob patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestConfig(pub BTreeMap<String, Vec<String>>);

impl Default for ManifestConfig {
    fn default() -> Self {
        let table: &[(&str, &[&str])] = &[
            ("composer", &["composer.json", "composer.lock"]),
            ("npm", &["package.json", "package-lock.json", "yarn.lock"]),
            (
                "python",
                &["requirements.txt", "pyproject.toml", "setup.py", "Pipfile"],
            ),
            ("go", &["go.mod", "go.sum"]),
            ("rust", &["Cargo.toml", "Cargo.lock"]),
            ("java", &["pom.xml", "build.gradle", "build.gradle.kts"]),
            ("dotnet", &["*.csproj", "*.sln", "project.json"]),
            ("ruby", &["Gemfile", "Gemfile.lock", "*.gemspec"]),
        ];
        Self(
            table
                .iter()
                .map(|(tag, files)| {
                    (
                        tag.to_string(),
                        files.iter().map(|f| f.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }
}

impl ManifestConfig {
    pub fn get(&self, tag: &str) -> Option<&[String]> {
        self.0.get(tag).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,

    /// "compact" or "full"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    #[default]
    Full,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.analysis.max_exploration_iterations, 6);
        assert_eq!(config.analysis.max_directory_depth, 5);
        assert_eq!(config.analysis.max_file_read_size, 150_000);
        assert_eq!(config.analysis.max_prompt_length, 7500);
        assert_eq!(config.analysis.max_file_retry_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.max_exploration_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.max_file_read_size = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.provider = "carrier-pigeon".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_depth_is_allowed() {
        let mut config = Config::default();
        config.analysis.max_directory_depth = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explorer_filters() {
        let explorer = ExplorerConfig::default();
        assert!(explorer.is_ignored_dir("node_modules"));
        assert!(explorer.is_ignored_dir(".cache"));
        assert!(explorer.is_ignored_dir("_build"));
        assert!(!explorer.is_ignored_dir("src"));

        assert!(explorer.is_ignored_file("logo.PNG"));
        assert!(explorer.is_ignored_file(".env"));
        assert!(!explorer.is_ignored_file("main.go"));
        assert!(!explorer.is_ignored_file("Makefile"));
    }

    #[test]
    fn test_manifest_table() {
        let manifests = ManifestConfig::default();
        assert_eq!(
            manifests.get("go"),
            Some(&["go.mod".to_string(), "go.sum".to_string()][..])
        );
        assert_eq!(manifests.iter().count(), 8);
        assert!(manifests.get("cobol").is_none());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("sk-secret"));
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }
}
