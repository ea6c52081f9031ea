//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/codeask/config.toml)
//! 3. Project config (.codeask/config.toml)
//! 4. Environment variables (CODEASK_* prefix, `__` separates sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{AskError, Result};

const ENV_PREFIX: &str = "CODEASK_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_layers(
            Self::global_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    fn load_layers(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // e.g. CODEASK_ANALYSIS__MAX_PROMPT_LENGTH -> analysis.max_prompt_length
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| AskError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| AskError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/codeask/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("codeask"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project config directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".codeask")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;
        println!("{}", Self::render(&config, as_json)?);
        Ok(())
    }

    fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| AskError::Config(e.to_string()))
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a default config file, globally or for the current project.
    /// Existing files are kept unless `force` is set.
    pub fn init(global: bool, force: bool) -> Result<PathBuf> {
        let path = if global {
            Self::global_config_path().ok_or_else(|| {
                AskError::Config("Cannot determine global config directory".to_string())
            })?
        } else {
            Self::project_config_path()
        };
        Self::write_default(&path, force)?;
        Ok(path)
    }

    fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, Self::default_config_content())?;
        info!("Created config: {}", path.display());
        Ok(())
    }

    /// Generate default config content (TOML)
    fn default_config_content() -> String {
        r#"# codeask configuration
# Project settings in .codeask/config.toml override ~/.config/codeask/config.toml.
# Environment variables override both, e.g. CODEASK_LLM__MODEL=qwen2.5-coder.

[server]
host = "127.0.0.1"
port = 8080
static_dir = "static"

[llm]
provider = "ollama"          # "ollama" or "openai"
model = "llama3:latest"
# api_base = "http://127.0.0.1:11434"
timeout_secs = 300
temperature = 0.2

[analysis]
max_exploration_iterations = 6
max_directory_depth = 5
max_file_read_size = 150000
max_prompt_length = 7500
max_file_retry_attempts = 3

[logging]
level = "info"
format = "full"              # "full" or "compact"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let config =
            ConfigLoader::load_layers(None, &temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.analysis.max_file_retry_attempts, 3);
    }

    #[test]
    fn test_project_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let project = temp_dir.path().join("project.toml");
        fs::write(&global, "[analysis]\nmax_directory_depth = 2\nmax_prompt_length = 4000\n")
            .unwrap();
        fs::write(&project, "[analysis]\nmax_directory_depth = 3\n").unwrap();

        let config = ConfigLoader::load_layers(Some(&global), &project).unwrap();
        assert_eq!(config.analysis.max_directory_depth, 3);
        assert_eq!(config.analysis.max_prompt_length, 4000);
        assert_eq!(config.analysis.max_exploration_iterations, 6);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[llm]\ntemperature = 9.5\n").unwrap();
        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(AskError::Config(_))
        ));
    }

    #[test]
    fn test_default_content_parses() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        ConfigLoader::write_default(&path, false).unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.model, "llama3:latest");
    }

    #[test]
    fn test_write_default_keeps_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[server]\nport = 9000\n").unwrap();

        ConfigLoader::write_default(&path, false).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("9000"));

        ConfigLoader::write_default(&path, true).unwrap();
        assert!(!fs::read_to_string(&path).unwrap().contains("9000"));
    }

    #[test]
    fn test_env_override() {
        // SAFETY: no other test reads this key
        unsafe {
            std::env::set_var("CODEASK_SERVER__STATIC_DIR", "public");
        }
        let temp_dir = TempDir::new().unwrap();
        let config =
            ConfigLoader::load_layers(None, &temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.server.static_dir, PathBuf::from("public"));
        unsafe {
            std::env::remove_var("CODEASK_SERVER__STATIC_DIR");
        }
    }

    #[test]
    fn test_render_formats() {
        let config = Config::default();
        let json = ConfigLoader::render(&config, true).unwrap();
        assert!(json.contains("\"max_prompt_length\": 7500"));
        let toml = ConfigLoader::render(&config, false).unwrap();
        assert!(toml.contains("[analysis]"));
    }
}
