//! Serve Command
//!
//! Usage:
//!   codeask serve [--host HOST] [--port PORT] [--static-dir DIR]

use std::path::PathBuf;

use crate::ai::create_provider;
use crate::cli::Output;
use crate::config::Config;
use crate::server::{AppState, serve};
use crate::types::Result;

#[derive(Debug, Default)]
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<PathBuf>,
}

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_overrides(mut config: Config, options: ServeOptions) -> Config {
    if let Some(host) = options.host {
        config.server.host = host;
    }
    if let Some(port) = options.port {
        config.server.port = port;
    }
    if let Some(static_dir) = options.static_dir {
        config.server.static_dir = static_dir;
    }
    config
}

pub async fn run(config: Config, options: ServeOptions) -> Result<()> {
    let config = apply_overrides(config, options);
    let provider = create_provider(&config.llm)?;
    let output = Output::new();

    if !provider.health_check().await.unwrap_or(false) {
        output.warning(&format!(
            "LLM backend '{}' is not reachable; requests will fail until it is up",
            provider.name()
        ));
    }

    output.info(&format!(
        "Serving on http://{}:{}",
        config.server.host, config.server.port
    ));
    serve(AppState::new(config, provider)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides() {
        let config = apply_overrides(
            Config::default(),
            ServeOptions {
                host: Some("0.0.0.0".to_string()),
                port: Some(9000),
                static_dir: None,
            },
        );
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.static_dir, PathBuf::from("static"));

        let config = apply_overrides(Config::default(), ServeOptions::default());
        assert_eq!(config.server.port, 8080);
    }
}
