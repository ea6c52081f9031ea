//! Config Command
//!
//! Usage:
//!   codeask config show [--json]
//!   codeask config path
//!   codeask config init [-g] [--force]

use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Print the merged effective configuration
pub fn show(json: bool) -> Result<()> {
    ConfigLoader::show_config(json)
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a default config file (project unless `global`)
pub fn init(global: bool, force: bool) -> Result<()> {
    let path = ConfigLoader::init(global, force)?;
    let output = Output::new();
    let scope = if global { "global" } else { "project" };
    output.success(&format!("Initialized {} configuration", scope));
    output.field("Config:", path.display());
    if !force {
        output.info("Existing files are left untouched; pass --force to overwrite.");
    }
    Ok(())
}
