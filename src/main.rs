use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codeask::cli::commands::{ask::AskOptions, serve::ServeOptions};
use codeask::config::{Config, ConfigLoader, LogFormat};

#[derive(Parser)]
#[command(name = "codeask")]
#[command(
    version,
    about = "Ask natural-language questions about a codebase, answered by an LLM"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, help = "Load configuration from this file only")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (upload + ask, JSON and streaming)
    Serve {
        #[arg(long, help = "Bind address (default from config)")]
        host: Option<String>,
        #[arg(long, short, help = "Port (default from config)")]
        port: Option<u16>,
        #[arg(long, help = "Directory served for non-API paths")]
        static_dir: Option<PathBuf>,
    },

    /// Ask a question about a local directory
    Ask {
        #[arg(help = "Project directory")]
        dir: PathBuf,
        #[arg(help = "Question to answer")]
        question: String,
        #[arg(long, help = "Do not print progress steps")]
        no_progress: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Print as JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mcodeask encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli, config: &Config) {
    let filter = if cli.verbose {
        "debug".to_string()
    } else if cli.quiet {
        "error".to_string()
    } else {
        config.logging.level.clone()
    };

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format {
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
        LogFormat::Full => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `config path`/`init` must work even when the current config is invalid
    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Path => return Ok(codeask::cli::commands::config::path()?),
            ConfigAction::Init { global, force } => {
                return Ok(codeask::cli::commands::config::init(*global, *force)?);
            }
            ConfigAction::Show { .. } => {}
        }
    }

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    init_logging(&cli, &config);

    match cli.command {
        Commands::Serve {
            host,
            port,
            static_dir,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(codeask::cli::commands::serve::run(
                config,
                ServeOptions {
                    host,
                    port,
                    static_dir,
                },
            ))?;
        }
        Commands::Ask {
            dir,
            question,
            no_progress,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(codeask::cli::commands::ask::run(
                config,
                AskOptions {
                    dir,
                    question,
                    quiet_progress: no_progress || cli.quiet,
                },
            ))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => codeask::cli::commands::config::show(json)?,
            ConfigAction::Path | ConfigAction::Init { .. } => {}
        },
    }

    Ok(())
}
