//! showcase-mcp: read-only MCP server for community project showcase data
//!
//! This tool serves project and profile data to AI assistants over the
//! Model Context Protocol, using JSON-RPC 2.0 over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use showcase_mcp::config::{self, Config, StoreBackend, StoreConfig};
use showcase_mcp::error::ServerError;
use showcase_mcp::mcp::{transport, McpServer};
use showcase_mcp::store::{InMemoryStore, PostgrestStore, ShowcaseStore, StoreError};

/// Read-only MCP server for community project showcase data.
///
/// Exposes projects and profiles as MCP tools and resources over HTTP,
/// backed by a PostgREST data API or a local JSON snapshot.
#[derive(Parser, Debug)]
#[command(name = "showcase-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides server.bind)
    #[arg(long, value_name = "HOST:PORT")]
    bind: Option<String>,

    /// Base URL of the PostgREST data API (overrides store.url)
    #[arg(long, env = "SHOWCASE_STORE_URL", value_name = "URL")]
    store_url: Option<String>,

    /// Anonymous API key for the data API (overrides store.api_key)
    #[arg(long, env = "SHOWCASE_STORE_KEY", value_name = "KEY", hide_env_values = true)]
    store_key: Option<String>,

    /// Serve a JSON snapshot instead of the data API
    #[arg(long, value_name = "SNAPSHOT")]
    fixture: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Applies command-line overrides on top of the loaded configuration.
    fn apply_to(&self, cfg: &mut Config) {
        if let Some(bind) = &self.bind {
            cfg.server.bind.clone_from(bind);
        }
        if let Some(url) = &self.store_url {
            cfg.store.url = Some(url.clone());
        }
        if let Some(key) = &self.store_key {
            cfg.store.api_key = Some(key.clone());
        }
        if let Some(path) = &self.fixture {
            cfg.store.backend = StoreBackend::Fixture;
            cfg.store.fixture_path = Some(path.clone());
        }
    }
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the configured data store.
fn open_store(cfg: &StoreConfig) -> Result<Arc<dyn ShowcaseStore>, StoreError> {
    match cfg.backend {
        StoreBackend::Postgrest => {
            let (Some(url), Some(key)) = (cfg.url.as_deref(), cfg.api_key.as_deref()) else {
                return Err(StoreError::Unavailable(
                    "data API url and key are not configured".to_string(),
                ));
            };
            info!(url, "Using PostgREST store");
            let store = PostgrestStore::new(url, key, Duration::from_secs(cfg.timeout_secs))?;
            Ok(Arc::new(store))
        }
        StoreBackend::Fixture => {
            let Some(path) = cfg.fixture_path.as_deref() else {
                return Err(StoreError::Unavailable(
                    "snapshot path is not configured".to_string(),
                ));
            };
            let store = InMemoryStore::from_snapshot(path)?;
            info!(
                path = %path.display(),
                projects = store.project_count(),
                profiles = store.profile_count(),
                "Using snapshot store"
            );
            Ok(Arc::new(store))
        }
    }
}

/// Binds the endpoint and serves until shutdown.
async fn run(addr: SocketAddr, server: Arc<McpServer>) -> Result<(), ServerError> {
    let listener = transport::bind(addr).await?;
    transport::serve(listener, server).await
}

/// Entry point for the showcase-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    args.apply_to(&mut cfg);

    if let Err(e) = cfg.validate() {
        eprintln!("Configuration error: {e}");
        if config_path.is_none() {
            if let Some(default_path) = config::default_config_path() {
                eprintln!("\nExpected config at: {}", default_path.display());
                eprintln!("Create one based on config/example-config.json");
            }
        }
        return ExitCode::FAILURE;
    }

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "showcase-mcp {}  Copyright (C) 2026  The Showcase Community",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting showcase-mcp server"
    );

    let addr = match cfg.server.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "Invalid bind address");
            return ExitCode::FAILURE;
        }
    };

    let store = match open_store(&cfg.store) {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Failed to open data store");
            return ExitCode::FAILURE;
        }
    };

    let server = Arc::new(McpServer::new(store));

    // Run the server
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(addr, server));

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn log_level_from_flags() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(2, false, "warn"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "info"), Level::INFO);
        assert_eq!(get_log_level(0, false, "loud"), Level::WARN);
    }

    #[test]
    fn fixture_flag_switches_backend() {
        let args = Args::parse_from([
            "showcase-mcp",
            "--fixture",
            "snapshot.json",
            "--bind",
            "127.0.0.1:9000",
        ]);
        let mut cfg = Config::default();
        args.apply_to(&mut cfg);

        assert_eq!(cfg.store.backend, StoreBackend::Fixture);
        assert_eq!(cfg.store.fixture_path, Some(PathBuf::from("snapshot.json")));
        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert!(cfg.validate().is_ok());
    }
}
