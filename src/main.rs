//! mcp-tool-server: schema-validated tool invocation over stdio.
//!
//! Loads a tool catalog, registers the handlers it can serve and answers
//! `list_tools` / `call_tool` requests as line-delimited JSON on stdin/stdout.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use mcp_tool_server::config::{self, ServerConfig};
use mcp_tool_server::error::{ConfigError, SchemaLoadError};
use mcp_tool_server::mcp::{Dispatcher, HandlerRegistry, McpServer};
use mcp_tool_server::schema::Catalog;
use mcp_tool_server::tools;

/// Schema-validated tool invocation server.
///
/// Reads requests from stdin and writes responses to stdout, one JSON
/// object per line. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "mcp-tool-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the tool catalog (defaults to the bundled demo catalog)
    #[arg(value_name = "CATALOG")]
    catalog: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Per-call handler timeout in milliseconds (overrides the config file)
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
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
            _ => Level::WARN,
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

/// Resolves the per-call timeout, letting `--timeout-ms` override the file.
fn resolve_call_timeout(
    cli_timeout_ms: Option<u64>,
    server: &ServerConfig,
) -> Result<Duration, ConfigError> {
    let Some(call_timeout_ms) = cli_timeout_ms else {
        return Ok(server.call_timeout());
    };
    let overridden = ServerConfig { call_timeout_ms };
    overridden.validate()?;
    Ok(overridden.call_timeout())
}

/// Loads the catalog from `path`, or the bundled one when no path is given.
fn load_catalog(path: Option<&Path>) -> Result<Catalog, SchemaLoadError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading tool catalog");
            Catalog::load(path)
        }
        None => {
            info!("No catalog given, using the bundled demo catalog");
            Catalog::from_json(tools::BUILTIN_CATALOG)
        }
    }
}

/// Entry point for the mcp-tool-server.
fn main() -> ExitCode {
    let args = Args::parse();

    let cfg = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting mcp-tool-server"
    );

    let call_timeout = match resolve_call_timeout(args.timeout_ms, &cfg.server) {
        Ok(timeout) => timeout,
        Err(e) => {
            error!(error = %e, "Invalid --timeout-ms");
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let catalog_path = args.catalog.or(cfg.catalog_path);
    let catalog = match load_catalog(catalog_path.as_deref()) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, "Refusing to start: tool catalog is invalid");
            eprintln!("Catalog error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut handlers = HandlerRegistry::new();
    let registered = tools::register_builtin(&mut handlers, &catalog)
        .and_then(|count| handlers.check_against(&catalog).map(|()| count));
    let registered = match registered {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, "Refusing to start: handler registry is invalid");
            return ExitCode::FAILURE;
        }
    };

    info!(
        server = catalog.name(),
        tools = catalog.len(),
        handlers = registered,
        timeout_ms = u64::try_from(call_timeout.as_millis()).unwrap_or(u64::MAX),
        "Catalog ready, waiting for requests..."
    );

    let mut server = McpServer::new(Dispatcher::new(catalog, handlers, call_timeout));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!(handled = server.handled(), "Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
