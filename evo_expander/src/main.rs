//! # EVO Expander Loader Binary
//!
//! Instantiates I/O expanders (and optional indicator banks) from text
//! commands read on stdin, and tears every device down on exit.
//!
//! # Usage
//!
//! ```bash
//! # Simulation backend with default config
//! evo_expander
//!
//! # Explicit config, verbose logging
//! evo_expander --config config/expander.toml -v
//!
//! # Then type commands:
//! #   0 0x20 100 8          -> 8-channel expander at 0x20, gpio 100..107
//! #   0 0x21 200 16 0 1     -> 16-channel expander with indicators
//! #   ?                     -> usage
//! #   list                  -> live entries as JSON
//! ```

#![deny(warnings)]

use clap::Parser;
use evo_common::consts::DEFAULT_CONFIG_PATH;
use evo_common::config::LogLevel;
use evo_common::expander::config::{ConfigOrigin, LoaderConfig};
use evo_common::prelude::{ConfigError, DriverError};
use evo_expander::{ControlEndpoint, DriverRegistry, Loader, Registry};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// How often the control loop re-checks the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// EVO Expander - I/O expander loader with pluggable backends
#[derive(Parser, Debug)]
#[command(name = "evo_expander")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "I/O expander loader with pluggable backends")]
#[command(long_about = None)]
struct Args {
    /// Path to loader configuration file (expander.toml).
    /// A missing file at the default path falls back to built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend to use (overrides `loader.backend`)
    #[arg(short, long)]
    backend: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

/// Fatal startup errors.
#[derive(Debug, Error)]
enum StartupError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("backend: {0}")]
    Backend(#[from] DriverError),

    #[error("signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("stdin reader: {0}")]
    Io(#[from] std::io::Error),
}

fn main() {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let loaded = LoaderConfig::load_with_origin(&config_path, args.config.is_some());

    // The subscriber needs the configured level, so it comes up right after
    // the load attempt and before anything about that attempt is logged.
    let log_level = match &loaded {
        Ok((config, _)) => config.shared.log_level,
        Err(_) => LogLevel::default(),
    };
    setup_tracing(&args, log_level);

    let result = loaded
        .map_err(StartupError::from)
        .and_then(|(config, origin)| {
            if origin == ConfigOrigin::Defaults {
                warn!("No config at {:?}, using defaults", config_path);
            }
            run(&args, config)
        });

    if let Err(e) = result {
        error!("Expander loader failed: {}", e);
        eprintln!("evo_expander: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args, config: LoaderConfig) -> Result<(), StartupError> {
    info!(
        "EVO Expander v{} starting ({})...",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let backend_name = args
        .backend
        .clone()
        .unwrap_or_else(|| config.loader.backend.clone());
    let drivers = DriverRegistry::with_builtin();
    let backend = drivers.create_backend(&backend_name, &config)?;
    info!("Using backend '{}'", backend_name);

    let registry = Arc::new(Registry::new());
    let loader = Arc::new(
        Loader::new(backend, Arc::clone(&registry))
            .with_indicator_prefix(config.loader.indicator_prefix.clone()),
    );
    let endpoint = ControlEndpoint::new(Arc::clone(&loader));

    for line in &config.preload {
        match endpoint.execute(line) {
            Ok(id) => info!("Preloaded '{}' as {}", line, id),
            Err(e) => warn!("Preload '{}' failed: {}", line, e),
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let lines = spawn_stdin_reader()?;
    print!("{}", endpoint.show());

    while running.load(Ordering::SeqCst) {
        match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) => handle_line(&endpoint, &line),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("Control input closed");
                break;
            }
        }
    }

    let summary = loader.shutdown();
    info!(
        "EVO Expander shutdown complete ({} entries, {} failed releases)",
        summary.entries, summary.failures
    );
    Ok(())
}

/// Execute one control line and print its status.
fn handle_line(endpoint: &ControlEndpoint, line: &str) {
    match line.trim() {
        "" | "?" => print!("{}", endpoint.show()),
        "list" => match serde_json::to_string_pretty(&endpoint.loader().snapshot()) {
            Ok(json) => println!("{json}"),
            Err(e) => warn!("Failed to serialize entries: {}", e),
        },
        command => match endpoint.store(command) {
            Ok(written) => println!("ok {written}"),
            Err(errno) => println!("error {errno}"),
        },
    }
}

/// Forward stdin lines over a channel so the main loop can poll the
/// running flag.
fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>, std::io::Error> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("control-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(log_level)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
