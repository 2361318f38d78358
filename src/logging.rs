//! Tracing configuration and log routing.
//!
//! The server logs to stdout and to a file (`DOCSUM_LOG_FILE`, or `logs/docsum.log` when unset)
//! through a non-blocking writer. The CLI logs to stderr only so stdout carries program output.
//! Both respect `RUST_LOG` and fall back to their own default directive.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

const SERVER_FILTER: &str = "info,tower_http=info";
const CLI_FILTER: &str = "warn";
const LOG_FILE_ENV: &str = "DOCSUM_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "docsum.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Where a subscriber writes human-readable output.
enum Sink {
    Stdout,
    Stderr,
}

/// Install the server subscriber: stdout plus the log file when it can be opened.
pub fn init_tracing() {
    let mut layers = vec![console_layer(Sink::Stdout)];
    match open_log_file(log_file_path()) {
        Ok(writer) => layers.push(file_layer(writer)),
        Err(message) => eprintln!("{message}; logging to stdout only"),
    }
    install(SERVER_FILTER, layers);
}

/// Install a stderr-only subscriber for command-line use.
pub fn init_cli_tracing() {
    install(CLI_FILTER, vec![console_layer(Sink::Stderr)]);
}

fn install(default_filter: &str, layers: Vec<BoxedLayer>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
}

fn console_layer(sink: Sink) -> BoxedLayer {
    let layer = fmt::layer().with_target(false).compact();
    match sink {
        Sink::Stdout => layer.boxed(),
        Sink::Stderr => layer.with_writer(std::io::stderr).boxed(),
    }
}

fn file_layer(writer: NonBlocking) -> BoxedLayer {
    fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .compact()
        .boxed()
}

fn log_file_path() -> PathBuf {
    std::env::var_os(LOG_FILE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE))
}

/// Open `path` for appending behind a non-blocking writer whose guard lives for the process.
fn open_log_file(path: PathBuf) -> Result<NonBlocking, String> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|err| format!("Failed to create log directory {}: {err}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| format!("Failed to open log file {}: {err}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let _ = LOG_GUARD.set(guard);
    Ok(writer)
}
