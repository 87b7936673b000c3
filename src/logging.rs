use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "ipscope.log";

/// Routes `tracing` output to a daily rolling file under `dir`.
///
/// The terminal belongs to the UI, so nothing is written to stdout/stderr.
/// `RUST_LOG` directives are honoured on top of the `info` default. Keep the
/// returned guard alive for as long as logs should be flushed.
pub fn initialize_logging(dir: impl AsRef<Path>) -> WorkerGuard {
    let dir = dir.as_ref();
    let _ = std::fs::create_dir_all(dir);

    let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!("Logging to {}", dir.join(LOG_FILE).display());
    guard
}
