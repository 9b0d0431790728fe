//! Logging setup: console plus a daily-rotated file for `start`,
//! console only for the one-shot subcommands.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Protocol crates are chatty at info; keep them at warn unless `RUST_LOG` says otherwise.
const QUIET_CRATES: &[&str] = &[
    "whatsapp_rust",
    "wacore",
    "wacore_binary",
    "whatsapp_rust_tokio_transport",
    "whatsapp_rust_sqlite_storage",
];

/// Keeps the file writer flushing; hold it until the process exits.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

pub(crate) fn default_directives(level: &str) -> String {
    let mut directives = level.to_string();
    for krate in QUIET_CRATES {
        directives.push_str(&format!(",{krate}=warn"));
    }
    directives
}

/// Console plus `{log_dir}/wabot.log.YYYY-MM-DD`.
pub fn init_service(log_dir: &Path, level: &str) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        anyhow::anyhow!("failed to create logs directory {}: {e}", log_dir.display())
    })?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "wabot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(LoggingGuard { _guard: guard })
}

pub fn init_cli(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .init();
}
