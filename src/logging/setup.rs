// SPDX-License-Identifier: GPL-3.0-only
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file written inside the configured log directory
pub const LOG_FILE_NAME: &str = "steam_downloader.log";

/// Size at which the log file is rolled over
pub const LOG_MAX_BYTES: usize = 10_000_000;

/// Rolled-over files kept as `steam_downloader.log.1` .. `.5`
pub const LOG_BACKUPS: usize = 5;

/// Log file that rolls over once it reaches `max_bytes`, keeping `backups`
/// older files next to it
pub fn rotating_writer(path: &Path, max_bytes: usize, backups: usize) -> FileRotate<AppendCount> {
    FileRotate::new(
        path,
        AppendCount::new(backups),
        ContentLimit::Bytes(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    )
}

/// Initialize tracing subscriber with configuration
///
/// `RUST_LOG` wins over `log_level`. When `log_dir` is given, records are
/// also written (without ANSI colors) to [`LOG_FILE_NAME`] inside it,
/// rotated at [`LOG_MAX_BYTES`].
pub fn setup_logging(log_level: &str, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = log_dir.map(|dir| {
        let writer = rotating_writer(&dir.join(LOG_FILE_NAME), LOG_MAX_BYTES, LOG_BACKUPS);
        fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(Mutex::new(writer))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
        )
        .with(file_layer)
        .try_init()?;

    Ok(())
}
