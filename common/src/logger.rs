use std::path::Path;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global `tracing` subscriber.
///
/// Events go to a daily-rolling file `{log_dir}/{log_file}` through a
/// non-blocking writer, and additionally to stdout when `log_to_stdout` is set.
/// `log_level` is an `EnvFilter` directive such as `info` or `marker=debug`;
/// an unparsable directive falls back to `info`.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init_logging(
    log_dir: &Path,
    log_file: &str,
    log_level: &str,
    log_to_stdout: bool,
) -> WorkerGuard {
    std::fs::create_dir_all(log_dir).ok();

    let file_appender = rolling::daily(log_dir, log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = log_to_stdout.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(true)
    });

    let registry = tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(file_layer)
        .with(stdout_layer);

    if let Err(e) = registry.try_init() {
        eprintln!("logging already initialised: {e}");
    }

    guard
}

fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}
