//! Tracing setup for the `tbinit` binary.
//!
//! Console logs go to stderr so they never interleave with the operator-facing
//! report on stdout. Key material and decrypted credentials are never passed to
//! any `tracing` macro.

use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Install the global subscriber. Safe to call more than once; later calls are ignored.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,tbinit={}", config.level)));

    let console_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    let file_layer = config.dir.as_deref().and_then(rolling_file_layer);
    let file_logging_dir = file_layer.as_ref().and(config.dir.as_ref());

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        if let Some(dir) = file_logging_dir {
            eprintln!("Logging to: {}/tbinit.log", dir.display());
        }
    }
}

fn rolling_file_layer<S>(log_dir: &Path) -> Option<Box<dyn Layer<S> + Send + Sync>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    // `tracing_appender::rolling::daily` panics if it can't create the initial
    // log file, so preflight writability.
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!(
            "Warning: Could not create log directory {} ({}), file logging disabled",
            log_dir.display(),
            e
        );
        return None;
    }

    let test_path = log_dir.join(".tbinit_write_test");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&test_path)
    {
        Ok(_) => {
            let _ = std::fs::remove_file(&test_path);

            let file_appender = tracing_appender::rolling::daily(log_dir, "tbinit.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // The process is short-lived; keep the flush guard for its whole lifetime.
            Box::leak(Box::new(guard));

            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true)
                    .boxed(),
            )
        }
        Err(e) => {
            eprintln!(
                "Warning: Could not write to log directory {} ({}), file logging disabled",
                log_dir.display(),
                e
            );
            None
        }
    }
}
