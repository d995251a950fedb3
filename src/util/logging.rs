use std::path::Path;

use anyhow::Result;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the logging system with tracing.
///
/// `RUST_LOG` takes precedence when set; otherwise `verbose` picks between
/// debug- and info-level output for this crate. With `log_dir` set, a daily
/// rolling file sink runs alongside the console layer.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Result<()> {
    let default_filter = if verbose {
        "beatdrop=debug,warn"
    } else {
        "beatdrop=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true));

    match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "beatdrop.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            // Keep the flush guard alive for the process lifetime; logging
            // is initialized once.
            std::mem::forget(guard);
            registry
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
        }
        None => registry.init(),
    }

    Ok(())
}
