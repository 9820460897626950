//! Process-wide `tracing` setup.

use clap::ValueEnum;
use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is not set.
///
/// tide's built-in request log is silenced in favour of the server's own request logger.
const DEFAULT_FILTER: &str = "info,tide=warn";

/// How log lines are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines, for local development.
    #[default]
    Pretty,
    /// One JSON object per line, for log collectors.
    Json,
}

/// Install the default (pretty) subscriber.
pub fn init_logging() {
    init_logging_as(LogFormat::Pretty)
}

/// Install a subscriber writing lines in `format` to stderr.
///
/// Only the first call in a process has any effect.
pub fn init_logging_as(format: LogFormat) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let registry = tracing_subscriber::registry().with(filter);
        let res = match format {
            LogFormat::Pretty => registry
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
        };
        if let Err(err) = res {
            eprintln!("unable to install log subscriber: {err}");
        }
    });
}
