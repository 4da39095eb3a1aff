//! Subscriber setup: `RUST_LOG` wins over the configured level, and output
//! goes to stderr so it never mixes with results printed on stdout.

use anyhow::{Context, Result};
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use reviewdesk::config::LogFormat;

pub fn init(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{}'", level))?;

    let json = format == LogFormat::Json;
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| {
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
        }));

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    // The library's config and credential code logs through `log`.
    LogTracer::init().context("failed to bridge log records into tracing")?;

    Ok(())
}
