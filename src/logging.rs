//! Tracing subscriber setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the caller so embedding applications can route events themselves.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingSettings};

/// Build the filter from `RUST_LOG` when set, else from the settings.
pub fn build_filter(settings: &LoggingSettings) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directive = settings
        .filter
        .clone()
        .unwrap_or_else(|| format!("reshelf={}", settings.level.as_str()));
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()))
}

/// Install the global subscriber. Returns an error when one is already set.
pub fn init_logging(
    settings: &LoggingSettings,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = build_filter(settings);
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays reserved for the plan listing.
    match settings.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
}
