//! Telemetry and Observability
//!
//! Sets up `tracing-subscriber` once the settings file has been read, so the
//! configured level applies from the first event. Debug builds print pretty
//! output, release builds emit JSON with the current span (which carries
//! the crew run id). Logs always go to stderr; stdout carries command
//! output only.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
fn default_filter(log_level: &str) -> String {
    format!("{},agrocrew_engine={}", log_level, log_level)
}

/// Initialize the tracing subscriber at `log_level`.
///
/// Priority: `RUST_LOG` env var > `log_level`. A second call is a no-op.
pub fn init_telemetry_with_level(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}
