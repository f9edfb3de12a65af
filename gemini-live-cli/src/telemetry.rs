//! Logging setup.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Install the global tracing subscriber. Later calls do nothing.
///
/// The filter comes from `RUST_LOG` and falls back to `default_level`. Logs go
/// to stderr so they do not interleave with model output on stdout.
pub fn init_telemetry(service_name: &str, default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .try_init();

        if installed.is_ok() {
            tracing::info!(service.name = service_name, "Telemetry initialized");
        }
    });
}
