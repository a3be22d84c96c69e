//! Structured logging setup.
//!
//! Unlike the gRPC service this workspace was adapted from, this server has
//! no OpenTelemetry exporters: `tracing` events only ever go to stdout via
//! `tracing_subscriber::fmt`, filtered by `RUST_LOG` (default `info`).

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_target(false),
        );

    registry.init();
}
