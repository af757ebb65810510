//! Structured logging setup for binaries embedding this core.
//!
//! Kept deliberately small: an `EnvFilter` plus a `tracing-subscriber` fmt
//! layer, no OpenTelemetry export. Nothing in this workspace emits spans
//! that need a trace backend; a binary that does can layer its own
//! exporter on top of the same `Registry` this function builds.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install a global `tracing` subscriber. `RUST_LOG` (or `info` if unset)
/// selects the filter; `format` selects the fmt layer.
///
/// Panics if a global subscriber is already installed — call this once,
/// at process start.
pub fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE);
            Registry::default().with(env_filter).with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).with_ansi(true);
            Registry::default().with(env_filter).with(fmt_layer).init();
        }
    }
}
