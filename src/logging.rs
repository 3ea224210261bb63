//! Structured logging setup and span helpers.

use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::model::LocalKey;

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable multi-line events.
    #[default]
    Pretty,
}

/// Installs the global subscriber, writing to stderr.
///
/// `RUST_LOG` controls levels; without it only warnings and errors are shown
/// so stdout stays clean for rendered task lists. Later calls are no-ops.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let registry = tracing_subscriber::registry().with(env_filter);

        // A subscriber installed by an embedding application takes precedence.
        let _ = match format {
            LogFormat::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init(),
            LogFormat::Pretty => {
                registry.with(fmt::layer().pretty().with_writer(std::io::stderr)).try_init()
            }
        };
    });
}

/// Span wrapped around one create or delete intent.
#[must_use]
pub fn intent_span(operation: &str, key: &LocalKey) -> Span {
    tracing::info_span!("intent", op = operation, key = %key)
}
