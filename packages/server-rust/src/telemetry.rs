//! Tracing subscriber setup.

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogFormat;

const DEFAULT_FILTER: &str = "notes_server=info,tower_http=info";

static INIT: Once = Once::new();

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Subsequent calls are no-ops.
pub fn init_tracing(format: LogFormat) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let registry = tracing_subscriber::registry().with(filter);
        let result = match format {
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
            LogFormat::Text => registry.with(fmt::layer()).try_init(),
        };
        // Another subscriber (e.g. from a test harness) already won.
        drop(result);
    });
}
