//! Subscriber setup for the service binary.
//!
//! Pipeline events (`sonar_context_engine`) are rendered with source
//! location and span timings so a slow request shows which stage spent the
//! time; everything else (HTTP layer, startup) stays on one short line.

use std::io::{self, IsTerminal};

use tracing_subscriber::filter::{FilterFn, Targets};
use tracing_subscriber::fmt::format::{FmtSpan, Writer};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const ENGINE_TARGET: &str = "sonar_context_engine";

/// Used when `RUST_LOG` is unset or unparsable.
const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Millisecond UTC timestamps, e.g. `2025-09-12T10:20:30.123Z`.
struct UtcMillis;

impl FormatTime for UtcMillis {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"))
    }
}

/// Installs the global subscriber.
pub fn init() -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let ansi = io::stdout().is_terminal();

    let pipeline = fmt::layer()
        .with_timer(UtcMillis)
        .with_ansi(ansi)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .compact()
        .with_filter(Targets::new().with_target(ENGINE_TARGET, tracing::Level::TRACE));

    let service = fmt::layer()
        .with_timer(UtcMillis)
        .with_ansi(ansi)
        .with_target(false)
        .with_filter(FilterFn::new(|meta| {
            !meta.target().starts_with(ENGINE_TARGET)
        }));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pipeline)
        .with(service)
        .try_init()
}
