//!
//! src/logging.rs  Oct 16th, 2026
//!
//! Initializes logger so that the resolver gives informative,
//! structured output while serving
//!
//!

use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};
use tracing_error::ErrorLayer;
use tracing_appender::non_blocking;

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::ResolverError;

/// Keeps the non-blocking writer flushing; hold for the life of main
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard
}

pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard, ResolverError> {

    let (writer, guard) = non_blocking(std::io::stdout());
    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(cfg.filter_directives.clone()));

    let time = fmt::time::UtcTime::rfc_3339();
    let base = fmt::layer()
        .with_writer(writer)
        .with_timer(time)
        .with_target(cfg.include_target)
        .with_file(cfg.include_file_line)
        .with_line_number(cfg.include_file_line);

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match cfg.format {
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Pretty => base
            .pretty()
            .with_ansi(cfg.with_ansi)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| ResolverError::Config(format!("logger init: {e}")))?;

    Ok( LoggingGuard { _guard: guard } )
}
