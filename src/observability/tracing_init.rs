use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Layer, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingConfig, ObservabilityConfig};

/// Directives appended to the base level when no filter is configured.
const QUIET_DEPENDENCIES: &str = "hyper=warn,h2=warn,tower=info,sqlx=warn,samael=warn";

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Failed to initialize tracing: {0}")]
    Init(String),
}

/// Install the global `tracing` subscriber. Errors if one is already set.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), TracingError> {
    let logging = &config.logging;
    tracing_subscriber::registry()
        .with(build_env_filter(logging))
        .with(fmt_layer(logging))
        .try_init()
        .map_err(|e| TracingError::Init(e.to_string()))
}

fn fmt_layer<S>(logging: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let base = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(logging.file_line)
        .with_line_number(logging.file_line);

    match (logging.format, logging.timestamps) {
        (LogFormat::Pretty, true) => base.pretty().boxed(),
        (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
        (LogFormat::Compact, true) => base.compact().boxed(),
        (LogFormat::Compact, false) => base.compact().without_time().boxed(),
        (LogFormat::Json, true) => base.json().with_current_span(true).boxed(),
        (LogFormat::Json, false) => base.json().with_current_span(true).without_time().boxed(),
    }
}

/// A non-empty `RUST_LOG` replaces the configuration entirely.
fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    let level = config.level.as_directive();
    let directives = std::env::var("RUST_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| match &config.filter {
            Some(extra) => format!("{level},{extra}"),
            None => format!("{level},{QUIET_DEPENDENCIES}"),
        });

    EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter '{directives}': {e}");
        EnvFilter::new(level)
    })
}
