//! Structured logging initialization.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{TelemetryError, TelemetryResult};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,quoter=debug";

/// Output encoding of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with span context.
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

impl LogFormat {
    /// `RUST_ENV=production` selects JSON; anything else is pretty.
    pub fn for_environment(rust_env: Option<&str>) -> Self {
        match rust_env {
            Some(env) if env.eq_ignore_ascii_case("production") => Self::Json,
            _ => Self::Pretty,
        }
    }

    pub fn from_env() -> Self {
        Self::for_environment(std::env::var("RUST_ENV").ok().as_deref())
    }
}

/// Install the global subscriber, format and filter taken from the environment.
pub fn init_logging() -> TelemetryResult<()> {
    init_logging_with(LogFormat::from_env())
}

/// Install the global subscriber with an explicit format.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with(format: LogFormat) -> TelemetryResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(true).with_thread_names(true))
            .try_init(),
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selection() {
        assert_eq!(LogFormat::for_environment(Some("production")), LogFormat::Json);
        assert_eq!(LogFormat::for_environment(Some("PRODUCTION")), LogFormat::Json);
        assert_eq!(LogFormat::for_environment(Some("staging")), LogFormat::Pretty);
        assert_eq!(LogFormat::for_environment(None), LogFormat::Pretty);
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_logging_with(LogFormat::Pretty);
        assert!(matches!(
            init_logging_with(LogFormat::Json),
            Err(TelemetryError::LoggingInit(_))
        ));
    }
}
