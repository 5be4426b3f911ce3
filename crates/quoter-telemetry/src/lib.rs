//! Prometheus metrics and structured logging for quoter.
//!
//! - Prometheus counters/gauges for order flow, loop health, and quoting
//! - Structured logging with tracing (JSON in production, pretty otherwise)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, init_logging_with, LogFormat};
pub use metrics::Metrics;
