//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Risk error: {0}")]
    Risk(#[from] quoter_risk::RiskError),

    #[error("Supervisor error: {0}")]
    Supervisor(#[from] quoter_supervisor::SupervisorError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] quoter_telemetry::TelemetryError),
}

pub type AppResult<T> = Result<T, AppError>;
