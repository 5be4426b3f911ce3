//! Supervisor and loop error types.

use thiserror::Error;

use quoter_exchange::ExchangeError;
use quoter_mm::QuoteError;
use quoter_wallet::WalletError;

use crate::job::JobState;

/// Errors returned by the control surface.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid job id: {0}")]
    InvalidJobId(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {job_id} already {state}")]
    AlreadyStopped { job_id: String, state: JobState },

    #[error("Job {job_id} did not stop within {waited_ms}ms")]
    StopTimeout { job_id: String, waited_ms: u64 },

    #[error("No tokio runtime available: {0}")]
    Runtime(String),
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Failure of one loop iteration. Never escapes the loop.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Quote error: {0}")]
    Quote(#[from] QuoteError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
}

impl LoopError {
    /// Metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Exchange(ExchangeError::Timeout { .. }) => "timeout",
            Self::Exchange(_) => "exchange",
            Self::Quote(_) | Self::Wallet(_) => "internal",
        }
    }

    /// Venue trouble marks the job degraded; internal errors only record text.
    pub fn is_exchange(&self) -> bool {
        matches!(self, Self::Exchange(_))
    }
}
