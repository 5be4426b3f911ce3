//! Market making configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{QuoteError, QuoteResult};
use crate::volatility::MID_WINDOW_CAPACITY;

/// Market making configuration shared by every job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MakerConfig {
    /// Order book levels requested per side.
    #[serde(default = "default_depth")]
    pub depth: usize,

    /// Quantity quoted on each side, in base units.
    #[serde(default = "default_base_order_size")]
    pub base_order_size: Decimal,

    /// Price increment. Bids round down, asks round up. Unset = no rounding.
    #[serde(default)]
    pub tick_size: Option<Decimal>,

    /// Mid prices retained for volatility.
    #[serde(default = "default_volatility_window")]
    pub volatility_window: usize,

    /// Sleep between iterations.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Sleep after a failed iteration.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,

    /// Deadline for every venue call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Resync wallet and prune open orders every N iterations (0 = only at start).
    #[serde(default = "default_balance_sync_every")]
    pub balance_sync_every: u64,

    /// How long `stop_job` waits for the loop to exit.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    /// Cancel tracked orders on the way out of a stopped loop.
    #[serde(default)]
    pub cancel_on_stop: bool,

    /// Fail the job after this many consecutive errors. Unset = retry forever.
    #[serde(default)]
    pub max_consecutive_errors: Option<u32>,
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            base_order_size: default_base_order_size(),
            tick_size: None,
            volatility_window: default_volatility_window(),
            poll_interval_ms: default_poll_interval_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            balance_sync_every: default_balance_sync_every(),
            stop_grace_ms: default_stop_grace_ms(),
            cancel_on_stop: false,
            max_consecutive_errors: None,
        }
    }
}

impl MakerConfig {
    pub fn validate(&self) -> QuoteResult<()> {
        if self.depth == 0 {
            return Err(QuoteError::InvalidConfig("depth must be at least 1".to_string()));
        }
        if self.base_order_size <= Decimal::ZERO {
            return Err(QuoteError::InvalidConfig(format!(
                "base_order_size must be positive, got {}",
                self.base_order_size
            )));
        }
        if let Some(tick) = self.tick_size {
            if tick <= Decimal::ZERO {
                return Err(QuoteError::InvalidConfig(format!(
                    "tick_size must be positive, got {tick}"
                )));
            }
        }
        if self.volatility_window < 2 {
            return Err(QuoteError::InvalidConfig(
                "volatility_window must hold at least 2 samples".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(QuoteError::InvalidConfig(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        if self.max_consecutive_errors == Some(0) {
            return Err(QuoteError::InvalidConfig(
                "max_consecutive_errors must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_depth() -> usize {
    5
}
fn default_base_order_size() -> Decimal {
    Decimal::from(100)
}
fn default_volatility_window() -> usize {
    MID_WINDOW_CAPACITY
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_error_backoff_ms() -> u64 {
    1000
}
fn default_request_timeout_ms() -> u64 {
    5000
}
fn default_balance_sync_every() -> u64 {
    50
}
fn default_stop_grace_ms() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = MakerConfig::default();
        assert_eq!(config.depth, 5);
        assert_eq!(config.base_order_size, dec!(100));
        assert!(config.tick_size.is_none());
        assert_eq!(config.volatility_window, 100);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.error_backoff_ms, 1000);
        assert!(!config.cancel_on_stop);
        assert!(config.max_consecutive_errors.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serde_defaults() {
        let toml_str = r#"
base_order_size = "0.5"
tick_size = "0.01"
max_consecutive_errors = 3
"#;
        let config: MakerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.base_order_size, dec!(0.5));
        assert_eq!(config.tick_size, Some(dec!(0.01)));
        assert_eq!(config.max_consecutive_errors, Some(3));
        assert_eq!(config.depth, 5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_size = MakerConfig {
            base_order_size: Decimal::ZERO,
            ..MakerConfig::default()
        };
        assert!(zero_size.validate().is_err());

        let zero_errors = MakerConfig {
            max_consecutive_errors: Some(0),
            ..MakerConfig::default()
        };
        assert!(zero_errors.validate().is_err());

        let bad_tick = MakerConfig {
            tick_size: Some(dec!(-0.01)),
            ..MakerConfig::default()
        };
        assert!(bad_tick.validate().is_err());
    }
}
