//! Per-symbol risk limits and their configuration.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quoter_core::Symbol;

use crate::error::{RiskError, RiskResult};

/// Limits applied to one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Static cap on |net position| in base units.
    #[serde(default = "default_max_position")]
    pub max_position: Decimal,

    /// Largest quantity a single order may carry.
    #[serde(default = "default_max_order_size")]
    pub max_order_size: Decimal,

    /// Spread floor as a fraction of mid (0.02 = 2% each side).
    #[serde(default = "default_min_spread")]
    pub min_spread: Decimal,

    /// Desired base value / quote value ratio of the wallet.
    #[serde(default = "default_target_balance_ratio")]
    pub target_balance_ratio: Decimal,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position: default_max_position(),
            max_order_size: default_max_order_size(),
            min_spread: default_min_spread(),
            target_balance_ratio: default_target_balance_ratio(),
        }
    }
}

impl RiskLimits {
    pub fn validate(&self) -> RiskResult<()> {
        if self.max_position.is_sign_negative() {
            return Err(RiskError::ConfigError(format!(
                "max_position must be non-negative, got {}",
                self.max_position
            )));
        }
        if !self.max_order_size.is_sign_positive() || self.max_order_size.is_zero() {
            return Err(RiskError::ConfigError(format!(
                "max_order_size must be positive, got {}",
                self.max_order_size
            )));
        }
        if self.min_spread.is_sign_negative() {
            return Err(RiskError::ConfigError(format!(
                "min_spread must be non-negative, got {}",
                self.min_spread
            )));
        }
        if self.target_balance_ratio <= Decimal::ZERO {
            return Err(RiskError::ConfigError(format!(
                "target_balance_ratio must be positive, got {}",
                self.target_balance_ratio
            )));
        }
        Ok(())
    }
}

fn default_max_position() -> Decimal {
    Decimal::from(1000)
}
fn default_max_order_size() -> Decimal {
    Decimal::from(1000)
}
fn default_min_spread() -> Decimal {
    Decimal::new(2, 2) // 0.02
}
fn default_target_balance_ratio() -> Decimal {
    Decimal::ONE
}

/// Default limits plus per-symbol overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskConfig {
    /// Applied to symbols without an entry in `symbols`.
    #[serde(default)]
    pub defaults: RiskLimits,

    /// Per-symbol limits keyed by symbol as spelled in job config.
    #[serde(default)]
    pub symbols: HashMap<String, RiskLimits>,
}

impl RiskConfig {
    /// Limits for `symbol`, falling back to the defaults.
    pub fn limits_for(&self, symbol: &Symbol) -> RiskLimits {
        self.symbols
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(symbol.as_str()))
            .map(|(_, v)| *v)
            .unwrap_or(self.defaults)
    }

    pub fn validate(&self) -> RiskResult<()> {
        self.defaults.validate()?;
        for (symbol, limits) in &self.symbols {
            limits
                .validate()
                .map_err(|e| RiskError::ConfigError(format!("{symbol}: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_limits() {
        let limits = RiskLimits::default();
        assert_eq!(limits.max_position, dec!(1000));
        assert_eq!(limits.max_order_size, dec!(1000));
        assert_eq!(limits.min_spread, dec!(0.02));
        assert_eq!(limits.target_balance_ratio, dec!(1));
        assert!(limits.validate().is_ok());
    }

    #[test]
    fn test_zero_target_ratio_is_invalid() {
        let limits = RiskLimits {
            target_balance_ratio: Decimal::ZERO,
            ..RiskLimits::default()
        };
        assert!(matches!(limits.validate(), Err(RiskError::ConfigError(_))));
    }

    #[test]
    fn test_config_symbol_lookup() {
        let toml_str = r#"
[defaults]
min_spread = "0.01"

[symbols."BTC-USDT"]
max_position = "5"
"#;
        let config: RiskConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());

        let btc = config.limits_for(&Symbol::new("btc-usdt").unwrap());
        assert_eq!(btc.max_position, dec!(5));
        assert_eq!(btc.min_spread, dec!(0.02));

        let kas = config.limits_for(&Symbol::new("KAS-USDT").unwrap());
        assert_eq!(kas.min_spread, dec!(0.01));
        assert_eq!(kas.max_position, dec!(1000));
    }
}
