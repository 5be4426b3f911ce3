//! Application configuration.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use quoter_core::Symbol;
use quoter_mm::MakerConfig;
use quoter_risk::RiskConfig;
use quoter_wallet::WalletConfig;

/// Paper venue seed data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaperConfig {
    /// Initial venue balances (asset -> total).
    #[serde(default)]
    pub balances: HashMap<String, Decimal>,
    /// Reference mid per symbol. Every job symbol needs one.
    #[serde(default)]
    pub mids: HashMap<String, Decimal>,
    /// Distance between synthetic book levels as a fraction of mid.
    #[serde(default = "default_book_step")]
    pub book_step: Decimal,
    /// Size resting at every synthetic level.
    #[serde(default = "default_level_size")]
    pub level_size: Decimal,
}

fn default_book_step() -> Decimal {
    Decimal::new(1, 3)
}

fn default_level_size() -> Decimal {
    Decimal::from(1000)
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            balances: HashMap::new(),
            mids: HashMap::new(),
            book_step: default_book_step(),
            level_size: default_level_size(),
        }
    }
}

impl PaperConfig {
    /// Reference mid for `symbol`, matched case-insensitively.
    pub fn mid_for(&self, symbol: &Symbol) -> Option<Decimal> {
        self.mids
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(symbol.as_str()))
            .map(|(_, v)| *v)
    }
}

/// One market-making job to start at boot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobConfig {
    pub symbol: String,
    /// Replaces the symbol's `min_spread` floor.
    #[serde(default)]
    pub spread_override: Option<Decimal>,
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub maker: MakerConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
    /// Status report interval (seconds). 0 disables reporting.
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
}

fn default_status_interval_secs() -> u64 {
    10
}

impl AppConfig {
    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section, and that each job can actually be quoted.
    pub fn validate(&self) -> AppResult<()> {
        self.maker
            .validate()
            .map_err(|e| AppError::Config(format!("maker: {e}")))?;
        self.risk
            .validate()
            .map_err(|e| AppError::Config(format!("risk: {e}")))?;

        if self.paper.book_step <= Decimal::ZERO || self.paper.level_size <= Decimal::ZERO {
            return Err(AppError::Config(
                "paper: book_step and level_size must be positive".to_string(),
            ));
        }
        for (symbol, mid) in &self.paper.mids {
            if *mid <= Decimal::ZERO {
                return Err(AppError::Config(format!("paper: mid for {symbol} must be positive")));
            }
        }

        let parser = self.wallet.symbol_parser();
        for job in &self.jobs {
            let symbol = Symbol::new(&job.symbol)
                .map_err(|e| AppError::Config(format!("jobs: {e}")))?;
            parser
                .split(&symbol)
                .map_err(|e| AppError::Config(format!("jobs: {e}")))?;
            if let Some(spread) = job.spread_override {
                if spread <= Decimal::ZERO || spread >= Decimal::ONE {
                    return Err(AppError::Config(format!(
                        "jobs: spread override for {symbol} must be in (0, 1)"
                    )));
                }
            }
            if self.paper.mid_for(&symbol).is_none() {
                return Err(AppError::Config(format!(
                    "jobs: no paper mid configured for {symbol}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const DEFAULT_TOML: &str = include_str!("../../../config/default.toml");

    #[test]
    fn test_default_config_file_parses() {
        let config = AppConfig::from_toml(DEFAULT_TOML).unwrap();
        assert_eq!(config.jobs.len(), 1);
        assert_eq!(config.jobs[0].symbol, "KAS-USDT");
        assert_eq!(config.maker.depth, 5);
        assert_eq!(config.risk.defaults.min_spread, dec!(0.02));
        assert_eq!(config.wallet.gas_asset, "KAS");
        assert_eq!(
            config.paper.mid_for(&Symbol::new("kas-usdt").unwrap()),
            Some(dec!(0.15))
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert!(config.jobs.is_empty());
        assert_eq!(config.status_interval_secs, 10);
        assert_eq!(config.paper.book_step, dec!(0.001));
        assert_eq!(config.maker, MakerConfig::default());
    }

    #[test]
    fn test_job_without_mid_rejected() {
        let toml_str = r#"
[[jobs]]
symbol = "BTC-USDT"
"#;
        let err = AppConfig::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("no paper mid"));
    }

    #[test]
    fn test_bad_spread_override_rejected() {
        let toml_str = r#"
[paper.mids]
"BTC-USDT" = "50000"

[[jobs]]
symbol = "BTC-USDT"
spread_override = "1.5"
"#;
        assert!(matches!(
            AppConfig::from_toml(toml_str),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_unparseable_symbol_rejected() {
        let toml_str = r#"
[paper.mids]
"BTC-" = "50000"

[[jobs]]
symbol = "BTC-"
"#;
        assert!(AppConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("status_interval_secs"));
        assert!(toml_str.contains("[maker]"));
    }
}
