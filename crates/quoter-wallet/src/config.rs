//! Wallet configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quoter_core::{SymbolParser, DEFAULT_QUOTE_ASSETS};

/// Wallet configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletConfig {
    /// Asset that pays network fees.
    #[serde(default = "default_gas_asset")]
    pub gas_asset: String,

    /// Available gas balance every order must leave in place.
    #[serde(default = "default_min_gas_reserve")]
    pub min_gas_reserve: Decimal,

    /// Quote assets recognized when splitting concatenated symbols.
    #[serde(default = "default_quote_assets")]
    pub quote_assets: Vec<String>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            gas_asset: default_gas_asset(),
            min_gas_reserve: default_min_gas_reserve(),
            quote_assets: default_quote_assets(),
        }
    }
}

impl WalletConfig {
    /// Parser built from the configured quote assets.
    pub fn symbol_parser(&self) -> SymbolParser {
        SymbolParser::new(self.quote_assets.iter().cloned())
    }
}

fn default_gas_asset() -> String {
    "KAS".to_string()
}
fn default_min_gas_reserve() -> Decimal {
    Decimal::ONE
}
fn default_quote_assets() -> Vec<String> {
    DEFAULT_QUOTE_ASSETS.iter().map(|s| s.to_string()).collect()
}
