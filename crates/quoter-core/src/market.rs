//! Trading pair identification.
//!
//! Venues spell pairs either delimited (`KAS-USDT`, `KAS_USDT`, `KAS/USDT`)
//! or concatenated (`KASUSDT`). `SymbolParser` recovers the base and quote
//! assets from both forms.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Quote assets recognized by the concatenated-suffix heuristic.
pub const DEFAULT_QUOTE_ASSETS: &[&str] =
    &["USDT", "USDC", "BUSD", "FDUSD", "USD", "BTC", "ETH", "EUR"];

const DELIMITERS: &[char] = &['-', '_', '/'];

/// Trading pair symbol as the venue spells it, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidSymbol("empty symbol".to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Base/quote split of a trading pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetPair {
    pub base: String,
    pub quote: String,
}

impl AssetPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

/// Splits symbols into base and quote assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolParser {
    quote_assets: Vec<String>,
}

impl Default for SymbolParser {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTE_ASSETS.iter().map(|s| s.to_string()))
    }
}

impl SymbolParser {
    pub fn new(quote_assets: impl IntoIterator<Item = String>) -> Self {
        let mut quote_assets: Vec<String> = quote_assets
            .into_iter()
            .map(|q| q.trim().to_ascii_uppercase())
            .filter(|q| !q.is_empty())
            .collect();
        // Longest first so that FDUSD beats USD.
        quote_assets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        quote_assets.dedup();
        Self { quote_assets }
    }

    pub fn quote_assets(&self) -> &[String] {
        &self.quote_assets
    }

    /// Split a symbol into its base and quote assets.
    ///
    /// Resolution order:
    /// 1. an explicit delimiter (`-`, `_`, `/`)
    /// 2. the longest recognized quote suffix that leaves a non-empty base
    /// 3. a 4-character suffix if it starts with a recognized 3-character
    ///    quote prefix (e.g. `USDX`), otherwise a 3-character suffix
    pub fn split(&self, symbol: &Symbol) -> Result<AssetPair> {
        let s = symbol.as_str();

        if let Some(idx) = s.find(DELIMITERS) {
            let (base, rest) = s.split_at(idx);
            let quote = &rest[1..];
            if base.is_empty() || quote.is_empty() || quote.contains(DELIMITERS) {
                return Err(CoreError::InvalidSymbol(s.to_string()));
            }
            return Ok(AssetPair::new(base, quote));
        }

        if !s.is_ascii() {
            return Err(CoreError::InvalidSymbol(s.to_string()));
        }

        for quote in &self.quote_assets {
            if s.len() > quote.len() && s.ends_with(quote.as_str()) {
                return Ok(AssetPair::new(&s[..s.len() - quote.len()], quote.as_str()));
            }
        }

        if s.len() < 4 {
            return Err(CoreError::InvalidSymbol(s.to_string()));
        }

        let four = &s[s.len().saturating_sub(4)..];
        let quote_len = if s.len() > 4 && self.has_prefix_of(four) { 4 } else { 3 };
        let split_at = s.len() - quote_len;
        Ok(AssetPair::new(&s[..split_at], &s[split_at..]))
    }

    fn has_prefix_of(&self, candidate: &str) -> bool {
        self.quote_assets
            .iter()
            .any(|q| q.len() >= 3 && candidate.starts_with(&q[..3]))
    }
}
