//! Per-asset balance ledger.
//!
//! `update_balance` is an absolute resync of `total`. `reserve`/`release`
//! only move funds between the available and reserved split.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use quoter_core::{AssetPair, CoreError, OrderSide, Price, Size, Symbol, SymbolParser};

use crate::config::WalletConfig;
use crate::error::{WalletError, WalletResult};

// ============================================================================
// WalletBalance
// ============================================================================

/// Balance snapshot for a single asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub total: Decimal,
    pub reserved: Decimal,
}

impl WalletBalance {
    /// `total - reserved`, floored at zero.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.total
            .checked_sub(self.reserved)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO)
    }
}

// ============================================================================
// WalletLedger
// ============================================================================

/// Wallet owned by one market-making job.
#[derive(Debug, Clone)]
pub struct WalletLedger {
    balances: HashMap<String, WalletBalance>,
    gas_asset: String,
    min_gas_reserve: Decimal,
    parser: SymbolParser,
}

impl Default for WalletLedger {
    fn default() -> Self {
        Self::new(&WalletConfig::default())
    }
}

impl WalletLedger {
    pub fn new(config: &WalletConfig) -> Self {
        Self {
            balances: HashMap::new(),
            gas_asset: config.gas_asset.to_ascii_uppercase(),
            min_gas_reserve: config.min_gas_reserve,
            parser: config.symbol_parser(),
        }
    }

    pub fn gas_asset(&self) -> &str {
        &self.gas_asset
    }

    pub fn min_gas_reserve(&self) -> Decimal {
        self.min_gas_reserve
    }

    pub fn parser(&self) -> &SymbolParser {
        &self.parser
    }

    /// Split a symbol using this wallet's quote-asset table.
    pub fn split(&self, symbol: &Symbol) -> WalletResult<AssetPair> {
        Ok(self.parser.split(symbol)?)
    }

    /// Set the total for an asset. Reserved funds are left untouched.
    pub fn update_balance(&mut self, asset: &str, total: Decimal) {
        let entry = self.balances.entry(asset.to_ascii_uppercase()).or_default();
        entry.total = total;
        trace!(asset, total = %total, reserved = %entry.reserved, "Balance updated");
    }

    /// Resync every asset the venue reports.
    pub fn sync_from(&mut self, balances: &HashMap<String, Decimal>) {
        for (asset, total) in balances {
            self.update_balance(asset, *total);
        }
        debug!(assets = balances.len(), "Wallet resynced");
    }

    #[must_use]
    pub fn balance(&self, asset: &str) -> WalletBalance {
        self.balances
            .get(&asset.to_ascii_uppercase())
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn total(&self, asset: &str) -> Decimal {
        self.balance(asset).total
    }

    #[must_use]
    pub fn reserved(&self, asset: &str) -> Decimal {
        self.balance(asset).reserved
    }

    #[must_use]
    pub fn available(&self, asset: &str) -> Decimal {
        self.balance(asset).available()
    }

    /// Move `amount` from available into reserved.
    ///
    /// Returns `false` and leaves the balance untouched when available is
    /// short or `amount` is negative.
    pub fn reserve(&mut self, asset: &str, amount: Decimal) -> bool {
        if amount.is_sign_negative() {
            debug!(asset, amount = %amount, "Negative reserve refused");
            return false;
        }
        let key = asset.to_ascii_uppercase();
        let entry = self.balances.entry(key).or_default();
        if entry.available() < amount {
            debug!(
                asset,
                amount = %amount,
                available = %entry.available(),
                "Reserve refused"
            );
            return false;
        }
        // available >= amount implies reserved + amount <= total.
        entry.reserved += amount;
        true
    }

    /// Return reserved funds to available. Over-release clamps at zero and a
    /// negative amount is ignored.
    pub fn release(&mut self, asset: &str, amount: Decimal) {
        if amount.is_sign_negative() {
            debug!(asset, amount = %amount, "Negative release ignored");
            return;
        }
        if let Some(entry) = self.balances.get_mut(&asset.to_ascii_uppercase()) {
            entry.reserved = (entry.reserved - amount).max(Decimal::ZERO);
        }
    }

    /// Detailed affordability check for a candidate order.
    pub fn check_order(
        &self,
        side: OrderSide,
        symbol: &Symbol,
        quantity: Size,
        price: Price,
    ) -> WalletResult<()> {
        let pair = self.split(symbol)?;

        let (asset, required) = match side {
            OrderSide::Buy => (pair.quote, quantity.notional(price)?),
            OrderSide::Sell => (pair.base, quantity.inner()),
        };
        let available = self.available(&asset);
        if available < required {
            return Err(WalletError::InsufficientBalance {
                asset,
                required,
                available,
            });
        }

        let gas = self.available(&self.gas_asset);
        if gas < self.min_gas_reserve {
            return Err(WalletError::InsufficientGas {
                asset: self.gas_asset.clone(),
                available: gas,
                minimum: self.min_gas_reserve,
            });
        }

        Ok(())
    }

    /// Whether the wallet can fund the order and still hold the gas reserve.
    #[must_use]
    pub fn can_place_order(
        &self,
        side: OrderSide,
        symbol: &Symbol,
        quantity: Size,
        price: Price,
    ) -> bool {
        match self.check_order(side, symbol, quantity, price) {
            Ok(()) => true,
            Err(e) => {
                debug!(symbol = %symbol, side = %side, error = %e, "Order not affordable");
                false
            }
        }
    }

    /// Settle an assumed fill against the totals.
    ///
    /// Buy: base += q, quote -= q * p. Sell is the inverse. Totals floor at
    /// zero and reserved is clamped to the new total. On overflow nothing is
    /// changed.
    pub fn apply_fill(
        &mut self,
        side: OrderSide,
        symbol: &Symbol,
        quantity: Size,
        price: Price,
    ) -> WalletResult<()> {
        let pair = self.split(symbol)?;
        let notional = quantity.notional(price)?;

        let (base_delta, quote_delta) = match side {
            OrderSide::Buy => (quantity.inner(), -notional),
            OrderSide::Sell => (-quantity.inner(), notional),
        };

        let base_total = self.shifted_total(&pair.base, base_delta)?;
        let quote_total = self.shifted_total(&pair.quote, quote_delta)?;

        for (asset, total) in [(&pair.base, base_total), (&pair.quote, quote_total)] {
            self.update_balance(asset, total);
            if let Some(entry) = self.balances.get_mut(asset.as_str()) {
                entry.reserved = entry.reserved.min(entry.total);
            }
        }
        Ok(())
    }

    /// total + delta, floored at zero.
    fn shifted_total(&self, asset: &str, delta: Decimal) -> WalletResult<Decimal> {
        let total = self.total(asset);
        let shifted = total
            .checked_add(delta)
            .ok_or_else(|| CoreError::Overflow(format!("{asset} {total} + {delta}")))?;
        Ok(shifted.max(Decimal::ZERO))
    }

    /// Snapshot of every known asset.
    pub fn balances(&self) -> impl Iterator<Item = (&str, &WalletBalance)> {
        self.balances.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn wallet() -> WalletLedger {
        let mut w = WalletLedger::default();
        w.update_balance("KAS", dec!(10));
        w.update_balance("USDT", dec!(1000));
        w
    }

    fn sym(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    #[test]
    fn test_available_is_total_minus_reserved() {
        let mut w = wallet();
        assert!(w.reserve("USDT", dec!(300)));
        let b = w.balance("USDT");
        assert_eq!(b.total, dec!(1000));
        assert_eq!(b.reserved, dec!(300));
        assert_eq!(w.available("USDT"), dec!(700));
    }

    #[test]
    fn test_over_reserve_fails_without_mutation() {
        let mut w = wallet();
        assert!(w.reserve("USDT", dec!(600)));
        assert!(!w.reserve("USDT", dec!(500)));
        assert_eq!(w.reserved("USDT"), dec!(600));
        assert_eq!(w.available("USDT"), dec!(400));
    }

    #[test]
    fn test_release_clamps_at_zero() {
        let mut w = wallet();
        assert!(w.reserve("USDT", dec!(100)));
        w.release("USDT", dec!(250));
        assert_eq!(w.reserved("USDT"), Decimal::ZERO);
        assert_eq!(w.available("USDT"), dec!(1000));
        // Unknown asset is a no-op.
        w.release("DOGE", dec!(1));
    }

    #[test]
    fn test_negative_reserve_refused() {
        let mut w = wallet();
        assert!(!w.reserve("USDT", dec!(-50)));
        assert_eq!(w.reserved("USDT"), Decimal::ZERO);
        assert_eq!(w.available("USDT"), dec!(1000));
    }

    #[test]
    fn test_negative_release_ignored() {
        let mut w = WalletLedger::default();
        w.update_balance("USDT", dec!(100));
        assert!(w.reserve("USDT", dec!(40)));
        w.release("USDT", dec!(-500));
        let b = w.balance("USDT");
        assert_eq!(b.reserved, dec!(40));
        assert!(b.reserved <= b.total);
        assert_eq!(w.available("USDT"), dec!(60));
    }

    #[test]
    fn test_apply_fill_overflow_leaves_totals() {
        let mut w = wallet();
        w.update_balance("KAS", Decimal::MAX);
        let s = sym("KAS-USDT");
        let err = w
            .apply_fill(OrderSide::Buy, &s, Size::ONE, Price::ONE)
            .unwrap_err();
        assert!(matches!(err, WalletError::Core(CoreError::Overflow(_))));
        assert_eq!(w.total("KAS"), Decimal::MAX);
        assert_eq!(w.total("USDT"), dec!(1000));

        let err = w
            .check_order(OrderSide::Buy, &s, Size::new(Decimal::MAX), Price::new(dec!(2)))
            .unwrap_err();
        assert!(matches!(err, WalletError::Core(CoreError::Overflow(_))));
    }

    #[test]
    fn test_update_balance_keeps_reserved_and_floors_available() {
        let mut w = wallet();
        assert!(w.reserve("USDT", dec!(800)));
        w.update_balance("USDT", dec!(500));
        assert_eq!(w.reserved("USDT"), dec!(800));
        assert_eq!(w.available("USDT"), Decimal::ZERO);
    }

    #[test]
    fn test_case_insensitive_assets() {
        let mut w = WalletLedger::default();
        w.update_balance("usdt", dec!(5));
        assert_eq!(w.total("USDT"), dec!(5));
    }

    #[test]
    fn test_buy_needs_quote_and_gas() {
        let mut w = wallet();
        let s = sym("KAS-USDT");
        assert!(w.can_place_order(OrderSide::Buy, &s, Size::new(dec!(100)), Price::new(dec!(10))));
        assert!(!w.can_place_order(OrderSide::Buy, &s, Size::new(dec!(101)), Price::new(dec!(10))));

        w.update_balance("KAS", dec!(0.5));
        let err = w
            .check_order(OrderSide::Buy, &s, Size::ONE, Price::ONE)
            .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientGas { .. }));
    }

    #[test]
    fn test_sell_needs_base() {
        let w = wallet();
        let s = sym("KASUSDT");
        assert!(w.can_place_order(OrderSide::Sell, &s, Size::new(dec!(10)), Price::ONE));
        let err = w
            .check_order(OrderSide::Sell, &s, Size::new(dec!(11)), Price::ONE)
            .unwrap_err();
        match err {
            WalletError::InsufficientBalance { asset, required, available } => {
                assert_eq!(asset, "KAS");
                assert_eq!(required, dec!(11));
                assert_eq!(available, dec!(10));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparseable_symbol_is_not_affordable() {
        let w = wallet();
        assert!(!w.can_place_order(OrderSide::Buy, &sym("AB"), Size::ONE, Price::ONE));
    }

    #[test]
    fn test_apply_fill_moves_totals() {
        let mut w = wallet();
        let s = sym("KAS-USDT");
        w.apply_fill(OrderSide::Buy, &s, Size::new(dec!(5)), Price::new(dec!(2)))
            .unwrap();
        assert_eq!(w.total("KAS"), dec!(15));
        assert_eq!(w.total("USDT"), dec!(990));

        w.apply_fill(OrderSide::Sell, &s, Size::new(dec!(20)), Price::new(dec!(2)))
            .unwrap();
        assert_eq!(w.total("KAS"), Decimal::ZERO);
        assert_eq!(w.total("USDT"), dec!(1030));
    }

    #[test]
    fn test_sync_from_replaces_totals() {
        let mut w = wallet();
        let mut reported = HashMap::new();
        reported.insert("USDT".to_string(), dec!(42));
        reported.insert("SZAR".to_string(), dec!(7));
        w.sync_from(&reported);
        assert_eq!(w.total("USDT"), dec!(42));
        assert_eq!(w.total("SZAR"), dec!(7));
        assert_eq!(w.total("KAS"), dec!(10));
    }
}
