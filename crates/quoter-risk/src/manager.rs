//! Order admission and spread recommendation.
//!
//! The manager is shared by every job (`Arc<RiskManager>`); limits sit behind
//! a `parking_lot::RwLock` so they can be revised while loops are running.
//! Ledger state comes from the caller's `Portfolio`.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use quoter_core::{OrderSide, Price, Size, Symbol};

use crate::error::{RiskError, RiskResult};
use crate::limits::{RiskConfig, RiskLimits};
use crate::portfolio::Portfolio;

/// Share of mark-to-market wallet value a position may reach (0.20).
pub const DYNAMIC_LIMIT_FRACTION: Decimal = Decimal::from_parts(2, 0, 0, false, 1);

// ============================================================================
// RiskDecision
// ============================================================================

/// Why an order was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// No limits registered for the symbol.
    LimitsNotConfigured,
    OrderTooLarge { quantity: Decimal, max: Decimal },
    PositionLimit { new_position: Decimal, limit: Decimal },
    /// Trade moves the base/quote value ratio away from target.
    /// `None` ratios mean an empty quote balance (infinite ratio).
    BalanceRatio {
        current: Option<Decimal>,
        new: Option<Decimal>,
        target: Decimal,
    },
    /// Evaluation itself failed; the order is refused.
    EvaluationFailed(String),
}

impl RejectReason {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LimitsNotConfigured => "limits_not_configured",
            Self::OrderTooLarge { .. } => "order_too_large",
            Self::PositionLimit { .. } => "position_limit",
            Self::BalanceRatio { .. } => "balance_ratio",
            Self::EvaluationFailed(_) => "evaluation_failed",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LimitsNotConfigured => write!(f, "risk limits not configured"),
            Self::OrderTooLarge { quantity, max } => {
                write!(f, "order quantity {quantity} exceeds max {max}")
            }
            Self::PositionLimit {
                new_position,
                limit,
            } => write!(f, "position {new_position} would exceed limit {limit}"),
            Self::BalanceRatio {
                current,
                new,
                target,
            } => write!(
                f,
                "balance ratio {} -> {} moves away from target {target}",
                fmt_ratio(*current),
                fmt_ratio(*new)
            ),
            Self::EvaluationFailed(e) => write!(f, "evaluation failed: {e}"),
        }
    }
}

fn fmt_ratio(ratio: Option<Decimal>) -> String {
    ratio.map_or_else(|| "inf".to_string(), |r| r.round_dp(6).to_string())
}

/// Outcome of a risk evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskDecision {
    Accept,
    Reject(RejectReason),
}

impl RiskDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Accept => None,
            Self::Reject(r) => Some(r),
        }
    }
}

// ============================================================================
// RiskManager
// ============================================================================

/// Per-symbol risk limits and the checks built on them.
#[derive(Debug, Default)]
pub struct RiskManager {
    limits: RwLock<HashMap<Symbol, RiskLimits>>,
}

impl RiskManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manager pre-loaded with every per-symbol entry of `config`.
    pub fn from_config(config: &RiskConfig) -> RiskResult<Self> {
        config.validate()?;
        let manager = Self::new();
        for symbol in config.symbols.keys() {
            let symbol = Symbol::new(symbol)
                .map_err(|e| RiskError::ConfigError(format!("{symbol}: {e}")))?;
            manager.set_limits(&symbol, config.limits_for(&symbol))?;
        }
        Ok(manager)
    }

    /// Install or replace the limits for a symbol.
    pub fn set_limits(&self, symbol: &Symbol, limits: RiskLimits) -> RiskResult<()> {
        limits.validate()?;
        info!(
            symbol = %symbol,
            max_position = %limits.max_position,
            max_order_size = %limits.max_order_size,
            min_spread = %limits.min_spread,
            target_balance_ratio = %limits.target_balance_ratio,
            "Risk limits set"
        );
        self.limits.write().insert(symbol.clone(), limits);
        Ok(())
    }

    pub fn limits(&self, symbol: &Symbol) -> Option<RiskLimits> {
        self.limits.read().get(symbol).copied()
    }

    pub fn remove_limits(&self, symbol: &Symbol) -> Option<RiskLimits> {
        self.limits.write().remove(symbol)
    }

    fn require_limits(&self, symbol: &Symbol) -> RiskResult<RiskLimits> {
        self.limits(symbol)
            .ok_or_else(|| RiskError::LimitsNotConfigured(symbol.to_string()))
    }

    /// Available (base, quote) balances for the symbol's assets.
    fn balances(&self, portfolio: &Portfolio, symbol: &Symbol) -> RiskResult<(Decimal, Decimal)> {
        let pair = portfolio.wallet.split(symbol)?;
        Ok((
            portfolio.wallet.available(&pair.base),
            portfolio.wallet.available(&pair.quote),
        ))
    }

    /// `DYNAMIC_LIMIT_FRACTION` of the wallet's mark-to-market value.
    pub fn dynamic_position_limit(
        &self,
        portfolio: &Portfolio,
        symbol: &Symbol,
        price: Price,
    ) -> RiskResult<Decimal> {
        let (base, quote) = self.balances(portfolio, symbol)?;
        let base_value = checked(base.checked_mul(price.inner()), "base value")?;
        let total_value = checked(base_value.checked_add(quote), "wallet value")?;
        checked(DYNAMIC_LIMIT_FRACTION.checked_mul(total_value), "dynamic limit")
    }

    /// Spread fraction to quote at, never below `min_spread`.
    pub fn recommended_spread(
        &self,
        portfolio: &Portfolio,
        symbol: &Symbol,
        volatility: Decimal,
        mark_price: Price,
    ) -> RiskResult<Decimal> {
        self.recommended_spread_with_floor(portfolio, symbol, volatility, mark_price, None)
    }

    /// As `recommended_spread`, with `floor` replacing the symbol's `min_spread`.
    ///
    /// result = max(base, base + 2 * volatility + base * imbalance), where
    /// imbalance = |ratio - target| / target and ratio is 0 on an empty quote
    /// balance.
    pub fn recommended_spread_with_floor(
        &self,
        portfolio: &Portfolio,
        symbol: &Symbol,
        volatility: Decimal,
        mark_price: Price,
        floor: Option<Decimal>,
    ) -> RiskResult<Decimal> {
        let limits = self.require_limits(symbol)?;
        let base_spread = floor.unwrap_or(limits.min_spread);
        let target = limits.target_balance_ratio;
        if target.is_zero() {
            return Err(RiskError::ConfigError(format!(
                "target_balance_ratio is zero for {symbol}"
            )));
        }

        let (base, quote) = self.balances(portfolio, symbol)?;
        let current_ratio = value_ratio(base, quote, mark_price)?.unwrap_or(Decimal::ZERO);

        let volatility_adjustment =
            checked(volatility.checked_mul(Decimal::TWO), "volatility adjustment")?;
        let gap = checked(current_ratio.checked_sub(target), "ratio gap")?.abs();
        let imbalance = checked(gap.checked_div(target), "imbalance")?;
        let imbalance_adjustment =
            checked(base_spread.checked_mul(imbalance), "imbalance adjustment")?;
        let spread = checked(
            base_spread
                .checked_add(volatility_adjustment)
                .and_then(|s| s.checked_add(imbalance_adjustment)),
            "spread",
        )?;

        Ok(base_spread.max(spread))
    }

    /// Whether the simulated trade keeps the wallet at least as close to the
    /// target ratio as it is now. Ties are accepted.
    pub fn improves_balance_ratio(
        &self,
        portfolio: &Portfolio,
        symbol: &Symbol,
        quantity: Size,
        price: Price,
        side: OrderSide,
    ) -> RiskResult<bool> {
        Ok(self
            .balance_ratio_shift(portfolio, symbol, quantity, price, side)?
            .is_none())
    }

    /// `Some(reason)` when the trade worsens the ratio.
    fn balance_ratio_shift(
        &self,
        portfolio: &Portfolio,
        symbol: &Symbol,
        quantity: Size,
        price: Price,
        side: OrderSide,
    ) -> RiskResult<Option<RejectReason>> {
        let limits = self.require_limits(symbol)?;
        let target = limits.target_balance_ratio;
        let (base, quote) = self.balances(portfolio, symbol)?;

        let notional = quantity
            .notional(price)
            .map_err(|e| RiskError::Arithmetic(e.to_string()))?;
        let q = quantity.inner();
        let shifted = match side {
            OrderSide::Buy => base.checked_add(q).zip(quote.checked_sub(notional)),
            OrderSide::Sell => base.checked_sub(q).zip(quote.checked_add(notional)),
        };
        let (new_base, new_quote) = checked(shifted, "simulated balances")?;

        let current = value_ratio(base, quote, price)?;
        let new = value_ratio(new_base, new_quote, price)?;

        let worsens = match (distance(current, target)?, distance(new, target)?) {
            // Infinite distance now: anything is at least as good.
            (None, _) => false,
            (Some(_), None) => true,
            (Some(cur), Some(next)) => next > cur,
        };

        Ok(worsens.then_some(RejectReason::BalanceRatio {
            current,
            new,
            target,
        }))
    }

    /// Full evaluation with a typed rejection reason.
    ///
    /// Evaluation errors never escape: they become
    /// `RejectReason::LimitsNotConfigured` or `RejectReason::EvaluationFailed`.
    pub fn evaluate_order(
        &self,
        portfolio: &Portfolio,
        symbol: &Symbol,
        quantity: Size,
        price: Price,
        side: OrderSide,
    ) -> RiskDecision {
        match self.try_evaluate(portfolio, symbol, quantity, price, side) {
            Ok(decision) => {
                if let RiskDecision::Reject(reason) = &decision {
                    debug!(
                        symbol = %symbol,
                        side = %side,
                        quantity = %quantity,
                        price = %price,
                        reason = %reason,
                        "Order rejected by risk"
                    );
                }
                decision
            }
            Err(RiskError::LimitsNotConfigured(_)) => {
                warn!(symbol = %symbol, side = %side, "Order rejected: risk limits not configured");
                RiskDecision::Reject(RejectReason::LimitsNotConfigured)
            }
            Err(e) => {
                warn!(symbol = %symbol, side = %side, error = %e, "Risk evaluation failed, rejecting");
                RiskDecision::Reject(RejectReason::EvaluationFailed(e.to_string()))
            }
        }
    }

    /// Boolean admission: `true` only when every check passes.
    pub fn check_order(
        &self,
        portfolio: &Portfolio,
        symbol: &Symbol,
        quantity: Size,
        price: Price,
        side: OrderSide,
    ) -> bool {
        self.evaluate_order(portfolio, symbol, quantity, price, side)
            .is_accept()
    }

    fn try_evaluate(
        &self,
        portfolio: &Portfolio,
        symbol: &Symbol,
        quantity: Size,
        price: Price,
        side: OrderSide,
    ) -> RiskResult<RiskDecision> {
        let limits = self.require_limits(symbol)?;

        if quantity.inner() > limits.max_order_size {
            return Ok(RiskDecision::Reject(RejectReason::OrderTooLarge {
                quantity: quantity.inner(),
                max: limits.max_order_size,
            }));
        }

        let new_position = checked(
            portfolio
                .positions
                .get(symbol)
                .checked_add(side.signed(quantity)),
            "new position",
        )?;
        let dynamic_limit = self.dynamic_position_limit(portfolio, symbol, price)?;
        let limit = limits.max_position.min(dynamic_limit);
        if new_position.abs() > limit {
            return Ok(RiskDecision::Reject(RejectReason::PositionLimit {
                new_position,
                limit,
            }));
        }

        if let Some(reason) = self.balance_ratio_shift(portfolio, symbol, quantity, price, side)? {
            return Ok(RiskDecision::Reject(reason));
        }

        Ok(RiskDecision::Accept)
    }
}

fn checked<T>(value: Option<T>, what: &str) -> RiskResult<T> {
    value.ok_or_else(|| RiskError::Arithmetic(what.to_string()))
}

/// base * price / quote, `None` when quote is zero.
fn value_ratio(base: Decimal, quote: Decimal, price: Price) -> RiskResult<Option<Decimal>> {
    if quote.is_zero() {
        return Ok(None);
    }
    let value = checked(base.checked_mul(price.inner()), "base value")?;
    checked(value.checked_div(quote), "balance ratio").map(Some)
}

fn distance(ratio: Option<Decimal>, target: Decimal) -> RiskResult<Option<Decimal>> {
    ratio
        .map(|r| checked(r.checked_sub(target), "ratio distance").map(|d| d.abs()))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sym() -> Symbol {
        Symbol::new("KAS-USDT").unwrap()
    }

    fn portfolio(base: Decimal, quote: Decimal) -> Portfolio {
        let mut p = Portfolio::default();
        p.wallet.update_balance("KAS", base);
        p.wallet.update_balance("USDT", quote);
        p
    }

    fn manager(limits: RiskLimits) -> RiskManager {
        let m = RiskManager::new();
        m.set_limits(&sym(), limits).unwrap();
        m
    }

    #[test]
    fn test_dynamic_limit_fraction() {
        assert_eq!(DYNAMIC_LIMIT_FRACTION, dec!(0.2));
        let m = manager(RiskLimits::default());
        let p = portfolio(dec!(100), dec!(400));
        let limit = m
            .dynamic_position_limit(&p, &sym(), Price::new(dec!(2)))
            .unwrap();
        assert_eq!(limit, dec!(120)); // 0.2 * (100*2 + 400)
    }

    #[test]
    fn test_position_limit_rejects_buy_past_cap() {
        let m = manager(RiskLimits {
            max_position: dec!(1000),
            max_order_size: dec!(100),
            min_spread: dec!(0.001),
            target_balance_ratio: dec!(1),
        });
        let mut p = portfolio(dec!(5000), dec!(15000));
        p.positions
            .update(&sym(), Size::new(dec!(950)), Price::ONE, OrderSide::Buy);

        let decision = m.evaluate_order(&p, &sym(), Size::new(dec!(100)), Price::ONE, OrderSide::Buy);
        assert_eq!(
            decision,
            RiskDecision::Reject(RejectReason::PositionLimit {
                new_position: dec!(1050),
                limit: dec!(1000),
            })
        );

        // Landing exactly on the cap is allowed.
        assert!(m.check_order(&p, &sym(), Size::new(dec!(50)), Price::ONE, OrderSide::Buy));
    }

    #[test]
    fn test_dynamic_limit_tighter_than_static() {
        let m = manager(RiskLimits::default());
        let p = portfolio(dec!(100), dec!(400));
        let decision = m.evaluate_order(&p, &sym(), Size::new(dec!(150)), Price::ONE, OrderSide::Buy);
        assert_eq!(decision.reject_reason().map(RejectReason::label), Some("position_limit"));
    }

    #[test]
    fn test_order_size_cap() {
        let m = manager(RiskLimits {
            max_order_size: dec!(100),
            ..RiskLimits::default()
        });
        let p = portfolio(dec!(5000), dec!(15000));
        let decision = m.evaluate_order(&p, &sym(), Size::new(dec!(101)), Price::ONE, OrderSide::Buy);
        assert!(matches!(
            decision,
            RiskDecision::Reject(RejectReason::OrderTooLarge { .. })
        ));
    }

    #[test]
    fn test_balance_gate_direction() {
        let m = manager(RiskLimits::default());
        let p = portfolio(dec!(5000), dec!(15000));

        assert!(!m.check_order(&p, &sym(), Size::new(dec!(50)), Price::ONE, OrderSide::Sell));
        assert!(m.check_order(&p, &sym(), Size::new(dec!(50)), Price::ONE, OrderSide::Buy));
        assert!(m
            .improves_balance_ratio(&p, &sym(), Size::new(dec!(50)), Price::ONE, OrderSide::Buy)
            .unwrap());
    }

    #[test]
    fn test_balance_gate_accepts_ties() {
        let m = manager(RiskLimits::default());
        let p = portfolio(dec!(1000), dec!(1000));
        assert!(m
            .improves_balance_ratio(&p, &sym(), Size::ZERO, Price::ONE, OrderSide::Sell)
            .unwrap());
    }

    #[test]
    fn test_empty_quote_balance_is_infinite_ratio() {
        let m = manager(RiskLimits::default());
        let p = portfolio(dec!(1000), Decimal::ZERO);
        // Selling brings quote in: from infinite distance, always acceptable.
        assert!(m
            .improves_balance_ratio(&p, &sym(), Size::new(dec!(10)), Price::ONE, OrderSide::Sell)
            .unwrap());
        // Buying with quote at zero stays infinite: a tie.
        assert!(m
            .improves_balance_ratio(&p, &sym(), Size::ZERO, Price::ONE, OrderSide::Buy)
            .unwrap());
    }

    #[test]
    fn test_missing_limits_fail_closed() {
        let m = RiskManager::new();
        let p = portfolio(dec!(5000), dec!(15000));
        let decision = m.evaluate_order(&p, &sym(), Size::ONE, Price::ONE, OrderSide::Buy);
        assert_eq!(decision, RiskDecision::Reject(RejectReason::LimitsNotConfigured));
        assert!(m.recommended_spread(&p, &sym(), dec!(0.01), Price::ONE).is_err());
    }

    #[test]
    fn test_unparseable_symbol_fails_closed() {
        let m = RiskManager::new();
        let bad = Symbol::new("AB").unwrap();
        m.set_limits(&bad, RiskLimits::default()).unwrap();
        let p = Portfolio::default();
        let decision = m.evaluate_order(&p, &bad, Size::ONE, Price::ONE, OrderSide::Buy);
        assert_eq!(decision.reject_reason().map(RejectReason::label), Some("evaluation_failed"));
    }

    #[test]
    fn test_recommended_spread_components() {
        let m = manager(RiskLimits {
            min_spread: dec!(0.02),
            ..RiskLimits::default()
        });
        // ratio 0.5, imbalance 0.5
        let p = portfolio(dec!(5000), dec!(10000));
        let spread = m
            .recommended_spread(&p, &sym(), dec!(0.01), Price::ONE)
            .unwrap();
        assert_eq!(spread, dec!(0.05)); // 0.02 + 0.02 + 0.01

        let with_floor = m
            .recommended_spread_with_floor(&p, &sym(), dec!(0.01), Price::ONE, Some(dec!(0.03)))
            .unwrap();
        assert_eq!(with_floor, dec!(0.065)); // 0.03 + 0.02 + 0.015
    }

    #[test]
    fn test_recommended_spread_never_below_floor() {
        let m = manager(RiskLimits {
            min_spread: dec!(0.02),
            ..RiskLimits::default()
        });
        let p = portfolio(dec!(1000), dec!(1000));
        let spread = m
            .recommended_spread(&p, &sym(), Decimal::ZERO, Price::ONE)
            .unwrap();
        assert_eq!(spread, dec!(0.02));

        // Empty quote wallet counts as ratio 0: full imbalance.
        let empty = portfolio(dec!(1000), Decimal::ZERO);
        let spread = m
            .recommended_spread(&empty, &sym(), Decimal::ZERO, Price::ONE)
            .unwrap();
        assert_eq!(spread, dec!(0.04));
    }

    #[test]
    fn test_dust_quote_balance_fails_closed() {
        let m = manager(RiskLimits::default());
        // 1e11 base against 1e-18 quote: the ratio does not fit in a Decimal.
        let p = portfolio(dec!(100000000000), dec!(0.000000000000000001));

        let decision = m.evaluate_order(&p, &sym(), Size::ONE, Price::ONE, OrderSide::Sell);
        assert_eq!(
            decision.reject_reason().map(RejectReason::label),
            Some("evaluation_failed")
        );
        assert!(!m.check_order(&p, &sym(), Size::ONE, Price::ONE, OrderSide::Sell));
        assert!(matches!(
            m.recommended_spread(&p, &sym(), dec!(0.01), Price::ONE),
            Err(RiskError::Arithmetic(_))
        ));
    }

    #[test]
    fn test_set_limits_validates() {
        let m = RiskManager::new();
        let bad = RiskLimits {
            target_balance_ratio: dec!(-1),
            ..RiskLimits::default()
        };
        assert!(m.set_limits(&sym(), bad).is_err());
        assert!(m.limits(&sym()).is_none());

        m.set_limits(&sym(), RiskLimits::default()).unwrap();
        assert!(m.remove_limits(&sym()).is_some());
        assert!(m.limits(&sym()).is_none());
    }

    #[test]
    fn test_from_config_loads_symbols() {
        let mut config = RiskConfig::default();
        config.symbols.insert(
            "kas-usdt".to_string(),
            RiskLimits {
                max_position: dec!(7),
                ..RiskLimits::default()
            },
        );
        let m = RiskManager::from_config(&config).unwrap();
        assert_eq!(m.limits(&sym()).unwrap().max_position, dec!(7));
    }
}
