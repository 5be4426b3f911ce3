//! Quote price calculation engine.
//!
//! Computes bid/ask candidates from:
//! - Book mid price (best bid + best ask) / 2
//! - Spread fraction recommended by the risk seam
//! - Optional tick rounding (bids floor, asks ceil)
//!
//! Each candidate must then pass risk admission and wallet affordability.

use rust_decimal::Decimal;
use tracing::{debug, trace};

use quoter_core::{OrderBook, OrderRequest, OrderSide, Price, Size, Symbol};
use quoter_risk::{Portfolio, RejectReason, RiskDecision, RiskManager, RiskResult};
use quoter_wallet::WalletError;

use crate::config::MakerConfig;
use crate::error::{QuoteError, QuoteResult};
use crate::volatility::MidPriceWindow;

// ============================================================================
// QuoteRisk
// ============================================================================

/// Risk services the quote engine depends on.
pub trait QuoteRisk {
    /// Spread fraction for one side. `floor` replaces the symbol's `min_spread`.
    fn recommended_spread(
        &self,
        portfolio: &Portfolio,
        symbol: &Symbol,
        volatility: Decimal,
        mark_price: Price,
        floor: Option<Decimal>,
    ) -> RiskResult<Decimal>;

    fn evaluate_order(
        &self,
        portfolio: &Portfolio,
        symbol: &Symbol,
        quantity: Size,
        price: Price,
        side: OrderSide,
    ) -> RiskDecision;

    fn check_order(
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
}

impl QuoteRisk for RiskManager {
    fn recommended_spread(
        &self,
        portfolio: &Portfolio,
        symbol: &Symbol,
        volatility: Decimal,
        mark_price: Price,
        floor: Option<Decimal>,
    ) -> RiskResult<Decimal> {
        self.recommended_spread_with_floor(portfolio, symbol, volatility, mark_price, floor)
    }

    fn evaluate_order(
        &self,
        portfolio: &Portfolio,
        symbol: &Symbol,
        quantity: Size,
        price: Price,
        side: OrderSide,
    ) -> RiskDecision {
        RiskManager::evaluate_order(self, portfolio, symbol, quantity, price, side)
    }
}

// ============================================================================
// Output types
// ============================================================================

/// Market state behind one set of quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteSnapshot {
    pub mid: Price,
    pub volatility: Decimal,
    /// Per-side spread as a fraction of mid.
    pub spread_fraction: Decimal,
    pub bid: Price,
    pub ask: Price,
}

impl QuoteSnapshot {
    /// ask - bid.
    pub fn width(&self) -> Decimal {
        self.ask.inner() - self.bid.inner()
    }
}

/// Why a candidate order was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Risk(RejectReason),
    /// Wallet cannot fund the order or the gas reserve is short.
    InsufficientBalance(String),
    /// Spread pushed the price to zero or below.
    NonPositivePrice,
}

impl SkipReason {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Risk(reason) => reason.label(),
            Self::InsufficientBalance(_) => "insufficient_balance",
            Self::NonPositivePrice => "non_positive_price",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedQuote {
    pub side: OrderSide,
    pub price: Price,
    pub reason: SkipReason,
}

/// Result of one quote computation.
#[derive(Debug, Clone, Default)]
pub struct QuoteOutcome {
    /// `None` when the book was one-sided.
    pub snapshot: Option<QuoteSnapshot>,
    /// Orders that passed every gate, buy first.
    pub orders: Vec<OrderRequest>,
    pub skipped: Vec<SkippedQuote>,
}

// ============================================================================
// QuoteEngine
// ============================================================================

/// Per-job quote engine. Owns the job's mid-price window.
#[derive(Debug, Clone)]
pub struct QuoteEngine {
    symbol: Symbol,
    base_order_size: Size,
    tick_size: Option<Price>,
    spread_floor: Option<Decimal>,
    window: MidPriceWindow,
}

impl QuoteEngine {
    pub fn new(symbol: Symbol, config: &MakerConfig, spread_floor: Option<Decimal>) -> Self {
        Self {
            symbol,
            base_order_size: Size::new(config.base_order_size),
            tick_size: config.tick_size.map(Price::new),
            spread_floor,
            window: MidPriceWindow::new(config.volatility_window),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn window(&self) -> &MidPriceWindow {
        &self.window
    }

    pub fn volatility(&self) -> Decimal {
        self.window.volatility()
    }

    /// Compute admissible quotes for the current book.
    ///
    /// A one-sided book yields no orders and leaves the window untouched.
    /// Only a failed spread recommendation or a price overflow is an error.
    pub fn compute<R>(
        &mut self,
        book: &OrderBook,
        portfolio: &Portfolio,
        risk: &R,
    ) -> QuoteResult<QuoteOutcome>
    where
        R: QuoteRisk + ?Sized,
    {
        let Some(mid) = book.mid() else {
            debug!(symbol = %self.symbol, "One-sided order book, no quotes");
            return Ok(QuoteOutcome::default());
        };

        self.window.push(mid);
        let volatility = self.window.volatility();
        let spread_fraction =
            risk.recommended_spread(portfolio, &self.symbol, volatility, mid, self.spread_floor)?;

        let overflow = || QuoteError::Overflow(format!("mid {mid} spread {spread_fraction}"));
        let offset = mid
            .inner()
            .checked_mul(spread_fraction)
            .ok_or_else(overflow)?;
        let mut bid = Price::new(mid.inner().checked_sub(offset).ok_or_else(overflow)?);
        let mut ask = Price::new(mid.inner().checked_add(offset).ok_or_else(overflow)?);
        if let Some(tick) = self.tick_size {
            bid = bid.floor_to_tick(tick);
            ask = ask.ceil_to_tick(tick);
        }

        let snapshot = QuoteSnapshot {
            mid,
            volatility,
            spread_fraction,
            bid,
            ask,
        };
        trace!(
            symbol = %self.symbol,
            mid = %mid,
            volatility = %volatility,
            spread = %spread_fraction,
            bid = %bid,
            ask = %ask,
            "Quote computed"
        );

        let mut outcome = QuoteOutcome {
            snapshot: Some(snapshot),
            ..QuoteOutcome::default()
        };

        for (side, price) in [(OrderSide::Buy, bid), (OrderSide::Sell, ask)] {
            match self.gate(portfolio, risk, side, price) {
                Ok(()) => outcome.orders.push(OrderRequest::limit(
                    self.symbol.clone(),
                    side,
                    price,
                    self.base_order_size,
                )),
                Err(reason) => outcome.skipped.push(SkippedQuote {
                    side,
                    price,
                    reason,
                }),
            }
        }

        Ok(outcome)
    }

    fn gate<R>(
        &self,
        portfolio: &Portfolio,
        risk: &R,
        side: OrderSide,
        price: Price,
    ) -> Result<(), SkipReason>
    where
        R: QuoteRisk + ?Sized,
    {
        if !price.is_positive() {
            return Err(SkipReason::NonPositivePrice);
        }

        let quantity = self.base_order_size;
        if let RiskDecision::Reject(reason) =
            risk.evaluate_order(portfolio, &self.symbol, quantity, price, side)
        {
            return Err(SkipReason::Risk(reason));
        }

        portfolio
            .wallet
            .check_order(side, &self.symbol, quantity, price)
            .map_err(|e: WalletError| {
                debug!(symbol = %self.symbol, side = %side, error = %e, "Quote not affordable");
                SkipReason::InsufficientBalance(e.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quoter_core::BookLevel;
    use quoter_risk::{RiskError, RiskLimits};
    use rust_decimal_macros::dec;

    /// Fixed spread, accepts everything.
    struct FixedSpread(Decimal);

    impl QuoteRisk for FixedSpread {
        fn recommended_spread(
            &self,
            _portfolio: &Portfolio,
            _symbol: &Symbol,
            _volatility: Decimal,
            _mark_price: Price,
            floor: Option<Decimal>,
        ) -> RiskResult<Decimal> {
            Ok(floor.unwrap_or(self.0))
        }

        fn evaluate_order(
            &self,
            _portfolio: &Portfolio,
            _symbol: &Symbol,
            _quantity: Size,
            _price: Price,
            _side: OrderSide,
        ) -> RiskDecision {
            RiskDecision::Accept
        }
    }

    struct Unconfigured;

    impl QuoteRisk for Unconfigured {
        fn recommended_spread(
            &self,
            _portfolio: &Portfolio,
            symbol: &Symbol,
            _volatility: Decimal,
            _mark_price: Price,
            _floor: Option<Decimal>,
        ) -> RiskResult<Decimal> {
            Err(RiskError::LimitsNotConfigured(symbol.to_string()))
        }

        fn evaluate_order(
            &self,
            _portfolio: &Portfolio,
            _symbol: &Symbol,
            _quantity: Size,
            _price: Price,
            _side: OrderSide,
        ) -> RiskDecision {
            RiskDecision::Reject(RejectReason::LimitsNotConfigured)
        }
    }

    fn btc() -> Symbol {
        Symbol::new("BTC-USDT").unwrap()
    }

    fn level(price: Decimal, size: Decimal) -> BookLevel {
        BookLevel::new(Price::new(price), Size::new(size))
    }

    fn sample_book() -> OrderBook {
        OrderBook::new(
            vec![level(dec!(50000), dec!(1)), level(dec!(49900), dec!(2))],
            vec![level(dec!(50100), dec!(1)), level(dec!(50200), dec!(2))],
        )
    }

    fn funded_portfolio() -> Portfolio {
        let mut p = Portfolio::default();
        p.wallet.update_balance("KAS", dec!(10));
        p.wallet.update_balance("BTC", dec!(1));
        p.wallet.update_balance("USDT", dec!(10000));
        p
    }

    fn engine(floor: Option<Decimal>) -> QuoteEngine {
        let config = MakerConfig {
            base_order_size: dec!(0.1),
            ..MakerConfig::default()
        };
        QuoteEngine::new(btc(), &config, floor)
    }

    #[test]
    fn test_two_sided_quote_with_fixed_spread() {
        let mut engine = engine(None);
        let outcome = engine
            .compute(&sample_book(), &funded_portfolio(), &FixedSpread(dec!(0.02)))
            .unwrap();

        let snap = outcome.snapshot.unwrap();
        assert_eq!(snap.mid.inner(), dec!(50050));
        assert_eq!(snap.bid.inner(), dec!(49049));
        assert_eq!(snap.ask.inner(), dec!(51051));
        assert_eq!(snap.width(), dec!(2) * dec!(50050) * dec!(0.02));
        assert_eq!(snap.volatility, dec!(0.01));

        assert_eq!(outcome.orders.len(), 2);
        assert_eq!(outcome.orders[0].side, OrderSide::Buy);
        assert_eq!(outcome.orders[1].side, OrderSide::Sell);
        assert!(outcome.orders[1].price > outcome.orders[0].price);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_empty_book_yields_nothing() {
        let mut engine = engine(None);
        let book = OrderBook::new(vec![], sample_book().asks);
        let outcome = engine
            .compute(&book, &funded_portfolio(), &FixedSpread(dec!(0.02)))
            .unwrap();
        assert!(outcome.snapshot.is_none());
        assert!(outcome.orders.is_empty());
        assert!(engine.window().is_empty());
    }

    #[test]
    fn test_spread_floor_override() {
        let mut engine = engine(Some(dec!(0.05)));
        let outcome = engine
            .compute(&sample_book(), &funded_portfolio(), &FixedSpread(dec!(0.02)))
            .unwrap();
        assert_eq!(outcome.snapshot.unwrap().spread_fraction, dec!(0.05));
    }

    #[test]
    fn test_tick_rounding_widens() {
        let config = MakerConfig {
            base_order_size: dec!(0.1),
            tick_size: Some(dec!(10)),
            ..MakerConfig::default()
        };
        let mut engine = QuoteEngine::new(btc(), &config, None);
        let book = OrderBook::new(
            vec![level(dec!(50000), dec!(1))],
            vec![level(dec!(50001), dec!(1))],
        );
        let outcome = engine
            .compute(&book, &funded_portfolio(), &FixedSpread(dec!(0.001)))
            .unwrap();
        let snap = outcome.snapshot.unwrap();
        // mid 50000.5, offset 50.0005
        assert_eq!(snap.bid.inner(), dec!(49950));
        assert_eq!(snap.ask.inner(), dec!(50060));
    }

    #[test]
    fn test_wallet_gate_drops_unaffordable_side() {
        let mut engine = engine(None);
        let mut p = funded_portfolio();
        p.wallet.update_balance("USDT", dec!(100));
        let outcome = engine
            .compute(&sample_book(), &p, &FixedSpread(dec!(0.02)))
            .unwrap();
        assert_eq!(outcome.orders.len(), 1);
        assert_eq!(outcome.orders[0].side, OrderSide::Sell);
        assert_eq!(outcome.skipped[0].side, OrderSide::Buy);
        assert_eq!(outcome.skipped[0].reason.label(), "insufficient_balance");
    }

    #[test]
    fn test_spread_failure_is_error() {
        let mut engine = engine(None);
        let result = engine.compute(&sample_book(), &funded_portfolio(), &Unconfigured);
        assert!(result.is_err());
    }

    #[test]
    fn test_price_overflow_is_error() {
        let mut engine = engine(None);
        let result = engine.compute(&sample_book(), &funded_portfolio(), &FixedSpread(Decimal::MAX));
        assert!(matches!(result, Err(QuoteError::Overflow(_))));
    }

    #[test]
    fn test_dust_quote_wallet_is_error_not_panic() {
        let risk = RiskManager::new();
        risk.set_limits(&btc(), RiskLimits::default()).unwrap();
        let mut p = Portfolio::default();
        p.wallet.update_balance("BTC", dec!(100000000000));
        p.wallet.update_balance("USDT", dec!(0.000000000000000001));

        let mut engine = engine(None);
        let result = engine.compute(&sample_book(), &p, &risk);
        assert!(matches!(
            result,
            Err(QuoteError::Spread(RiskError::Arithmetic(_)))
        ));
    }

    #[test]
    fn test_real_risk_quotes_toward_target_ratio() {
        let risk = RiskManager::new();
        risk.set_limits(
            &btc(),
            RiskLimits {
                min_spread: dec!(0.02),
                ..RiskLimits::default()
            },
        )
        .unwrap();

        // BTC value 50050 vs 10000 USDT: ratio far above 1, so only selling helps.
        let mut engine = engine(None);
        let outcome = engine
            .compute(&sample_book(), &funded_portfolio(), &risk)
            .unwrap();

        let snap = outcome.snapshot.unwrap();
        assert!(snap.spread_fraction >= dec!(0.02));
        assert!(snap.ask > snap.bid);
        assert_eq!(outcome.orders.len(), 1);
        assert_eq!(outcome.orders[0].side, OrderSide::Sell);
        assert_eq!(outcome.skipped[0].reason.label(), "balance_ratio");
    }

    #[test]
    fn test_window_grows_per_two_sided_book() {
        let mut engine = engine(None);
        let p = funded_portfolio();
        for _ in 0..3 {
            engine
                .compute(&sample_book(), &p, &FixedSpread(dec!(0.02)))
                .unwrap();
        }
        assert_eq!(engine.window().len(), 3);
        assert_eq!(engine.volatility(), Decimal::ZERO);
    }
}
