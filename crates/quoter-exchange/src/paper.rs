//! In-memory paper venue.
//!
//! Orders rest until cancelled or explicitly filled through `fill_open_orders`.
//! Balances are whatever the test or operator set; fills are not settled here.
//! Failure injection (`fail_next`, `set_failing`) and artificial latency
//! (`set_latency`) exercise the loop's error and timeout handling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use quoter_core::{
    BookLevel, Order, OrderBook, OrderId, OrderRequest, OrderStatus, Price, Size, Symbol,
};

use crate::client::{AccountInfo, BoxFuture, ExchangeClient, PlaceOrderAck};
use crate::error::{ExchangeError, ExchangeResult};

/// Book of `depth` levels per side around `mid`, each `step` (a fraction of
/// mid) further out, with `size` at every level.
pub fn synthetic_book(mid: Price, step: Decimal, depth: usize, size: Size) -> OrderBook {
    let m = mid.inner();
    let levels = |sign: Decimal| {
        (1..=depth)
            .map(|i| {
                let offset = m * step * Decimal::from(i);
                BookLevel::new(Price::new(m + sign * offset), size)
            })
            .collect::<Vec<_>>()
    };
    OrderBook::new(levels(Decimal::NEGATIVE_ONE), levels(Decimal::ONE))
}

#[derive(Debug, Default)]
struct PaperState {
    books: HashMap<Symbol, OrderBook>,
    balances: HashMap<String, Decimal>,
    open_orders: HashMap<OrderId, Order>,
    placed: Vec<OrderRequest>,
    cancelled: Vec<OrderId>,
}

/// Paper trading venue.
#[derive(Debug, Default)]
pub struct PaperExchange {
    state: Mutex<PaperState>,
    next_order_id: AtomicU64,
    reject_orders: AtomicBool,
    failing: AtomicBool,
    fail_next: AtomicU32,
    latency: Mutex<Option<Duration>>,
}

impl PaperExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_book(&self, symbol: &Symbol, book: OrderBook) {
        self.state.lock().books.insert(symbol.clone(), book);
    }

    pub fn set_balance(&self, asset: &str, total: Decimal) {
        self.state
            .lock()
            .balances
            .insert(asset.to_ascii_uppercase(), total);
    }

    /// Refuse every order placement (calls still succeed).
    pub fn set_reject_orders(&self, reject: bool) {
        self.reject_orders.store(reject, Ordering::SeqCst);
    }

    /// Make every call fail with a communication error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail the next `n` calls, then recover.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Every request placed so far, accepted or not.
    pub fn placed_orders(&self) -> Vec<OrderRequest> {
        self.state.lock().placed.clone()
    }

    pub fn cancelled_orders(&self) -> Vec<OrderId> {
        self.state.lock().cancelled.clone()
    }

    pub fn open_order_count(&self) -> usize {
        self.state.lock().open_orders.len()
    }

    /// Mark every resting order for `symbol` as filled (removes them).
    pub fn fill_open_orders(&self, symbol: &Symbol) -> usize {
        let mut state = self.state.lock();
        let before = state.open_orders.len();
        state.open_orders.retain(|_, o| &o.symbol != symbol);
        before - state.open_orders.len()
    }

    /// Shared preamble: latency, then injected failures.
    async fn enter(&self, operation: &'static str) -> ExchangeResult<()> {
        let latency = *self.latency.lock();
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(ExchangeError::Communication(format!(
                "paper venue unavailable ({operation})"
            )));
        }

        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Err(ExchangeError::Communication(format!(
                "injected failure ({operation})"
            )));
        }

        trace!(operation, "Paper venue call");
        Ok(())
    }
}

impl ExchangeClient for PaperExchange {
    fn get_order_book(
        &self,
        symbol: &Symbol,
        depth: usize,
    ) -> BoxFuture<'_, ExchangeResult<OrderBook>> {
        let symbol = symbol.clone();
        Box::pin(async move {
            self.enter("get_order_book").await?;
            let mut book = self
                .state
                .lock()
                .books
                .get(&symbol)
                .cloned()
                .ok_or_else(|| ExchangeError::UnknownSymbol(symbol.to_string()))?;
            book.truncate(depth);
            Ok(book)
        })
    }

    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, ExchangeResult<PlaceOrderAck>> {
        Box::pin(async move {
            self.enter("place_order").await?;
            let mut state = self.state.lock();
            state.placed.push(request.clone());

            if let Err(e) = request.validate() {
                debug!(cloid = %request.client_order_id, error = %e, "Paper order invalid");
                return Ok(PlaceOrderAck::rejected(e.to_string()));
            }

            if self.reject_orders.load(Ordering::SeqCst) {
                debug!(cloid = %request.client_order_id, "Paper order rejected");
                return Ok(PlaceOrderAck::rejected("paper venue rejecting orders"));
            }

            let n = self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1;
            let order_id = OrderId::new(format!("paper-{n}"));
            let order = Order::from_request(order_id.clone(), &request, OrderStatus::Accepted);
            state.open_orders.insert(order_id.clone(), order);
            debug!(
                order_id = %order_id,
                side = %request.side,
                price = %request.price,
                quantity = %request.quantity,
                "Paper order accepted"
            );
            Ok(PlaceOrderAck::accepted(order_id))
        })
    }

    fn cancel_order(
        &self,
        _symbol: &Symbol,
        order_id: &OrderId,
    ) -> BoxFuture<'_, ExchangeResult<bool>> {
        let order_id = order_id.clone();
        Box::pin(async move {
            self.enter("cancel_order").await?;
            let mut state = self.state.lock();
            let removed = state.open_orders.remove(&order_id).is_some();
            if removed {
                state.cancelled.push(order_id);
            }
            Ok(removed)
        })
    }

    fn get_open_orders(&self, symbol: &Symbol) -> BoxFuture<'_, ExchangeResult<Vec<Order>>> {
        let symbol = symbol.clone();
        Box::pin(async move {
            self.enter("get_open_orders").await?;
            let state = self.state.lock();
            let mut orders: Vec<Order> = state
                .open_orders
                .values()
                .filter(|o| o.symbol == symbol)
                .cloned()
                .collect();
            orders.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(orders)
        })
    }

    fn get_account_info(&self) -> BoxFuture<'_, ExchangeResult<AccountInfo>> {
        Box::pin(async move {
            self.enter("get_account_info").await?;
            Ok(AccountInfo {
                balances: self.state.lock().balances.clone(),
            })
        })
    }
}
