//! Venue capability trait.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quoter_core::{Order, OrderBook, OrderId, OrderRequest, Symbol};

use crate::error::ExchangeResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Venue acknowledgement of an order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderAck {
    pub accepted: bool,
    /// Venue order id, present when accepted.
    pub order_id: Option<OrderId>,
    /// Venue-supplied rejection text.
    #[serde(default)]
    pub reason: Option<String>,
}

impl PlaceOrderAck {
    #[must_use]
    pub fn accepted(order_id: OrderId) -> Self {
        Self {
            accepted: true,
            order_id: Some(order_id),
            reason: None,
        }
    }

    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            order_id: None,
            reason: Some(reason.into()),
        }
    }
}

/// Account balances reported by the venue (asset -> total).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub balances: HashMap<String, Decimal>,
}

/// Capabilities the market-making loop needs from a venue.
///
/// Implementations must be shareable across jobs.
pub trait ExchangeClient: Send + Sync {
    /// Order book for `symbol`, at most `depth` levels per side, best first.
    fn get_order_book(&self, symbol: &Symbol, depth: usize)
        -> BoxFuture<'_, ExchangeResult<OrderBook>>;

    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, ExchangeResult<PlaceOrderAck>>;

    /// Returns whether the venue confirmed the cancel.
    fn cancel_order(&self, symbol: &Symbol, order_id: &OrderId)
        -> BoxFuture<'_, ExchangeResult<bool>>;

    fn get_open_orders(&self, symbol: &Symbol) -> BoxFuture<'_, ExchangeResult<Vec<Order>>>;

    fn get_account_info(&self) -> BoxFuture<'_, ExchangeResult<AccountInfo>>;
}

/// Arc wrapper for ExchangeClient trait objects.
pub type DynExchangeClient = Arc<dyn ExchangeClient>;
