//! Orders as the market-making loop sees them: the request sent to the
//! venue, and the record kept once the venue acknowledges it.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Price, Size};
use crate::error::Result;
use crate::market::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// Position delta of a `quantity` trade on this side: +q buys, -q sells.
    pub fn signed(&self, quantity: Size) -> Decimal {
        match self {
            Self::Buy => quantity.inner(),
            Self::Sell => -quantity.inner(),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quotes always rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Sent, no venue answer yet.
    Pending,
    /// Venue acknowledged; assumed resting or filled.
    Accepted,
    Rejected,
}

// ============================================================================
// Identifiers
// ============================================================================

/// Client-side id attached to every submission: `qtr_{unix_ms}_{8 hex}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    pub fn new() -> Self {
        let mut suffix = Uuid::new_v4().simple().to_string();
        suffix.truncate(8);
        Self(format!("qtr_{}_{suffix}", Utc::now().timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Venue-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&ClientOrderId> for OrderId {
    /// Fallback id for venues that acknowledge without assigning one.
    fn from(cloid: &ClientOrderId) -> Self {
        Self(cloid.0.clone())
    }
}

// ============================================================================
// Request / record
// ============================================================================

/// Order submission sent to the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    #[serde(default)]
    pub order_type: OrderType,
    pub price: Price,
    pub quantity: Size,
    pub client_order_id: ClientOrderId,
}

impl OrderRequest {
    /// Limit order with a fresh client order id.
    pub fn limit(symbol: Symbol, side: OrderSide, price: Price, quantity: Size) -> Self {
        Self {
            symbol,
            side,
            order_type: OrderType::Limit,
            price,
            quantity,
            client_order_id: ClientOrderId::new(),
        }
    }

    /// q × p in the quote asset.
    pub fn notional(&self) -> Result<Decimal> {
        self.quantity.notional(self.price)
    }

    /// Price and quantity must both be strictly positive.
    pub fn validate(&self) -> Result<()> {
        Price::try_positive(self.price.inner())?;
        Size::try_positive(self.quantity.inner())?;
        Ok(())
    }
}

/// An order tracked by a market-making job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub client_order_id: ClientOrderId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub price: Price,
    pub quantity: Size,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Record for a request about to be sent, keyed by its client order id.
    pub fn pending(request: &OrderRequest) -> Self {
        Self::from_request(
            OrderId::from(&request.client_order_id),
            request,
            OrderStatus::Pending,
        )
    }

    pub fn from_request(id: OrderId, request: &OrderRequest, status: OrderStatus) -> Self {
        Self {
            id,
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            price: request.price,
            quantity: request.quantity,
            status,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// Venue accepted the order under `id`. Ignored unless pending.
    pub fn accept(&mut self, id: OrderId) {
        if self.is_pending() {
            self.id = id;
            self.status = OrderStatus::Accepted;
        }
    }

    /// Venue refused the order. Ignored unless pending.
    pub fn reject(&mut self) {
        if self.is_pending() {
            self.status = OrderStatus::Rejected;
        }
    }
}
