//! Market-making loop for a single job.
//!
//! Each iteration:
//! 1. Check the stop flag
//! 2. Resync wallet and prune active orders (first iteration, then every
//!    `balance_sync_every` iterations)
//! 3. Fetch the order book
//! 4. Quote through the engine (risk + wallet gates)
//! 5. Submit admitted orders, bracketing each with a balance reservation
//! 6. Publish status, sleep
//!
//! Failures are caught per iteration: the status records them and the loop
//! backs off. With `max_consecutive_errors` set, the job fails once the
//! streak reaches that count.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use quoter_core::{Order, OrderId, OrderRequest, OrderSide, Symbol};
use quoter_exchange::{DynExchangeClient, ExchangeError, ExchangeResult};
use quoter_mm::{MakerConfig, QuoteEngine, QuoteOutcome};
use quoter_risk::{Portfolio, RiskManager};
use quoter_telemetry::Metrics;
use quoter_wallet::{WalletConfig, WalletError};

use crate::error::LoopError;
use crate::job::{JobId, JobState, JobStatus, StopSignal};

/// Await `fut` under a deadline; a missed deadline is `ExchangeError::Timeout`.
async fn with_timeout<T, F>(operation: &'static str, timeout: Duration, fut: F) -> Result<T, LoopError>
where
    F: Future<Output = ExchangeResult<T>>,
{
    let started = Instant::now();
    let result = tokio::time::timeout(timeout, fut).await;
    Metrics::exchange_latency(operation, started.elapsed().as_secs_f64() * 1000.0);
    match result {
        Ok(inner) => inner.map_err(LoopError::from),
        Err(_) => Err(ExchangeError::Timeout {
            operation,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
        .into()),
    }
}

/// How the loop body ended.
enum Exit {
    Stopped,
    Failed(String),
}

/// One job's market-making loop. Sole writer of its portfolio.
pub struct MarketMakingLoop {
    id: JobId,
    symbol: Symbol,
    exchange: DynExchangeClient,
    risk: Arc<RiskManager>,
    config: MakerConfig,
    engine: QuoteEngine,
    portfolio: Portfolio,
    active_orders: HashMap<OrderId, Order>,
    status: Arc<RwLock<JobStatus>>,
    stop: Arc<StopSignal>,
    iteration: u64,
    consecutive_errors: u32,
    orders_submitted: u64,
    orders_rejected: u64,
    needs_sync: bool,
}

impl MarketMakingLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: JobId,
        symbol: Symbol,
        spread_override: Option<Decimal>,
        exchange: DynExchangeClient,
        risk: Arc<RiskManager>,
        config: MakerConfig,
        wallet_config: &WalletConfig,
        status: Arc<RwLock<JobStatus>>,
        stop: Arc<StopSignal>,
    ) -> Self {
        let engine = QuoteEngine::new(symbol.clone(), &config, spread_override);
        Self {
            id,
            symbol,
            exchange,
            risk,
            config,
            engine,
            portfolio: Portfolio::new(wallet_config),
            active_orders: HashMap::new(),
            status,
            stop,
            iteration: 0,
            consecutive_errors: 0,
            orders_submitted: 0,
            orders_rejected: 0,
            needs_sync: true,
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.config.request_timeout_ms)
    }

    /// Run until stopped or failed. The final state is written to the status.
    pub async fn run(mut self) {
        {
            let mut status = self.status.write();
            if status.state == JobState::Created {
                status.state = JobState::Running;
            }
            status.last_update = Utc::now();
        }
        Metrics::job_transition(JobState::Running.as_str());
        info!(job_id = %self.id, symbol = %self.symbol, "Market-making loop started");

        let exit = loop {
            if self.stop.is_requested() {
                break Exit::Stopped;
            }

            match self.iterate().await {
                Ok(()) => {
                    self.consecutive_errors = 0;
                    self.publish(None);
                    self.stop
                        .sleep(Duration::from_millis(self.config.poll_interval_ms))
                        .await;
                }
                Err(e) => {
                    self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                    Metrics::loop_error(self.symbol.as_str(), e.kind());
                    warn!(
                        job_id = %self.id,
                        symbol = %self.symbol,
                        error = %e,
                        consecutive_errors = self.consecutive_errors,
                        "Iteration failed"
                    );
                    self.publish(Some(&e));

                    if let Some(max) = self.config.max_consecutive_errors {
                        if self.consecutive_errors >= max {
                            break Exit::Failed(format!(
                                "{max} consecutive errors, last: {e}"
                            ));
                        }
                    }
                    self.stop
                        .sleep(Duration::from_millis(self.config.error_backoff_ms))
                        .await;
                }
            }
        };

        if matches!(exit, Exit::Stopped) && self.config.cancel_on_stop {
            self.cancel_active_orders().await;
        }

        let final_state = match &exit {
            Exit::Stopped => JobState::Stopped,
            Exit::Failed(_) => JobState::Failed,
        };
        {
            let mut status = self.status.write();
            status.state = final_state;
            status.last_update = Utc::now();
            status.active_order_count = self.active_orders.len();
            if let Exit::Failed(reason) = &exit {
                status.last_error = Some(reason.clone());
            }
        }
        Metrics::job_transition(final_state.as_str());

        match exit {
            Exit::Stopped => info!(
                job_id = %self.id,
                symbol = %self.symbol,
                iterations = self.iteration,
                orders_submitted = self.orders_submitted,
                "Market-making loop stopped"
            ),
            Exit::Failed(reason) => error!(
                job_id = %self.id,
                symbol = %self.symbol,
                reason = %reason,
                "Market-making loop failed"
            ),
        }
    }

    async fn iterate(&mut self) -> Result<(), LoopError> {
        if self.needs_sync {
            self.sync_with_venue().await?;
            self.needs_sync = false;
        }

        let book = with_timeout(
            "get_order_book",
            self.request_timeout(),
            self.exchange.get_order_book(&self.symbol, self.config.depth),
        )
        .await?;

        let outcome = self.engine.compute(&book, &self.portfolio, &*self.risk)?;
        self.record_outcome(&outcome);

        for request in outcome.orders {
            self.submit(request).await?;
        }

        self.iteration += 1;
        let every = self.config.balance_sync_every;
        if every > 0 && self.iteration % every == 0 {
            self.needs_sync = true;
        }
        Ok(())
    }

    /// Resync wallet totals and drop active orders the venue no longer lists.
    async fn sync_with_venue(&mut self) -> Result<(), LoopError> {
        let timeout = self.request_timeout();
        let account =
            with_timeout("get_account_info", timeout, self.exchange.get_account_info()).await?;
        self.portfolio.wallet.sync_from(&account.balances);

        let open = with_timeout(
            "get_open_orders",
            timeout,
            self.exchange.get_open_orders(&self.symbol),
        )
        .await?;
        let open_ids: HashSet<&OrderId> = open.iter().map(|o| &o.id).collect();
        let before = self.active_orders.len();
        self.active_orders.retain(|id, _| open_ids.contains(id));
        let pruned = before - self.active_orders.len();
        if pruned > 0 {
            debug!(job_id = %self.id, pruned, "Pruned orders no longer open");
        }
        Ok(())
    }

    fn record_outcome(&self, outcome: &QuoteOutcome) {
        if let Some(snapshot) = &outcome.snapshot {
            Metrics::quoted_spread(self.symbol.as_str(), snapshot.spread_fraction);
        }
        for skipped in &outcome.skipped {
            debug!(
                job_id = %self.id,
                side = %skipped.side,
                price = %skipped.price,
                reason = ?skipped.reason,
                "Quote skipped"
            );
            Metrics::order_skipped(
                self.symbol.as_str(),
                &skipped.side.to_string(),
                skipped.reason.label(),
            );
        }
    }

    /// Reserve, submit, release; on acceptance settle the assumed fill.
    ///
    /// The reservation only spans the `place_order` await. Acceptance settles
    /// the fill into the totals, so nothing stays reserved afterwards.
    async fn submit(&mut self, request: OrderRequest) -> Result<(), LoopError> {
        let pair = self.portfolio.wallet.split(&self.symbol)?;
        let (asset, amount) = match request.side {
            OrderSide::Buy => (pair.quote, request.notional().map_err(WalletError::from)?),
            OrderSide::Sell => (pair.base, request.quantity.inner()),
        };
        let side = request.side.to_string();

        if !self.portfolio.wallet.reserve(&asset, amount) {
            Metrics::order_skipped(self.symbol.as_str(), &side, "reservation_failed");
            return Ok(());
        }

        let mut order = Order::pending(&request);
        let result = with_timeout(
            "place_order",
            self.request_timeout(),
            self.exchange.place_order(request.clone()),
        )
        .await;
        self.portfolio.wallet.release(&asset, amount);
        let ack = result?;

        if !ack.accepted {
            order.reject();
            self.orders_rejected += 1;
            Metrics::order_rejected(self.symbol.as_str(), &side);
            debug!(
                job_id = %self.id,
                cloid = %request.client_order_id,
                status = ?order.status,
                reason = ack.reason.as_deref().unwrap_or("unspecified"),
                "Order rejected by venue"
            );
            return Ok(());
        }

        let order_id = ack.order_id.unwrap_or_else(|| order.id.clone());
        order.accept(order_id.clone());
        self.portfolio.wallet.apply_fill(
            request.side,
            &request.symbol,
            request.quantity,
            request.price,
        )?;
        self.portfolio
            .positions
            .update(&request.symbol, request.quantity, request.price, request.side);
        self.active_orders.insert(order_id.clone(), order);
        self.orders_submitted += 1;

        Metrics::order_submitted(self.symbol.as_str(), &side);
        Metrics::net_position(
            self.symbol.as_str(),
            self.portfolio.positions.get(&self.symbol),
        );
        debug!(
            job_id = %self.id,
            order_id = %order_id,
            side = %side,
            price = %request.price,
            quantity = %request.quantity,
            "Order accepted"
        );
        Ok(())
    }

    /// Best-effort cancel of every tracked order. Failures are logged only.
    async fn cancel_active_orders(&mut self) {
        let timeout = self.request_timeout();
        let ids: Vec<OrderId> = self.active_orders.keys().cloned().collect();
        for order_id in ids {
            match with_timeout(
                "cancel_order",
                timeout,
                self.exchange.cancel_order(&self.symbol, &order_id),
            )
            .await
            {
                Ok(true) => {
                    self.active_orders.remove(&order_id);
                }
                Ok(false) => {
                    debug!(job_id = %self.id, order_id = %order_id, "Cancel not confirmed");
                }
                Err(e) => {
                    warn!(job_id = %self.id, order_id = %order_id, error = %e, "Cancel failed");
                }
            }
        }
    }

    /// Write loop counters and health into the shared status.
    fn publish(&self, error: Option<&LoopError>) {
        let mut status = self.status.write();
        status.last_update = Utc::now();
        status.active_order_count = self.active_orders.len();
        status.iterations = self.iteration;
        status.orders_submitted = self.orders_submitted;
        status.orders_rejected = self.orders_rejected;
        status.consecutive_errors = self.consecutive_errors;
        status.net_position = self.portfolio.positions.get(&self.symbol);
        match error {
            None => status.degraded = false,
            Some(e) => {
                if e.is_exchange() {
                    status.degraded = true;
                }
                status.last_error = Some(e.to_string());
            }
        }
    }
}
