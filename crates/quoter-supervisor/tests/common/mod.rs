//! Shared fixtures for supervisor integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use quoter_core::{Price, Size, Symbol};
use quoter_exchange::{synthetic_book, DynExchangeClient, PaperExchange};
use quoter_mm::MakerConfig;
use quoter_risk::{RiskConfig, RiskManager};
use quoter_supervisor::JobSupervisor;
use quoter_wallet::WalletConfig;

pub const KAS_USDT: &str = "KAS-USDT";

pub fn symbol(raw: &str) -> Symbol {
    Symbol::new(raw).unwrap()
}

/// Paper venue with a KAS-USDT book around 1.0 and a balanced wallet.
pub fn venue() -> Arc<PaperExchange> {
    let venue = Arc::new(PaperExchange::new());
    venue.set_book(
        &symbol(KAS_USDT),
        synthetic_book(Price::new(dec!(1)), dec!(0.001), 5, Size::new(dec!(5000))),
    );
    venue.set_balance("KAS", dec!(10000));
    venue.set_balance("USDT", dec!(10000));
    venue
}

/// Fast loop timings for paused-clock tests.
pub fn maker_config() -> MakerConfig {
    MakerConfig {
        poll_interval_ms: 10,
        error_backoff_ms: 20,
        request_timeout_ms: 1_000,
        stop_grace_ms: 500,
        ..MakerConfig::default()
    }
}

pub fn supervisor(venue: &Arc<PaperExchange>, maker: MakerConfig) -> JobSupervisor {
    let exchange: DynExchangeClient = venue.clone();
    JobSupervisor::new(
        exchange,
        Arc::new(RiskManager::new()),
        maker,
        WalletConfig::default(),
        RiskConfig::default(),
    )
    .unwrap()
}

/// Let the loops run for `ms` of (paused) time.
pub async fn run_for(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
