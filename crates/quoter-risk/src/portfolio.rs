//! Ledgers owned by a single market-making job.

use quoter_position::PositionLedger;
use quoter_wallet::{WalletConfig, WalletLedger};

/// Position and wallet state of one job.
///
/// The job's loop is the only writer; the risk manager and quote engine
/// only ever see `&Portfolio`.
#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    pub positions: PositionLedger,
    pub wallet: WalletLedger,
}

impl Portfolio {
    pub fn new(wallet_config: &WalletConfig) -> Self {
        Self {
            positions: PositionLedger::new(),
            wallet: WalletLedger::new(wallet_config),
        }
    }
}
