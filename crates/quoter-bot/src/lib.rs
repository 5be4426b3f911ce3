//! quoter market-making engine.
//!
//! Wires the configured venue, risk manager, and job supervisor together:
//! - Paper venue seeded from configuration
//! - One market-making job per configured symbol
//! - Periodic status reporting until shutdown

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
