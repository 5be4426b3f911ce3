//! Main application orchestration.
//!
//! Coordinates:
//! - Paper venue setup (balances, synthetic books)
//! - Risk manager seeded from configuration
//! - Job supervisor and the configured jobs
//! - Periodic status reporting and graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use quoter_core::{Price, Size, Symbol};
use quoter_exchange::{synthetic_book, DynExchangeClient, PaperExchange};
use quoter_risk::RiskManager;
use quoter_supervisor::{JobId, JobSupervisor, StopAllReport};
use quoter_telemetry::Metrics;

/// Main application.
pub struct Application {
    config: AppConfig,
    venue: Arc<PaperExchange>,
    supervisor: JobSupervisor,
}

impl Application {
    /// Validate configuration, seed the paper venue, and build the supervisor.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let venue = Arc::new(PaperExchange::new());
        for (asset, total) in &config.paper.balances {
            venue.set_balance(asset, *total);
        }
        for (raw, mid) in &config.paper.mids {
            let symbol = Symbol::new(raw).map_err(|e| AppError::Config(e.to_string()))?;
            venue.set_book(
                &symbol,
                synthetic_book(
                    Price::new(*mid),
                    config.paper.book_step,
                    config.maker.depth,
                    Size::new(config.paper.level_size),
                ),
            );
        }

        let risk = Arc::new(RiskManager::from_config(&config.risk)?);
        let exchange: DynExchangeClient = venue.clone();
        let supervisor = JobSupervisor::new(
            exchange,
            risk,
            config.maker.clone(),
            config.wallet.clone(),
            config.risk.clone(),
        )?;

        Ok(Self {
            config,
            venue,
            supervisor,
        })
    }

    pub fn supervisor(&self) -> &JobSupervisor {
        &self.supervisor
    }

    pub fn venue(&self) -> &Arc<PaperExchange> {
        &self.venue
    }

    /// Start every configured job. Stops at the first failure.
    pub fn start_jobs(&self) -> AppResult<Vec<JobId>> {
        let mut ids = Vec::with_capacity(self.config.jobs.len());
        for job in &self.config.jobs {
            let id = self.supervisor.start_job(&job.symbol, job.spread_override)?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Log one line per job.
    pub fn report_statuses(&self) {
        for (id, status) in self.supervisor.list_statuses() {
            info!(
                job_id = %id,
                symbol = %status.symbol,
                state = %status.state,
                degraded = status.degraded,
                iterations = status.iterations,
                orders_submitted = status.orders_submitted,
                orders_rejected = status.orders_rejected,
                active_orders = status.active_order_count,
                net_position = %status.net_position,
                last_error = status.last_error.as_deref().unwrap_or(""),
                "Job status"
            );
        }
    }

    /// Stop every job and log the outcome.
    pub async fn shutdown(&self) -> StopAllReport {
        let report = self.supervisor.stop_all().await;
        for failure in &report.errors {
            warn!(job_id = %failure.job_id, error = %failure.error, "Job did not stop cleanly");
        }
        report
    }

    /// Start the configured jobs and run until ctrl-c.
    pub async fn run(self) -> AppResult<()> {
        let ids = self.start_jobs()?;
        info!(jobs = ids.len(), "Jobs started");

        let period = Duration::from_secs(self.config.status_interval_secs.max(1));
        let reporting = self.config.status_interval_secs > 0;
        let mut status_interval = tokio::time::interval(period);
        // First tick completes immediately.
        status_interval.tick().await;

        loop {
            tokio::select! {
                _ = status_interval.tick(), if reporting => {
                    self.report_statuses();
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        let report = self.shutdown().await;
        info!(
            stopped = report.stopped.len(),
            errors = report.errors.len(),
            "Shutting down"
        );
        self.supervisor.remove_finished();

        let metrics = Metrics::gather()?;
        info!(bytes = metrics.len(), "Final metrics snapshot encoded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quoter_supervisor::JobState;

    fn config() -> AppConfig {
        AppConfig::from_toml(
            r#"
[maker]
poll_interval_ms = 10
stop_grace_ms = 500

[paper.balances]
KAS = "10000"
USDT = "1500"

[paper.mids]
"KAS-USDT" = "0.15"

[[jobs]]
symbol = "KAS-USDT"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_new_seeds_venue() {
        let app = Application::new(config()).unwrap();
        assert_eq!(app.venue().open_order_count(), 0);
        assert_eq!(app.supervisor().job_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_shutdown() {
        let app = Application::new(config()).unwrap();
        let ids = app.start_jobs().unwrap();
        assert_eq!(ids.len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let status = app
            .supervisor()
            .get_status(&ids[0].to_string())
            .unwrap();
        assert_eq!(status.state, JobState::Running);
        assert!(!app.venue().placed_orders().is_empty());
        app.report_statuses();

        let report = app.shutdown().await;
        assert_eq!(report.stopped, ids);
        assert!(report.is_clean());
    }
}
