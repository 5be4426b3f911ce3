//! Job supervisor: start, inspect, and stop concurrently running loops.
//!
//! Control calls never pause a loop. Status reads go through the job's
//! `RwLock` snapshot; stops are cooperative and bounded by `stop_grace_ms`.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::join_all;
use futures_util::FutureExt;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};

use quoter_core::Symbol;
use quoter_exchange::DynExchangeClient;
use quoter_mm::MakerConfig;
use quoter_risk::{RiskConfig, RiskManager};
use quoter_telemetry::Metrics;
use quoter_wallet::WalletConfig;

use crate::error::{SupervisorError, SupervisorResult};
use crate::job::{JobHandle, JobId, JobState, JobStatus, StopSignal};
use crate::runner::MarketMakingLoop;

/// Acknowledgement of a completed stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StopAck {
    pub job_id: JobId,
    /// State the loop exited with.
    pub state: JobState,
}

#[derive(Debug)]
pub struct StopFailure {
    pub job_id: JobId,
    pub error: SupervisorError,
}

/// Result of `stop_all`. Every job is attempted independently.
#[derive(Debug, Default)]
pub struct StopAllReport {
    pub stopped: Vec<JobId>,
    pub errors: Vec<StopFailure>,
}

impl StopAllReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Registry of market-making jobs sharing one venue and one risk manager.
pub struct JobSupervisor {
    jobs: DashMap<JobId, Arc<JobHandle>>,
    exchange: DynExchangeClient,
    risk: Arc<RiskManager>,
    maker_config: MakerConfig,
    wallet_config: WalletConfig,
    risk_config: RiskConfig,
}

impl JobSupervisor {
    pub fn new(
        exchange: DynExchangeClient,
        risk: Arc<RiskManager>,
        maker_config: MakerConfig,
        wallet_config: WalletConfig,
        risk_config: RiskConfig,
    ) -> SupervisorResult<Self> {
        maker_config
            .validate()
            .map_err(|e| SupervisorError::Configuration(e.to_string()))?;
        risk_config
            .validate()
            .map_err(|e| SupervisorError::Configuration(e.to_string()))?;

        Ok(Self {
            jobs: DashMap::new(),
            exchange,
            risk,
            maker_config,
            wallet_config,
            risk_config,
        })
    }

    pub fn risk(&self) -> &Arc<RiskManager> {
        &self.risk
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Validate, register, and spawn a job. Returns without waiting for the
    /// loop's first iteration.
    ///
    /// `spread_override` replaces the symbol's `min_spread` floor and must lie
    /// in (0, 1).
    pub fn start_job(
        &self,
        symbol: &str,
        spread_override: Option<Decimal>,
    ) -> SupervisorResult<JobId> {
        let symbol =
            Symbol::new(symbol).map_err(|e| SupervisorError::Configuration(e.to_string()))?;
        self.wallet_config
            .symbol_parser()
            .split(&symbol)
            .map_err(|e| SupervisorError::Configuration(e.to_string()))?;
        if let Some(spread) = spread_override {
            if spread <= Decimal::ZERO || spread >= Decimal::ONE {
                return Err(SupervisorError::Configuration(format!(
                    "spread override must be in (0, 1), got {spread}"
                )));
            }
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SupervisorError::Runtime(e.to_string()))?;

        if self.risk.limits(&symbol).is_none() {
            self.risk
                .set_limits(&symbol, self.risk_config.limits_for(&symbol))
                .map_err(|e| SupervisorError::Configuration(e.to_string()))?;
        }

        let id = JobId::new();
        let status = Arc::new(RwLock::new(JobStatus::new(
            id,
            symbol.clone(),
            spread_override,
        )));
        let stop = Arc::new(StopSignal::new());
        let handle = Arc::new(JobHandle::new(id, Arc::clone(&status), Arc::clone(&stop)));

        let job_loop = MarketMakingLoop::new(
            id,
            symbol.clone(),
            spread_override,
            Arc::clone(&self.exchange),
            Arc::clone(&self.risk),
            self.maker_config.clone(),
            &self.wallet_config,
            Arc::clone(&status),
            stop,
        );

        Metrics::job_started();
        let task = runtime.spawn(async move {
            if let Err(payload) = AssertUnwindSafe(job_loop.run()).catch_unwind().await {
                let message = panic_message(payload.as_ref());
                error!(job_id = %id, panic = %message, "Market-making loop panicked");
                {
                    let mut status = status.write();
                    status.state = JobState::Failed;
                    status.last_error = Some(format!("panic: {message}"));
                    status.last_update = Utc::now();
                }
                Metrics::job_transition(JobState::Failed.as_str());
            }
            Metrics::job_finished();
        });
        handle.attach_task(task);
        self.jobs.insert(id, handle);

        info!(
            job_id = %id,
            symbol = %symbol,
            spread_override = ?spread_override,
            "Job started"
        );
        Ok(id)
    }

    /// Snapshot of one job's status.
    pub fn get_status(&self, job_id: &str) -> SupervisorResult<JobStatus> {
        let id = JobId::parse(job_id)?;
        self.jobs
            .get(&id)
            .map(|handle| handle.status())
            .ok_or_else(|| SupervisorError::JobNotFound(id.to_string()))
    }

    pub fn list_statuses(&self) -> HashMap<JobId, JobStatus> {
        self.jobs
            .iter()
            .map(|entry| (*entry.key(), entry.value().status()))
            .collect()
    }

    /// Request a stop and wait up to `stop_grace_ms` for the loop to exit.
    ///
    /// On success the job leaves the registry. A finished job is reported as
    /// `AlreadyStopped` and stays registered until `remove_finished`.
    pub async fn stop_job(&self, job_id: &str) -> SupervisorResult<StopAck> {
        let id = JobId::parse(job_id)?;
        let handle = self
            .jobs
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SupervisorError::JobNotFound(id.to_string()))?;

        let state = handle.state();
        if state.is_finished() {
            return Err(SupervisorError::AlreadyStopped {
                job_id: id.to_string(),
                state,
            });
        }

        handle.request_stop();
        // Another caller already owns the in-flight stop.
        let Some(mut task) = handle.take_task() else {
            return Err(SupervisorError::AlreadyStopped {
                job_id: id.to_string(),
                state: JobState::StopRequested,
            });
        };

        let grace_ms = self.maker_config.stop_grace_ms;
        match tokio::time::timeout(Duration::from_millis(grace_ms), &mut task).await {
            Ok(joined) => {
                if let Err(e) = joined {
                    warn!(job_id = %id, error = %e, "Job task ended abnormally");
                }
                self.jobs.remove(&id);
                let state = handle.state();
                info!(job_id = %id, state = %state, "Job stopped");
                Ok(StopAck { job_id: id, state })
            }
            Err(_) => {
                handle.attach_task(task);
                warn!(job_id = %id, waited_ms = grace_ms, "Job did not stop in time");
                Err(SupervisorError::StopTimeout {
                    job_id: id.to_string(),
                    waited_ms: grace_ms,
                })
            }
        }
    }

    /// Stop every registered job concurrently.
    pub async fn stop_all(&self) -> StopAllReport {
        let ids: Vec<JobId> = self.jobs.iter().map(|entry| *entry.key()).collect();
        let results = join_all(ids.into_iter().map(|id| async move {
            (id, self.stop_job(&id.to_string()).await)
        }))
        .await;

        let mut report = StopAllReport::default();
        for (job_id, result) in results {
            match result {
                Ok(_) => report.stopped.push(job_id),
                Err(error) => report.errors.push(StopFailure { job_id, error }),
            }
        }
        info!(
            stopped = report.stopped.len(),
            errors = report.errors.len(),
            "Stop-all complete"
        );
        report
    }

    /// Drop Stopped/Failed jobs from the registry.
    pub fn remove_finished(&self) -> Vec<JobId> {
        let finished: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|entry| entry.value().state().is_finished())
            .map(|entry| *entry.key())
            .collect();
        for id in &finished {
            self.jobs.remove(id);
        }
        finished
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
