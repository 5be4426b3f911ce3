//! Job identity, state, and the handle the supervisor keeps per job.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use uuid::Uuid;

use quoter_core::Symbol;

use crate::error::{SupervisorError, SupervisorResult};

// ============================================================================
// JobId
// ============================================================================

/// Opaque job identifier (random v4 UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a caller-supplied id. Malformed input is `InvalidJobId`.
    pub fn parse(raw: &str) -> SupervisorResult<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| SupervisorError::InvalidJobId(raw.to_string()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = SupervisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// JobState
// ============================================================================

/// Job lifecycle: Created → Running → (StopRequested → Stopped) | Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Running,
    StopRequested,
    Stopped,
    Failed,
}

impl JobState {
    /// Loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::StopRequested => "stop_requested",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// JobStatus
// ============================================================================

/// Point-in-time view of a job, readable without pausing its loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: JobId,
    pub symbol: Symbol,
    pub spread_override: Option<Decimal>,
    pub state: JobState,
    pub last_update: DateTime<Utc>,
    pub active_order_count: usize,
    /// Last iteration failed talking to the venue.
    pub degraded: bool,
    pub last_error: Option<String>,
    pub iterations: u64,
    pub orders_submitted: u64,
    /// Submissions the venue refused.
    pub orders_rejected: u64,
    pub consecutive_errors: u32,
    pub net_position: Decimal,
}

impl JobStatus {
    pub fn new(job_id: JobId, symbol: Symbol, spread_override: Option<Decimal>) -> Self {
        Self {
            job_id,
            symbol,
            spread_override,
            state: JobState::Created,
            last_update: Utc::now(),
            active_order_count: 0,
            degraded: false,
            last_error: None,
            iterations: 0,
            orders_submitted: 0,
            orders_rejected: 0,
            consecutive_errors: 0,
            net_position: Decimal::ZERO,
        }
    }
}

// ============================================================================
// StopSignal
// ============================================================================

/// Cooperative stop flag that also wakes a sleeping loop.
#[derive(Debug, Default)]
pub struct StopSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        // notify_one keeps a permit if the loop is not waiting yet.
        self.notify.notify_one();
    }

    /// Sleep for `duration` or until stop is requested, whichever is first.
    pub async fn sleep(&self, duration: Duration) {
        if self.is_requested() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.notify.notified() => {}
        }
    }
}

// ============================================================================
// JobHandle
// ============================================================================

/// Supervisor-side view of a running job.
pub struct JobHandle {
    id: JobId,
    status: Arc<RwLock<JobStatus>>,
    stop: Arc<StopSignal>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl JobHandle {
    pub fn new(id: JobId, status: Arc<RwLock<JobStatus>>, stop: Arc<StopSignal>) -> Self {
        Self {
            id,
            status,
            stop,
            task: Mutex::new(None),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status.read().clone()
    }

    pub fn state(&self) -> JobState {
        self.status.read().state
    }

    /// Flag the job for stopping. A finished job is left as is.
    pub fn request_stop(&self) {
        {
            let mut status = self.status.write();
            if !status.state.is_finished() {
                status.state = JobState::StopRequested;
                status.last_update = Utc::now();
            }
        }
        self.stop.request();
    }

    pub fn attach_task(&self, task: JoinHandle<()>) {
        *self.task.lock() = Some(task);
    }

    pub fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task.lock().take()
    }

    pub fn is_task_finished(&self) -> bool {
        self.task.lock().as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
