//! Market-making jobs for quoter.
//!
//! - `runner`: one job's poll → quote → submit → sleep loop
//! - `supervisor`: registry of concurrently running jobs with
//!   start/stop/stop-all/status control
//!
//! Each job runs as its own tokio task and owns its ledgers. Jobs share only
//! the venue client and the risk manager.

pub mod error;
pub mod job;
pub mod runner;
pub mod supervisor;

pub use error::{LoopError, SupervisorError, SupervisorResult};
pub use job::{JobHandle, JobId, JobState, JobStatus, StopSignal};
pub use runner::MarketMakingLoop;
pub use supervisor::{JobSupervisor, StopAck, StopAllReport, StopFailure};
