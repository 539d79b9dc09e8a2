//! # JobScheduler
//!
//! In-process recurring jobs. Each job fires at a UTC time of day, daily or
//! weekly, on its own timer. Failures are logged and the job waits for its
//! next occurrence. Chains run dependent steps in order under one timer, and
//! a single cancellation token stops every loop between runs.

pub mod clock;
pub mod error;
pub mod job;
pub mod schedule;
pub mod scheduler;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::SchedulerError;
pub use job::{job_fn, FnJob, Job, JobChain};
pub use schedule::{next_run, Recurrence, RunAt};
pub use scheduler::{JobInfo, Scheduler, SchedulerHandle};

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, SchedulerError>;
