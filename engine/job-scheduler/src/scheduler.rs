//! Per-job timer loops with shared cooperative cancellation

use crate::clock::{Clock, SystemClock};
use crate::job::{Job, JobChain};
use crate::schedule::{next_run, rearm, Recurrence, RunAt};
use crate::{Result, SchedulerError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Clone)]
struct ScheduledJob {
    job: Arc<dyn Job>,
    at: RunAt,
    recurrence: Recurrence,
}

/// Registered job as reported by [`Scheduler::jobs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub name: String,
    pub at: RunAt,
    pub recurrence: Recurrence,
}

/// Runs each registered job on its own timer until cancelled
pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
    clock: Arc<dyn Clock>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { jobs: Vec::new(), clock }
    }

    pub fn add(&mut self, job: Arc<dyn Job>, at: RunAt, recurrence: Recurrence) -> Result<()> {
        if self.jobs.iter().any(|j| j.job.name() == job.name()) {
            return Err(SchedulerError::DuplicateJob { name: job.name().to_string() });
        }
        info!(job = job.name(), %at, %recurrence, "Registered scheduled job");
        self.jobs.push(ScheduledJob { job, at, recurrence });
        Ok(())
    }

    pub fn add_daily(&mut self, job: Arc<dyn Job>, at: RunAt) -> Result<()> {
        self.add(job, at, Recurrence::Daily)
    }

    pub fn add_weekly(&mut self, job: Arc<dyn Job>, at: RunAt) -> Result<()> {
        self.add(job, at, Recurrence::Weekly)
    }

    /// Register steps that must run in order under a single timer
    pub fn add_chain(
        &mut self,
        name: impl Into<String>,
        steps: Vec<Arc<dyn Job>>,
        at: RunAt,
        recurrence: Recurrence,
    ) -> Result<()> {
        let chain = JobChain::new(name, steps);
        if chain.is_empty() {
            return Err(SchedulerError::EmptyChain { name: chain.name().to_string() });
        }
        self.add(Arc::new(chain), at, recurrence)
    }

    pub fn jobs(&self) -> Vec<JobInfo> {
        self.jobs
            .iter()
            .map(|j| JobInfo { name: j.job.name().to_string(), at: j.at, recurrence: j.recurrence })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Spawn one timer loop per job. Every loop exits once `cancel` fires,
    /// letting an in-flight run finish first.
    pub fn start(self, cancel: CancellationToken) -> SchedulerHandle {
        let mut tasks = JoinSet::new();
        for scheduled in self.jobs {
            let clock = Arc::clone(&self.clock);
            let cancel = cancel.clone();
            tasks.spawn(run_job(scheduled, clock, cancel));
        }
        info!(jobs = tasks.len(), "Scheduler started");
        SchedulerHandle { tasks }
    }
}

/// Running job loops
pub struct SchedulerHandle {
    tasks: JoinSet<()>,
}

impl SchedulerHandle {
    /// Wait for every job loop to exit
    pub async fn join(mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                error!("Scheduled job loop panicked: {}", e);
            }
        }
        info!("Scheduler stopped");
    }
}

async fn run_job(scheduled: ScheduledJob, clock: Arc<dyn Clock>, cancel: CancellationToken) {
    let name = scheduled.job.name().to_string();
    let period = scheduled.recurrence.period();

    let now = clock.now();
    let mut run_at = next_run(now, scheduled.at, scheduled.recurrence);
    let mut deadline = Instant::now() + until(now, run_at);
    info!(job = %name, first_run_at = %run_at, "Scheduled job initialized");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(job = %name, "Scheduled job stopped");
                return;
            }
            _ = tokio::time::sleep_until(deadline) => {}
        }

        info!(job = %name, run_at = %run_at, "Scheduled job starting");
        let started = Instant::now();
        match scheduled.job.run(&cancel).await {
            Ok(()) => info!(job = %name, elapsed_ms = started.elapsed().as_millis() as u64, "Scheduled job completed"),
            Err(e) => error!(job = %name, "Scheduled job failed: {:#}", e),
        }

        // Runs missed while this one was in progress are dropped, not replayed
        let elapsed = chrono::Duration::from_std(started.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        let (next, skipped) = rearm(run_at, run_at + elapsed, scheduled.recurrence);
        if skipped > 0 {
            warn!(job = %name, skipped, "Scheduled job overran its period");
        }
        deadline += period * (skipped + 1);
        run_at = next;
        info!(job = %name, next_run_at = %run_at, "Scheduled job re-armed");
    }
}

fn until(now: DateTime<Utc>, at: DateTime<Utc>) -> Duration {
    (at - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::job::job_fn;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HOUR: Duration = Duration::from_secs(60 * 60);
    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn one_am() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 11, 3, 1, 0, 0).unwrap()))
    }

    fn counting(name: &str, counter: Arc<AtomicUsize>, fail_first: bool) -> Arc<dyn Job> {
        job_fn(name, move |_| {
            let counter = counter.clone();
            async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                if fail_first && attempt == 0 {
                    anyhow::bail!("upstream unavailable");
                }
                Ok::<(), anyhow::Error>(())
            }
        })
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut scheduler = Scheduler::with_clock(one_am());
        let at = RunAt::new(2, 0).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.add_daily(counting("values", counter.clone(), false), at).unwrap();
        let err = scheduler.add_weekly(counting("values", counter, false), at).unwrap_err();

        assert_eq!(err, SchedulerError::DuplicateJob { name: "values".to_string() });
        assert_eq!(scheduler.jobs().len(), 1);
    }

    #[test]
    fn test_empty_chain_rejected() {
        let mut scheduler = Scheduler::with_clock(one_am());
        let err = scheduler
            .add_chain("nightly", Vec::new(), RunAt::new(2, 0).unwrap(), Recurrence::Daily)
            .unwrap_err();
        assert_eq!(err, SchedulerError::EmptyChain { name: "nightly".to_string() });
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_job_fires_at_time_of_day() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::with_clock(one_am());
        scheduler.add_daily(counting("values", counter.clone(), false), RunAt::new(2, 0).unwrap()).unwrap();

        let cancel = CancellationToken::new();
        let handle = scheduler.start(cancel.clone());

        tokio::time::sleep(HOUR - Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(DAY).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        cancel.cancel();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_halt_schedule() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::with_clock(one_am());
        scheduler.add_daily(counting("stats", counter.clone(), true), RunAt::new(1, 30).unwrap()).unwrap();

        let cancel = CancellationToken::new();
        let handle = scheduler.start(cancel.clone());

        tokio::time::sleep(HOUR).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(DAY).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        cancel.cancel();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_weekly_job_waits_a_week_when_time_passed() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::with_clock(one_am());
        scheduler.add_weekly(counting("weekly", counter.clone(), false), RunAt::new(0, 30).unwrap()).unwrap();

        let cancel = CancellationToken::new();
        let handle = scheduler.start(cancel.clone());

        tokio::time::sleep(DAY * 6).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(DAY).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        cancel.cancel();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::with_clock(one_am());
        scheduler.add_daily(counting("values", counter.clone(), false), RunAt::new(2, 0).unwrap()).unwrap();

        let cancel = CancellationToken::new();
        let handle = scheduler.start(cancel.clone());

        tokio::time::sleep(Duration::from_secs(60)).await;
        cancel.cancel();
        handle.join().await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_run_independently() {
        let early = Arc::new(AtomicUsize::new(0));
        let late = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::with_clock(one_am());
        scheduler.add_daily(counting("stats", early.clone(), false), RunAt::new(2, 0).unwrap()).unwrap();
        scheduler.add_daily(counting("values", late.clone(), false), RunAt::new(3, 0).unwrap()).unwrap();

        let cancel = CancellationToken::new();
        let handle = scheduler.start(cancel.clone());

        tokio::time::sleep(HOUR + Duration::from_secs(60)).await;
        assert_eq!(early.load(Ordering::SeqCst), 1);
        assert_eq!(late.load(Ordering::SeqCst), 0);

        tokio::time::sleep(HOUR).await;
        assert_eq!(late.load(Ordering::SeqCst), 1);

        cancel.cancel();
        handle.join().await;
    }
}
