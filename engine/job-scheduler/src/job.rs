//! Units of scheduled work

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A named piece of recurring work
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    /// Run once. The token is for checking between steps; a run is never
    /// interrupted from outside.
    async fn run(&self, cancel: &CancellationToken) -> anyhow::Result<()>;
}

/// Job backed by an async closure
pub struct FnJob<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnJob<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

#[async_trait::async_trait]
impl<F, Fut> Job for FnJob<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, cancel: &CancellationToken) -> anyhow::Result<()> {
        (self.f)(cancel.clone()).await
    }
}

/// Wrap an async closure as a shareable job
pub fn job_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn Job>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnJob::new(name, f))
}

/// Ordered steps under one timer. Stops at the first failing step, and
/// does not start a new step once cancellation has been requested.
pub struct JobChain {
    name: String,
    steps: Vec<Arc<dyn Job>>,
}

impl JobChain {
    pub fn new(name: impl Into<String>, steps: Vec<Arc<dyn Job>>) -> Self {
        Self { name: name.into(), steps }
    }

    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.name())
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[async_trait::async_trait]
impl Job for JobChain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, cancel: &CancellationToken) -> anyhow::Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(chain = %self.name, step = step.name(), "Chain cancelled before step");
                return Ok(());
            }

            info!(chain = %self.name, step = step.name(), index, "Running chain step");
            if let Err(e) = step.run(cancel).await {
                return Err(e.context(format!("chain {} stopped at step {}", self.name, step.name())));
            }
        }
        Ok(())
    }
}
