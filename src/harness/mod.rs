//! Minimal ramping-VU harness: a traffic shape, a request primitive, a check
//! primitive and a runner that drives a [`Scenario`] across virtual users.

pub mod checks;
pub mod http;
pub mod metrics;
pub mod runner;
pub mod stages;
pub mod summary;

use async_trait::async_trait;
use std::time::Duration;

pub use checks::{CheckRegistry, CheckResult};
pub use http::{HttpClient, HttpResponse};
pub use metrics::{LatencyStats, MetricsCollector, RunMetrics};
pub use runner::{Runner, RunnerOptions};
pub use stages::{Stage, StageError, Stages};
pub use summary::RunSummary;

/// What one call of [`Scenario::iteration`] amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The iteration did its work (request issued, check recorded).
    Completed,
    /// The iteration returned early without doing anything.
    Skipped,
}

/// Shared primitives for one run. Cloning is cheap; all clones record into
/// the same counters.
#[derive(Clone)]
pub struct RunContext {
    pub checks: CheckRegistry,
    pub metrics: MetricsCollector,
    pub http: HttpClient,
}

impl RunContext {
    pub fn new(request_timeout: Duration) -> anyhow::Result<Self> {
        let metrics = MetricsCollector::new()?;
        let http = HttpClient::new(request_timeout, metrics.clone())?;
        Ok(Self {
            checks: CheckRegistry::new(),
            metrics,
            http,
        })
    }
}

/// Per-VU view handed to every iteration.
pub struct VuContext {
    pub id: u32,
    pub iteration: u64,
    pub run: RunContext,
}

/// A load-test scenario. Setup is the scenario's constructor and runs once
/// before the runner starts; `iteration` is then called in a loop by every VU.
#[async_trait]
pub trait Scenario: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn iteration(&self, vu: &VuContext) -> IterationOutcome;
}
