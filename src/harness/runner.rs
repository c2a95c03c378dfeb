use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::stages::Stages;
use super::summary::{self, RunSummary};
use super::{IterationOutcome, RunContext, Scenario, VuContext};

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub stages: Stages,
    /// How long in-flight iterations may run after the last stage ends.
    pub graceful_stop: Duration,
    /// Pause after a skipped iteration before the VU tries again.
    pub skip_backoff: Duration,
    pub report_interval: Duration,
    pub tick: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            stages: Stages::default(),
            graceful_stop: Duration::from_secs(30),
            skip_backoff: Duration::from_secs(1),
            report_interval: Duration::from_secs(5),
            tick: Duration::from_millis(100),
        }
    }
}

struct ActiveVu {
    id: u32,
    token: CancellationToken,
}

pub struct Runner {
    options: RunnerOptions,
    ctx: RunContext,
    shutdown: CancellationToken,
}

impl Runner {
    pub fn new(options: RunnerOptions, ctx: RunContext) -> Self {
        Self {
            options,
            ctx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops dispatch early; in-flight iterations still
    /// get the graceful-stop window.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run<S: Scenario>(&self, scenario: Arc<S>) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let stages = &self.options.stages;
        let total = stages.total_duration();

        info!(
            %run_id,
            scenario = scenario.name(),
            stages = stages.as_slice().len(),
            max_vus = stages.max_target(),
            duration_secs = total.as_secs_f64(),
            "starting run"
        );
        for (i, stage) in stages.as_slice().iter().enumerate() {
            debug!(stage = i + 1, shape = %stage, "stage");
        }

        let reporter_token = CancellationToken::new();
        let reporter = tokio::spawn(summary::progress_reporter(
            self.ctx.metrics.clone(),
            total,
            self.options.report_interval,
            reporter_token.clone(),
        ));

        let start = Instant::now();
        let mut vus: JoinSet<()> = JoinSet::new();
        let mut active: Vec<ActiveVu> = Vec::new();
        let mut next_id = 1u32;
        let mut aborted = false;

        let mut ticker = interval(self.options.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.cancelled() => {
                    warn!("run interrupted, stopping VU dispatch");
                    aborted = true;
                    break;
                }
            }

            let elapsed = start.elapsed();
            if stages.is_finished(elapsed) {
                break;
            }

            let target = stages.target_at(elapsed) as usize;
            while active.len() < target {
                let vu = ActiveVu {
                    id: next_id,
                    token: self.shutdown.child_token(),
                };
                next_id += 1;
                vus.spawn(vu_loop(
                    scenario.clone(),
                    VuContext {
                        id: vu.id,
                        iteration: 0,
                        run: self.ctx.clone(),
                    },
                    vu.token.clone(),
                    self.options.skip_backoff,
                ));
                active.push(vu);
            }
            while active.len() > target {
                if let Some(vu) = active.pop() {
                    debug!(vu = vu.id, "retiring VU");
                    vu.token.cancel();
                }
            }
            self.ctx.metrics.set_vus(active.len() as u32);

            while vus.try_join_next().is_some() {}
        }

        for vu in active.drain(..) {
            vu.token.cancel();
        }
        self.ctx.metrics.set_vus(0);

        let drain = async { while vus.join_next().await.is_some() {} };
        if tokio::time::timeout(self.options.graceful_stop, drain).await.is_err() {
            warn!(
                graceful_stop_secs = self.options.graceful_stop.as_secs_f64(),
                remaining = vus.len(),
                "graceful stop elapsed, aborting in-flight iterations"
            );
            vus.shutdown().await;
        }

        reporter_token.cancel();
        let _ = reporter.await;

        let summary = RunSummary::collect(
            run_id,
            scenario.name(),
            started_at,
            aborted,
            &self.ctx,
        );
        info!(
            %run_id,
            iterations = summary.metrics.iterations,
            http_reqs = summary.metrics.http_reqs,
            aborted,
            "run finished"
        );
        summary
    }
}

async fn vu_loop<S: Scenario>(
    scenario: Arc<S>,
    mut vu: VuContext,
    token: CancellationToken,
    skip_backoff: Duration,
) {
    debug!(vu = vu.id, "VU started");
    while !token.is_cancelled() {
        match scenario.iteration(&vu).await {
            IterationOutcome::Completed => vu.run.metrics.iteration_completed(),
            IterationOutcome::Skipped => {
                vu.run.metrics.iteration_skipped();
                tokio::select! {
                    _ = sleep(skip_backoff) => {}
                    _ = token.cancelled() => break,
                }
            }
        }
        vu.iteration += 1;
    }
    debug!(vu = vu.id, iterations = vu.iteration, "VU stopped");
}
