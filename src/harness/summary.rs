//! End-of-run summary and the periodic progress line

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::checks::CheckResult;
use super::metrics::{LatencyStats, MetricsCollector, RunMetrics};
use super::RunContext;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub scenario: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub aborted: bool,
    pub metrics: RunMetrics,
    pub http_req_duration: LatencyStats,
    pub checks: Vec<CheckResult>,
}

impl RunSummary {
    pub fn collect(
        run_id: Uuid,
        scenario: &str,
        started_at: DateTime<Utc>,
        aborted: bool,
        ctx: &RunContext,
    ) -> Self {
        let finished_at = Utc::now();
        let duration_secs = (finished_at - started_at).num_milliseconds() as f64 / 1000.0;
        Self {
            run_id,
            scenario: scenario.to_string(),
            started_at,
            finished_at,
            duration_secs,
            aborted,
            metrics: ctx.metrics.snapshot(),
            http_req_duration: ctx.metrics.latency_stats(),
            checks: ctx.checks.snapshot(),
        }
    }

    pub fn checks_passed(&self) -> u64 {
        self.checks.iter().map(|c| c.passes).sum()
    }

    pub fn checks_failed(&self) -> u64 {
        self.checks.iter().map(|c| c.fails).sum()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("summary serialization failed")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        Ok(())
    }

    /// Human-readable report on stdout.
    pub fn print(&self) {
        println!("\n════════════════════════════════════════════════════════════════");
        println!("  scenario: {}   run: {}", self.scenario, self.run_id);
        if self.aborted {
            println!("  (run was interrupted before the last stage finished)");
        }
        println!("════════════════════════════════════════════════════════════════");

        if self.checks.is_empty() {
            println!("\n  no checks recorded");
        } else {
            println!();
            for check in &self.checks {
                let mark = if check.fails == 0 { '✓' } else { '✗' };
                println!("  {} {}", mark, check.name);
                if check.fails > 0 {
                    println!(
                        "   ↳ {:.0}%  ✓ {} / ✗ {}",
                        check.pass_rate() * 100.0,
                        check.passes,
                        check.fails
                    );
                }
            }
        }

        let total_checks = self.checks_passed() + self.checks_failed();
        let m = &self.metrics;
        let d = &self.http_req_duration;
        let rate = |n: u64| {
            if self.duration_secs > 0.0 {
                n as f64 / self.duration_secs
            } else {
                0.0
            }
        };

        println!();
        if total_checks > 0 {
            println!(
                "  checks.....................: {:.2}%  ✓ {}  ✗ {}",
                self.checks_passed() as f64 / total_checks as f64 * 100.0,
                self.checks_passed(),
                self.checks_failed()
            );
        }
        println!("  data_received..............: {} B", m.data_received);
        println!("  data_sent..................: {} B", m.data_sent);
        println!(
            "  http_req_duration..........: avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p(90)={:.2}ms p(95)={:.2}ms",
            d.avg_ms, d.min_ms, d.p50_ms, d.max_ms, d.p90_ms, d.p95_ms
        );
        if m.http_reqs > 0 {
            println!(
                "  http_req_failed............: {:.2}%  ✓ {}  ✗ {}",
                m.http_req_failed as f64 / m.http_reqs as f64 * 100.0,
                m.http_req_failed,
                m.http_reqs - m.http_req_failed
            );
        }
        println!(
            "  http_reqs..................: {}  {:.2}/s",
            m.http_reqs,
            rate(m.http_reqs)
        );
        println!(
            "  iterations.................: {}  {:.2}/s",
            m.iterations,
            rate(m.iterations)
        );
        if m.iterations_skipped > 0 {
            println!("  iterations_skipped.........: {}", m.iterations_skipped);
        }
        println!("  vus_max....................: {}", m.vus_max);
        println!("\n  duration: {:.2}s", self.duration_secs);
        println!("════════════════════════════════════════════════════════════════\n");
    }
}

/// Log one progress line every `every` until `token` is cancelled.
pub async fn progress_reporter(
    metrics: MetricsCollector,
    total: Duration,
    every: Duration,
    token: CancellationToken,
) {
    let mut ticker = interval(every.max(Duration::from_millis(100)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // first tick fires immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = token.cancelled() => break,
        }
        let snap = metrics.snapshot();
        let elapsed = metrics.elapsed();
        tracing::info!(
            elapsed_secs = elapsed.as_secs(),
            total_secs = total.as_secs(),
            vus = snap.vus,
            iterations = snap.iterations,
            iterations_skipped = snap.iterations_skipped,
            http_reqs = snap.http_reqs,
            http_req_failed = snap.http_req_failed,
            "progress"
        );
    }
}
