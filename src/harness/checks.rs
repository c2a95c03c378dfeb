//! Named pass/fail assertions recorded as metrics.
//!
//! A failed check never stops the run; it only moves a counter.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckResult {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    pub fn pass_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.passes as f64 / total as f64,
        }
    }
}

#[derive(Clone, Default)]
pub struct CheckRegistry {
    checks: Arc<Mutex<Vec<CheckResult>>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one evaluation of `name`. Returns `passed` so callers can branch on it.
    pub fn check(&self, name: &str, passed: bool) -> bool {
        let mut checks = self.checks.lock();
        let entry = match checks.iter_mut().position(|c| c.name == name) {
            Some(idx) => &mut checks[idx],
            None => {
                checks.push(CheckResult {
                    name: name.to_string(),
                    passes: 0,
                    fails: 0,
                });
                let last = checks.len() - 1;
                &mut checks[last]
            }
        };

        if passed {
            entry.passes += 1;
        } else {
            entry.fails += 1;
            tracing::debug!(check = name, "check failed");
        }
        passed
    }

    pub fn get(&self, name: &str) -> Option<CheckResult> {
        self.checks.lock().iter().find(|c| c.name == name).cloned()
    }

    /// Checks in the order they were first recorded.
    pub fn snapshot(&self) -> Vec<CheckResult> {
        self.checks.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.lock().is_empty()
    }
}
