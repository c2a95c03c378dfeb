use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use super::payload::{self, Payload};
use crate::config::{ScenarioConfig, TargetConfig};
use crate::harness::{IterationOutcome, Scenario, VuContext};

/// POST the loaded payload to the QR-code endpoint, check the status, sleep.
pub struct PromptPayScenario {
    url: String,
    payload: Option<Arc<Payload>>,
    expected_status: u16,
    check_name: String,
    think_time: Duration,
}

impl PromptPayScenario {
    pub fn new(
        url: impl Into<String>,
        payload: Option<Payload>,
        expected_status: u16,
        think_time: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            payload: payload.map(Arc::new),
            expected_status,
            check_name: format!("status was {expected_status}"),
            think_time,
        }
    }

    /// Runs once before any VU starts. Payload problems are logged and leave
    /// the scenario without a payload; they never fail setup.
    pub async fn setup(target: &TargetConfig, scenario: &ScenarioConfig) -> Self {
        let payload = payload::load_or_log(&scenario.payload_path).await;
        Self::new(
            target.url.clone(),
            payload,
            scenario.expected_status,
            scenario.think_time,
        )
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    pub fn check_name(&self) -> &str {
        &self.check_name
    }
}

#[async_trait]
impl Scenario for PromptPayScenario {
    fn name(&self) -> &str {
        "promptpay-qrcode"
    }

    async fn iteration(&self, vu: &VuContext) -> IterationOutcome {
        let Some(payload) = &self.payload else {
            error!(vu = vu.id, "payload is undefined, skipping iteration");
            return IterationOutcome::Skipped;
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let res = vu
            .run
            .http
            .post(&self.url, payload.body().to_string(), headers)
            .await;
        vu.run
            .checks
            .check(&self.check_name, res.status_is(self.expected_status));

        tokio::time::sleep(self.think_time).await;
        IterationOutcome::Completed
    }
}
