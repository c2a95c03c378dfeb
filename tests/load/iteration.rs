use std::time::Duration;

use promptpay_loadtest::config::{ScenarioConfig, TargetConfig};
use promptpay_loadtest::harness::{IterationOutcome, Scenario};
use promptpay_loadtest::scenario::{Payload, PromptPayScenario};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{payload_file, run_context, vu, SAMPLE_PAYLOAD};

const EXPECTED_BODY: &str =
    r#"{"transaction_amount":100.5,"mobile_number":"0812345678","merchant_name":"Sample Shop"}"#;

fn scenario_for(server: &MockServer, payload: Option<Payload>) -> PromptPayScenario {
    PromptPayScenario::new(
        format!("{}/promptpay/qrcode", server.uri()),
        payload,
        200,
        Duration::ZERO,
    )
}

fn sample() -> Option<Payload> {
    Some(Payload::from_json_str(SAMPLE_PAYLOAD).unwrap())
}

#[tokio::test]
async fn posts_serialized_payload_once_per_iteration() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/promptpay/qrcode"))
        .and(header("content-type", "application/json"))
        .and(body_string(EXPECTED_BODY))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let run = run_context();
    let scenario = scenario_for(&server, sample());

    let outcome = scenario.iteration(&vu(&run)).await;

    assert_eq!(outcome, IterationOutcome::Completed);
    let metrics = run.metrics.snapshot();
    assert_eq!(metrics.http_reqs, 1);
    assert_eq!(metrics.data_sent, EXPECTED_BODY.len() as u64);
}

#[tokio::test]
async fn status_200_passes_check() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("iVBORw0KGgo="))
        .mount(&server)
        .await;

    let run = run_context();
    let scenario = scenario_for(&server, sample());
    scenario.iteration(&vu(&run)).await;

    let check = run.checks.get("status was 200").unwrap();
    assert_eq!((check.passes, check.fails), (1, 0));
    assert_eq!(run.metrics.snapshot().http_req_failed, 0);
}

#[tokio::test]
async fn non_200_fails_check_and_iterations_continue() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let run = run_context();
    let scenario = scenario_for(&server, sample());
    let vu = vu(&run);

    assert_eq!(scenario.iteration(&vu).await, IterationOutcome::Completed);
    assert_eq!(scenario.iteration(&vu).await, IterationOutcome::Completed);

    let check = run.checks.get(scenario.check_name()).unwrap();
    assert_eq!((check.passes, check.fails), (0, 2));
    assert_eq!(run.metrics.snapshot().http_req_failed, 2);
}

#[tokio::test]
async fn transport_error_fails_check() {
    // Nothing listens on the discard port.
    let scenario = PromptPayScenario::new(
        "http://127.0.0.1:9/promptpay/qrcode",
        sample(),
        200,
        Duration::ZERO,
    );
    let run = run_context();

    assert_eq!(
        scenario.iteration(&vu(&run)).await,
        IterationOutcome::Completed
    );
    let check = run.checks.get("status was 200").unwrap();
    assert_eq!((check.passes, check.fails), (0, 1));
}

#[tokio::test]
async fn missing_payload_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let run = run_context();
    let scenario = scenario_for(&server, None);

    assert_eq!(scenario.iteration(&vu(&run)).await, IterationOutcome::Skipped);
    assert!(run.checks.is_empty());
    assert_eq!(run.metrics.snapshot().http_reqs, 0);
}

#[tokio::test]
async fn setup_with_bad_payload_files_leaves_scenario_empty() {
    let server = MockServer::start().await;
    let target = TargetConfig {
        url: format!("{}/promptpay/qrcode", server.uri()),
        ..TargetConfig::default()
    };

    let empty = payload_file("");
    let malformed = payload_file("{\"transaction_amount\": 100.5,");
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("payload.json");

    for path in [empty.path(), malformed.path(), missing.as_path()] {
        let scenario_cfg = ScenarioConfig {
            payload_path: path.to_path_buf(),
            ..ScenarioConfig::default()
        };
        let scenario = PromptPayScenario::setup(&target, &scenario_cfg).await;
        assert!(!scenario.has_payload(), "{} should not load", path.display());
    }
}

#[tokio::test]
async fn setup_loads_payload_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string(EXPECTED_BODY))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let file = payload_file(SAMPLE_PAYLOAD);
    let target = TargetConfig {
        url: format!("{}/promptpay/qrcode", server.uri()),
        ..TargetConfig::default()
    };
    let scenario_cfg = ScenarioConfig {
        payload_path: file.path().to_path_buf(),
        think_time: Duration::ZERO,
        ..ScenarioConfig::default()
    };

    let scenario = PromptPayScenario::setup(&target, &scenario_cfg).await;
    assert!(scenario.has_payload());

    let run = run_context();
    scenario.iteration(&vu(&run)).await;
    assert_eq!(run.checks.get("status was 200").unwrap().passes, 1);
}
