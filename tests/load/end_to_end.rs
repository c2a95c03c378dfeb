use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use promptpay_loadtest::api::{self, AppState};
use promptpay_loadtest::config::Config;
use promptpay_loadtest::harness::{Runner, RunnerOptions, Stage, Stages};
use promptpay_loadtest::scenario::{Payload, PromptPayScenario};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{run_context, SAMPLE_PAYLOAD};

async fn spawn_qr_service() -> SocketAddr {
    let cfg = Config::default();
    let app = api::router(AppState::new(cfg.qr.clone()), &cfg);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn short_run() -> RunnerOptions {
    RunnerOptions {
        stages: Stages::new(vec![
            Stage::new(Duration::ZERO, 2),
            Stage::new(Duration::from_millis(800), 2),
        ])
        .unwrap(),
        graceful_stop: Duration::from_secs(5),
        skip_backoff: Duration::from_millis(100),
        ..RunnerOptions::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn staged_run_against_qr_service() {
    let addr = spawn_qr_service().await;
    let scenario = Arc::new(PromptPayScenario::new(
        format!("http://{addr}/promptpay/qrcode"),
        Some(Payload::from_json_str(SAMPLE_PAYLOAD).unwrap()),
        200,
        Duration::from_millis(50),
    ));

    let runner = Runner::new(short_run(), run_context());
    let summary = runner.run(scenario).await;

    assert!(!summary.aborted);
    assert_eq!(summary.scenario, "promptpay-qrcode");
    assert_eq!(summary.metrics.vus_max, 2);
    assert_eq!(summary.metrics.vus, 0);
    assert!(summary.metrics.iterations > 0);
    assert_eq!(summary.metrics.http_reqs, summary.metrics.iterations);
    assert_eq!(summary.metrics.http_req_failed, 0);
    assert_eq!(summary.checks.len(), 1);
    assert_eq!(summary.checks_failed(), 0);
    assert_eq!(summary.checks_passed(), summary.metrics.iterations);
    assert!(summary.http_req_duration.count > 0);
}

#[tokio::test]
async fn run_without_payload_never_hits_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let scenario = Arc::new(PromptPayScenario::new(
        format!("{}/promptpay/qrcode", server.uri()),
        None,
        200,
        Duration::from_millis(50),
    ));
    let runner = Runner::new(short_run(), run_context());
    let summary = runner.run(scenario).await;

    assert_eq!(summary.metrics.http_reqs, 0);
    assert_eq!(summary.metrics.iterations, 0);
    assert!(summary.metrics.iterations_skipped > 0);
    assert!(summary.checks.is_empty());
}
