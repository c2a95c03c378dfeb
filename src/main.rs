use anyhow::{Context, Result};
use clap::Parser;
use promptpay_loadtest::{
    api,
    cli::{Cli, Mode, RunArgs},
    config::Config,
    harness::{RunContext, Runner},
    scenario::PromptPayScenario,
    telemetry::{self, init_tracing},
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut cfg = Config::load(cli.mode.config_path())?;
    cli.mode.apply(&mut cfg);
    cfg.validate()?;

    init_tracing(&cfg.log, cli.mode.verbose());

    match &cli.mode {
        Mode::Run(args) => run(cfg, args).await,
        Mode::Serve(_) => serve(cfg).await,
    }
}

async fn run(cfg: Config, args: &RunArgs) -> Result<()> {
    let ctx = RunContext::new(cfg.target.request_timeout)?;
    let scenario = Arc::new(PromptPayScenario::setup(&cfg.target, &cfg.scenario).await);
    if !scenario.has_payload() {
        warn!("no payload loaded, iterations will be skipped");
    }

    let runner = Runner::new(cfg.scenario.runner_options(), ctx);

    let token = runner.shutdown_token();
    tokio::spawn(async move {
        telemetry::shutdown_signal().await;
        token.cancel();
    });

    let summary = runner.run(scenario).await;
    summary.print();

    if let Some(path) = &args.summary_export {
        summary.write_json(path)?;
        info!(path = %path.display(), "summary exported");
    }
    Ok(())
}

async fn serve(cfg: Config) -> Result<()> {
    let state = api::AppState::new(cfg.qr.clone());
    let app = api::router(state, &cfg);

    let addr = cfg.server.socket_addr()?;
    info!(%addr, "starting PromptPay QR-code service");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
