pub mod error;
pub mod qrcode;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{Config, QrConfig};

#[derive(Clone)]
pub struct AppState {
    pub qr: Arc<QrConfig>,
}

impl AppState {
    pub fn new(qr: QrConfig) -> Self {
        Self { qr: Arc::new(qr) }
    }
}

pub fn router(state: AppState, cfg: &Config) -> Router {
    Router::new()
        .route("/promptpay/qrcode", post(qrcode::generate_qr_code))
        .route("/healthz", get(qrcode::healthz))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    cfg.server.request_timeout,
                )),
        )
        .layer(TraceLayer::new_for_http())
}
