//! PromptPay QR-code endpoint.

use axum::{
    extract::State,
    http::header::{HeaderName, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode_generator::QrCodeEcc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{error::ApiError, AppState};
use crate::config::QrConfig;
use crate::emv::{
    CreditTransfer, EmvError, EmvQr, PointOfInitiation, PresentedType, COUNTRY_THAILAND,
    CURRENCY_BAHT,
};

const CONTENT_TRANSFER_ENCODING: HeaderName = HeaderName::from_static("content-transfer-encoding");

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct GenerateQrCodeRq {
    #[validate(range(min = 0.0, max = 9_999_999_999.99))]
    pub transaction_amount: Option<f64>,
    #[validate(length(min = 9, max = 13))]
    pub mobile_number: String,
    #[validate(length(min = 1, max = 25))]
    pub merchant_name: String,
}

/// Base64-encoded PNG.
#[derive(Debug)]
pub struct QrCodeResponse {
    pub qrcode_base64: String,
}

impl IntoResponse for QrCodeResponse {
    fn into_response(self) -> Response {
        (
            [
                (CONTENT_TYPE, "image/png"),
                (CONTENT_TRANSFER_ENCODING, "base64"),
            ],
            self.qrcode_base64,
        )
            .into_response()
    }
}

/// A zero amount is treated as "no amount": the code is static and the
/// payer enters the amount.
pub fn build_payload(rq: &GenerateQrCodeRq, qr_cfg: &QrConfig) -> Result<String, EmvError> {
    let amount = rq.transaction_amount.filter(|a| *a > 0.0);

    let transfer = CreditTransfer::new(PresentedType::MerchantPresented)?
        .with_mobile_number(&rq.mobile_number)?;

    let mut qr = EmvQr::new();
    qr.set_point_of_initiation(match amount {
        Some(_) => PointOfInitiation::Dynamic,
        None => PointOfInitiation::Static,
    })?;
    qr.set_promptpay(&transfer)?;
    qr.set_merchant_category_code(&qr_cfg.merchant_category_code)?;
    qr.set_transaction_currency(CURRENCY_BAHT)?;
    if let Some(amount) = amount {
        qr.set_transaction_amount(amount)?;
    }
    qr.set_country_code(COUNTRY_THAILAND)?;
    qr.set_merchant_name(&rq.merchant_name)?;
    qr.set_merchant_city(&qr_cfg.merchant_city)?;
    qr.set_postal_code(&qr_cfg.postal_code)?;
    qr.payload()
}

/// POST /promptpay/qrcode
pub async fn generate_qr_code(
    State(st): State<AppState>,
    Json(rq): Json<GenerateQrCodeRq>,
) -> Result<QrCodeResponse, ApiError> {
    rq.validate()?;
    let payload = build_payload(&rq, &st.qr)?;
    tracing::debug!(payload = %payload, "built promptpay payload");

    let size = st.qr.image_size;
    let png = tokio::task::spawn_blocking(move || {
        qrcode_generator::to_png_to_vec(payload, QrCodeEcc::Low, size)
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("render task failed: {e}")))?
    .map_err(|e| ApiError::InternalError(format!("qr render failed: {e:?}")))?;

    Ok(QrCodeResponse {
        qrcode_base64: STANDARD.encode(png),
    })
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}
