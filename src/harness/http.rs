use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::{Duration, Instant};

use super::metrics::MetricsCollector;

/// Outcome of one request. Transport failures carry no status, which makes
/// any status check on them fail.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: Option<u16>,
    pub duration: Duration,
    pub body_len: u64,
    pub error: Option<String>,
}

impl HttpResponse {
    pub fn status_is(&self, code: u16) -> bool {
        self.status == Some(code)
    }

    /// 2xx and 3xx are expected; anything else, or no response, failed.
    fn failed(&self) -> bool {
        self.error.is_some() || !matches!(self.status, Some(200..=399))
    }
}

/// Request-issuing primitive handed to scenarios. Every request is timed and
/// recorded in the run metrics.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    metrics: MetricsCollector,
}

impl HttpClient {
    pub fn new(timeout: Duration, metrics: MetricsCollector) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("promptpay-loadtest/", env!("CARGO_PKG_VERSION"))),
        );
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self { client, metrics })
    }

    pub async fn post(&self, url: &str, body: String, headers: HeaderMap) -> HttpResponse {
        let sent = body.len() as u64;
        let start = Instant::now();

        let result = self.client.post(url).headers(headers).body(body).send().await;

        let response = match result {
            Ok(resp) => {
                let status = resp.status().as_u16();
                match resp.bytes().await {
                    Ok(bytes) => HttpResponse {
                        status: Some(status),
                        duration: start.elapsed(),
                        body_len: bytes.len() as u64,
                        error: None,
                    },
                    Err(e) => HttpResponse {
                        status: Some(status),
                        duration: start.elapsed(),
                        body_len: 0,
                        error: Some(e.to_string()),
                    },
                }
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "request failed");
                HttpResponse {
                    status: None,
                    duration: start.elapsed(),
                    body_len: 0,
                    error: Some(e.to_string()),
                }
            }
        };

        self.metrics
            .request_finished(response.duration, response.failed(), sent, response.body_len);
        response
    }
}
