//! One-time payload loading.
//!
//! Any failure leaves the payload absent instead of aborting the run; the
//! iteration function checks for that and degrades to a no-op.

use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("{source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("file content is undefined or empty")]
    Empty,

    #[error("{0}")]
    Parse(#[from] serde_json::Error),

    #[error("payload document is {0}, nothing to send")]
    Falsy(&'static str),
}

/// A parsed JSON document together with the exact request body sent for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    document: Value,
    body: String,
}

impl Payload {
    pub fn from_json_str(raw: &str) -> Result<Self, PayloadError> {
        if raw.trim().is_empty() {
            return Err(PayloadError::Empty);
        }
        let document: Value = serde_json::from_str(raw)?;
        if let Some(kind) = falsy_kind(&document) {
            return Err(PayloadError::Falsy(kind));
        }
        let body = serde_json::to_string(&document)?;
        Ok(Self { document, body })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Serialized once at load time; every request reuses it verbatim.
    pub fn body(&self) -> &str {
        &self.body
    }
}

fn falsy_kind(value: &Value) -> Option<&'static str> {
    match value {
        Value::Null => Some("null"),
        Value::Bool(false) => Some("false"),
        Value::Number(n) if n.as_f64() == Some(0.0) => Some("zero"),
        Value::String(s) if s.is_empty() => Some("an empty string"),
        _ => None,
    }
}

/// Read and parse the payload file, logging the raw and parsed content.
pub async fn load(path: &Path) -> Result<Payload, PayloadError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PayloadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    if raw.is_empty() {
        return Err(PayloadError::Empty);
    }
    info!(path = %path.display(), content = %raw, "file content");

    let payload = Payload::from_json_str(&raw)?;
    info!(payload = %payload.body(), "parsed payload");
    Ok(payload)
}

/// [`load`], with the error logged and turned into an absent payload.
pub async fn load_or_log(path: &Path) -> Option<Payload> {
    match load(path).await {
        Ok(payload) => Some(payload),
        Err(e) => {
            error!(
                path = %path.display(),
                error = %e,
                "error reading or parsing the payload file"
            );
            None
        }
    }
}
