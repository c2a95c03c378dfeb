use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::harness::stages::{deserialize_duration, serialize_duration, Stages};
use crate::harness::RunnerOptions;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "QRLOAD__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    pub scenario: ScenarioConfig,
    pub server: ServerConfig,
    pub qr: QrConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/promptpay/qrcode".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub payload_path: PathBuf,
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub think_time: Duration,
    pub expected_status: u16,
    pub stages: Stages,
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub graceful_stop: Duration,
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub skip_backoff: Duration,
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub report_interval: Duration,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            payload_path: PathBuf::from("payload.json"),
            think_time: Duration::from_secs(1),
            expected_status: 200,
            stages: Stages::default(),
            graceful_stop: Duration::from_secs(30),
            skip_backoff: Duration::from_secs(1),
            report_interval: Duration::from_secs(5),
        }
    }
}

impl ScenarioConfig {
    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            stages: self.stages.clone(),
            graceful_stop: self.graceful_stop,
            skip_backoff: self.skip_backoff,
            report_interval: self.report_interval,
            ..RunnerOptions::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Merchant details stamped into every generated QR payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrConfig {
    pub merchant_category_code: String,
    pub merchant_city: String,
    pub postal_code: String,
    pub image_size: usize,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            merchant_category_code: "5311".to_string(),
            merchant_city: "Bangkok".to_string(),
            postal_code: "10240".to_string(),
            image_size: 320,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
}

impl Config {
    /// Defaults, then the TOML file, then `QRLOAD__*` environment variables.
    ///
    /// The default file may be absent; an explicitly requested one must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("config file {} does not exist", p.display());
                }
                p.to_path_buf()
            }
            None => PathBuf::from(DEFAULT_CONFIG_PATH),
        };

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let cfg: Config = figment
            .extract()
            .with_context(|| format!("invalid configuration (file {})", file.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.target.url)
            .with_context(|| format!("target.url '{}' is not a valid URL", self.target.url))?;
        if self.scenario.expected_status < 100 || self.scenario.expected_status > 599 {
            anyhow::bail!(
                "scenario.expected_status {} is not an HTTP status code",
                self.scenario.expected_status
            );
        }
        if self.qr.image_size == 0 {
            anyhow::bail!("qr.image_size must be positive");
        }
        Ok(())
    }
}
