use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// PromptPay QR-code load tester
#[derive(Parser, Debug)]
#[command(name = "promptpay-loadtest")]
#[command(about = "Staged HTTP load test for the PromptPay QR-code endpoint")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Mode {
    /// Ramp virtual users against the QR-code endpoint and print a summary
    Run(RunArgs),

    /// Serve the PromptPay QR-code endpoint (runs until Ctrl+C)
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// TOML config file (defaults to config/default.toml when present)
    #[arg(long, env = "QRLOAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Endpoint receiving the POSTs
    #[arg(long)]
    pub url: Option<String>,

    /// JSON document sent as the request body
    #[arg(long)]
    pub payload: Option<PathBuf>,

    /// Write the end-of-run summary as JSON
    #[arg(long)]
    pub summary_export: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// TOML config file (defaults to config/default.toml when present)
    #[arg(long, env = "QRLOAD_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Mode {
    pub fn config_path(&self) -> Option<&std::path::Path> {
        match self {
            Mode::Run(args) => args.config.as_deref(),
            Mode::Serve(args) => args.config.as_deref(),
        }
    }

    pub fn verbose(&self) -> bool {
        match self {
            Mode::Run(args) => args.verbose,
            Mode::Serve(args) => args.verbose,
        }
    }

    /// Flags given on the command line override the loaded config.
    pub fn apply(&self, cfg: &mut Config) {
        match self {
            Mode::Run(args) => {
                if let Some(url) = &args.url {
                    cfg.target.url = url.clone();
                }
                if let Some(path) = &args.payload {
                    cfg.scenario.payload_path = path.clone();
                }
            }
            Mode::Serve(args) => {
                if let Some(host) = &args.host {
                    cfg.server.host = host.clone();
                }
                if let Some(port) = args.port {
                    cfg.server.port = port;
                }
            }
        }
    }
}
