//! Configuration management for Tether
//!
//! Configuration is loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::server::{LaunchCommand, PortChoice, ReadinessPolicy};

/// Placeholder credential accepted by local servers started without `--api-key`
pub const DEFAULT_API_KEY: &str = "None";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Program (and leading arguments) that starts the inference server
    pub launch_program: String,
    /// Model path or hub identifier passed as `--model-path`
    pub model_path: String,
    /// Address the server binds to
    pub host: String,
    /// Fixed port, or `None` to pick a free one
    pub port: Option<u16>,
    /// Fraction of accelerator memory reserved for weights and KV cache
    pub mem_fraction_static: f64,
    /// Optional chat template file
    pub chat_template: Option<String>,
    /// Optional reasoning parser name (e.g. `qwen3`, `deepseek-r1`)
    pub reasoning_parser: Option<String>,

    /// Already-running server to talk to; skips launching when set
    pub base_url: Option<String>,
    /// Credential sent as a bearer token
    pub api_key: String,

    /// Maximum time to wait for the server to come up (in seconds)
    pub ready_timeout_seconds: u64,
    /// Interval between readiness probes (in milliseconds)
    pub poll_interval_ms: u64,
    /// Per-request HTTP timeout (in seconds)
    pub request_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            launch_program: env::var("TETHER_LAUNCH_PROGRAM")
                .unwrap_or_else(|_| "python3 -m sglang.launch_server".to_string()),
            model_path: env::var("TETHER_MODEL_PATH")
                .unwrap_or_else(|_| "qwen/qwen2.5-0.5b-instruct".to_string()),
            host: env::var("TETHER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("TETHER_PORT")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("Invalid TETHER_PORT")?,
            mem_fraction_static: env::var("TETHER_MEM_FRACTION_STATIC")
                .unwrap_or_else(|_| "0.8".to_string())
                .parse()
                .context("Invalid TETHER_MEM_FRACTION_STATIC")?,
            chat_template: env::var("TETHER_CHAT_TEMPLATE").ok(),
            reasoning_parser: env::var("TETHER_REASONING_PARSER").ok(),

            base_url: env::var("TETHER_BASE_URL").ok(),
            api_key: env::var("TETHER_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.to_string()),

            ready_timeout_seconds: env::var("TETHER_READY_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid TETHER_READY_TIMEOUT_SECONDS")?,
            poll_interval_ms: env::var("TETHER_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("Invalid TETHER_POLL_INTERVAL_MS")?,
            request_timeout_seconds: env::var("TETHER_REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid TETHER_REQUEST_TIMEOUT_SECONDS")?,
        })
    }

    /// Build the server command line described by this configuration
    pub fn launch_command(&self) -> LaunchCommand {
        let mut command = LaunchCommand::new(&self.launch_program, &self.model_path)
            .host(&self.host)
            .mem_fraction_static(self.mem_fraction_static);
        if let Some(template) = &self.chat_template {
            command = command.chat_template(template);
        }
        if let Some(parser) = &self.reasoning_parser {
            command = command.reasoning_parser(parser);
        }
        command
    }

    /// Port selection for the launcher
    pub fn port_choice(&self) -> PortChoice {
        match self.port {
            Some(port) => PortChoice::Fixed(port),
            None => PortChoice::Dynamic,
        }
    }

    /// Readiness polling policy
    pub fn readiness_policy(&self) -> ReadinessPolicy {
        ReadinessPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.ready_timeout_seconds),
        }
    }

    /// Build the shared HTTP client
    pub fn http_client(&self) -> crate::error::Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(self.request_timeout_seconds))
            .build()?;
        Ok(client)
    }
}
