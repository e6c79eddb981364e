//! Configuration system for pubsub-pipe.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Default Pub/Sub REST endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://pubsub.googleapis.com";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipeConfig {
    /// Connection configuration.
    pub pubsub: PubsubConfig,
    /// Receive loop configuration.
    pub receive: ReceiveConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubsubConfig {
    /// Project ID that owns the topic or subscription.
    pub project_id: String,
    /// REST endpoint, used when no emulator host is set.
    pub endpoint: String,
    /// Emulator `host:port`. Disables authentication when set.
    pub emulator_host: Option<String>,
    /// Explicit service account credentials file.
    pub credentials_path: Option<PathBuf>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for PubsubConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            emulator_host: None,
            credentials_path: None,
            request_timeout_secs: 120,
        }
    }
}

impl PubsubConfig {
    /// Base URL all REST paths are appended to.
    pub fn base_url(&self) -> String {
        match &self.emulator_host {
            Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
                host.trim_end_matches('/').to_string()
            }
            Some(host) => format!("http://{}", host.trim_end_matches('/')),
            None => self.endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Receive loop configuration: flow control, worker count and leasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveConfig {
    /// Maximum delivered-but-unacknowledged messages.
    pub max_outstanding_messages: usize,
    /// Maximum concurrent handler invocations.
    pub num_workers: usize,
    /// Upper bound on messages requested per pull.
    pub max_messages_per_pull: usize,
    /// Ack deadline requested for held messages, in seconds (10-600).
    pub ack_deadline_secs: u64,
    /// How long a held message keeps being extended, in seconds.
    pub max_extension_secs: u64,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            max_outstanding_messages: 1000,
            num_workers: num_cpus::get() * 2,
            max_messages_per_pull: 100,
            ack_deadline_secs: 60,
            max_extension_secs: 3600,
        }
    }
}

impl ReceiveConfig {
    /// Ack deadline as a duration.
    pub fn ack_deadline(&self) -> Duration {
        Duration::from_secs(self.ack_deadline_secs)
    }

    /// Maximum lease extension as a duration.
    pub fn max_extension(&self) -> Duration {
        Duration::from_secs(self.max_extension_secs)
    }

    /// How often held leases are extended.
    pub fn extension_period(&self) -> Duration {
        Duration::from_secs((self.ack_deadline_secs / 2).max(1))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub level: String,
    /// Log format (text or json).
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log format enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text format.
    Text,
    /// JSON format.
    Json,
}

impl PipeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.pubsub.project_id.is_empty() {
            return Err(Error::Config("project ID must not be empty".to_string()));
        }
        if self.pubsub.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request timeout must be at least 1 second".to_string(),
            ));
        }

        let receive = &self.receive;
        if receive.max_outstanding_messages == 0 {
            return Err(Error::Config(
                "max outstanding messages must be at least 1".to_string(),
            ));
        }
        if receive.num_workers == 0 {
            return Err(Error::Config("worker count must be at least 1".to_string()));
        }
        if receive.max_messages_per_pull == 0 {
            return Err(Error::Config(
                "messages per pull must be at least 1".to_string(),
            ));
        }
        if !(10..=600).contains(&receive.ack_deadline_secs) {
            return Err(Error::Config(format!(
                "ack deadline must be 10-600 seconds, got {}",
                receive.ack_deadline_secs
            )));
        }
        if receive.max_extension_secs < receive.ack_deadline_secs {
            return Err(Error::Config(format!(
                "max extension ({}s) must not be shorter than the ack deadline ({}s)",
                receive.max_extension_secs, receive.ack_deadline_secs
            )));
        }

        Ok(())
    }
}
