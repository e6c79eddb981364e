// CLI module for pubsub-pipe
/// Command execution handlers
pub mod commands;
/// Output formatting utilities
pub mod output;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{LogFormat, PipeConfig, PubsubConfig, ReceiveConfig, DEFAULT_ENDPOINT};

/// Command-line interface for pubsub-pipe
#[derive(Parser, Debug)]
#[command(name = "pubsub-pipe")]
#[command(author, version, about = "Pipe stdin/stdout lines to and from Google Cloud Pub/Sub", long_about = None)]
pub struct Cli {
    /// GCP project ID
    pub project: String,

    /// Topic (push, publish) or subscription (subscribe, drain) ID
    pub name: String,

    /// What to do
    #[arg(value_enum)]
    pub mode: Mode,

    /// Message body for push mode (default: first line of stdin)
    pub body: Option<String>,

    /// Service account credentials file
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", hide_env_values = true)]
    pub credentials: Option<PathBuf>,

    /// Pub/Sub emulator host:port (disables authentication)
    #[arg(long, env = "PUBSUB_EMULATOR_HOST")]
    pub emulator_host: Option<String>,

    /// Pub/Sub REST endpoint
    #[arg(long, env = "PUBSUB_PIPE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Maximum delivered-but-unacknowledged messages
    #[arg(long, env = "PUBSUB_PIPE_MAX_OUTSTANDING", default_value = "1000")]
    pub max_outstanding_messages: usize,

    /// Maximum concurrent message handlers (default: CPUs * 2)
    #[arg(long, env = "PUBSUB_PIPE_NUM_WORKERS")]
    pub num_workers: Option<usize>,

    /// Ack deadline in seconds requested for held messages
    #[arg(long, env = "PUBSUB_PIPE_ACK_DEADLINE", default_value = "60")]
    pub ack_deadline: u64,

    /// How long held messages keep being extended, in seconds
    #[arg(long, env = "PUBSUB_PIPE_MAX_EXTENSION", default_value = "3600")]
    pub max_extension: u64,

    /// Log format
    #[arg(long, env = "PUBSUB_PIPE_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Publish one message and exit
    Push,
    /// Publish every stdin line as a message
    Publish,
    /// Print messages as JSON and ack the IDs read from stdin
    Subscribe,
    /// Print messages as JSON and ack them immediately
    Drain,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Assemble the runtime configuration from the parsed arguments.
    pub fn to_config(&self) -> PipeConfig {
        let defaults = ReceiveConfig::default();

        let mut config = PipeConfig {
            pubsub: PubsubConfig {
                project_id: self.project.clone(),
                endpoint: self.endpoint.clone(),
                emulator_host: self.emulator_host.clone().filter(|h| !h.is_empty()),
                credentials_path: self.credentials.clone(),
                ..PubsubConfig::default()
            },
            receive: ReceiveConfig {
                max_outstanding_messages: self.max_outstanding_messages,
                num_workers: self.num_workers.unwrap_or(defaults.num_workers),
                ack_deadline_secs: self.ack_deadline,
                max_extension_secs: self.max_extension,
                ..defaults
            },
            ..PipeConfig::default()
        };
        config.logging.format = self.log_format;
        config
    }
}
