// Commands module
/// Drain mode implementation
pub mod drain;
/// Publish mode implementation
pub mod publish;
/// Push mode implementation
pub mod push;
/// Subscribe mode implementation
pub mod subscribe;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tracing::{info, warn};

use crate::cli::output::EnvelopeWriter;
use crate::cli::{Cli, Mode};
use crate::core::InflightTable;
use crate::pubsub::rest::RestClient;
use crate::shutdown;

/// Execute the mode selected on the command line
pub async fn execute_command(cli: Cli) -> anyhow::Result<()> {
    let config = cli.to_config();
    config.validate().context("Invalid configuration")?;

    let client = RestClient::connect(&config.pubsub, config.receive.clone())
        .await
        .context("Failed to create Pub/Sub client")?;

    if cli.body.is_some() && cli.mode != Mode::Push {
        warn!("Body argument is only used in push mode, ignoring it");
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let run = async {
        match cli.mode {
            Mode::Push => push::execute(&client, &cli.name, cli.body.clone(), stdin)
                .await
                .map(|_| ()),
            Mode::Publish => publish::execute(&client, &cli.name, stdin)
                .await
                .map(|_| ()),
            Mode::Subscribe => {
                let writer = Arc::new(EnvelopeWriter::new(tokio::io::stdout()));
                subscribe::execute(&client, &cli.name, Arc::new(InflightTable::new()), stdin, writer)
                    .await
            }
            Mode::Drain => {
                let writer = Arc::new(EnvelopeWriter::new(tokio::io::stdout()));
                drain::execute(&client, &cli.name, writer).await
            }
        }
    };

    tokio::select! {
        result = run => result,
        signal = shutdown::wait_for_signal() => {
            info!("Received {}, exiting", signal);
            Ok(())
        }
    }
}
