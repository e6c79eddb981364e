// Subscribe mode implementation
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::cli::output::EnvelopeWriter;
use crate::core::{AckReader, InflightTable};
use crate::pubsub::{MessageHandler, PubSubProvider, ReceivedMessage};
use crate::types::Envelope;

/// Holds each delivery in the inflight table and prints it.
pub struct SubscribeHandler<W> {
    table: Arc<InflightTable<ReceivedMessage>>,
    writer: Arc<EnvelopeWriter<W>>,
}

impl<W> SubscribeHandler<W> {
    /// Create a handler storing into `table` and printing to `writer`.
    pub fn new(table: Arc<InflightTable<ReceivedMessage>>, writer: Arc<EnvelopeWriter<W>>) -> Self {
        Self { table, writer }
    }
}

#[async_trait]
impl<W> MessageHandler for SubscribeHandler<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn handle(&self, message: ReceivedMessage) -> crate::Result<()> {
        let envelope = Envelope::from_received(&message);
        let ack_id = message.ack_id.clone();
        // Stored before printing so an ID seen on stdout is always ackable.
        if let Some(replaced) = self.table.insert(message.id().to_string(), message) {
            if replaced.ack_id != ack_id {
                debug!("Redelivery of {} replaces ack ID {}", replaced.id(), replaced.ack_id);
                replaced.release();
            }
        }
        self.writer.emit(&envelope).await
    }
}

/// Receive from `subscription`, printing every delivery and acknowledging
/// the IDs read from `acks`.
///
/// Deliveries stay in `table` until their ID arrives on `acks`. The ack
/// reader runs on its own task; reaching the end of `acks` stops only the
/// reader, not the receive loop.
pub async fn execute<R, W>(
    provider: &dyn PubSubProvider,
    subscription: &str,
    table: Arc<InflightTable<ReceivedMessage>>,
    acks: R,
    writer: Arc<EnvelopeWriter<W>>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let reader = AckReader::new(table.clone());
    let ack_task = tokio::spawn(async move {
        let result = reader.run(acks).await;
        if let Err(e) = &result {
            warn!("Ack reader stopped: {}", e);
        }
        result
    });

    info!("subscribed to {}", subscription);
    let handler = Arc::new(SubscribeHandler::new(table, writer));

    if let Err(e) = provider.receive(subscription, handler).await {
        ack_task.abort();
        return Err(e).with_context(|| format!("Receive from {} failed", subscription));
    }

    // The receive loop only ends on its own for finite providers; let the
    // reader finish the ack stream.
    ack_task
        .await
        .context("Ack reader panicked")?
        .context("Ack reader failed")?;
    Ok(())
}
