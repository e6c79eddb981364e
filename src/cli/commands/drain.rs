// Drain mode implementation
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tracing::{info, warn};

use crate::cli::output::EnvelopeWriter;
use crate::pubsub::{MessageHandler, PubSubProvider, ReceivedMessage};
use crate::types::Envelope;

/// Prints each delivery, then acknowledges it.
pub struct DrainHandler<W> {
    writer: Arc<EnvelopeWriter<W>>,
}

impl<W> DrainHandler<W> {
    /// Create a handler printing to `writer`.
    pub fn new(writer: Arc<EnvelopeWriter<W>>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W> MessageHandler for DrainHandler<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn handle(&self, message: ReceivedMessage) -> crate::Result<()> {
        self.writer.emit(&Envelope::from_received(&message)).await?;

        if let Err(e) = message.ack().await {
            warn!("ack failed {}: {}", message.id(), e);
        }
        Ok(())
    }
}

/// Receive from `subscription`, printing and acknowledging every delivery.
pub async fn execute<W>(
    provider: &dyn PubSubProvider,
    subscription: &str,
    writer: Arc<EnvelopeWriter<W>>,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    info!("draining {}", subscription);
    provider
        .receive(subscription, Arc::new(DrainHandler::new(writer)))
        .await
        .with_context(|| format!("Receive from {} failed", subscription))
}
