// Publish mode implementation
use anyhow::Context;
use tokio::io::AsyncBufRead;
use tracing::info;

use crate::core::lines::next_line;
use crate::pubsub::PubSubProvider;

/// Publish every line of `input` as one message, in order.
///
/// Each publish is awaited before the next line is read. Returns the number
/// of messages published once `input` is exhausted; the first failed publish
/// aborts.
pub async fn execute<R>(provider: &dyn PubSubProvider, topic: &str, mut input: R) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    info!("Publishing stdin lines to {}", topic);
    let mut published = 0;

    while let Some(body) = next_line(&mut input)
        .await
        .context("Failed to read from stdin")?
    {
        let id = provider
            .publish(topic, body)
            .await
            .with_context(|| format!("publish error on {}", topic))?;
        info!("published {}", id);
        published += 1;
    }

    info!("stdin closed, published {} messages", published);
    Ok(published)
}
