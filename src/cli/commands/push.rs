// Push mode implementation
use anyhow::Context;
use tokio::io::AsyncBufRead;
use tracing::info;

use crate::core::lines::next_line;
use crate::pubsub::PubSubProvider;

/// Publish a single message and return its ID.
///
/// The body is `body` when given, otherwise the first line of `input`; an
/// input already at end of file publishes an empty body.
pub async fn execute<R>(
    provider: &dyn PubSubProvider,
    topic: &str,
    body: Option<String>,
    mut input: R,
) -> anyhow::Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let body = match body {
        Some(body) => body.into_bytes(),
        None => next_line(&mut input)
            .await
            .context("Failed to read message body from stdin")?
            .unwrap_or_default(),
    };

    let id = provider
        .publish(topic, body)
        .await
        .with_context(|| format!("publish error on {}", topic))?;

    info!("published {}", id);
    Ok(id)
}
