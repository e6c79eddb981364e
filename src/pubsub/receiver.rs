//! Pull-based receive loop.
//!
//! Pulls batches from a subscription, hands each delivery to the handler on
//! its own task and keeps the number of outstanding deliveries under the
//! configured flow-control limit. Transient pull failures are retried with
//! capped exponential backoff; anything else ends the loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::pubsub::lease::{self, LeaseRegistry};
use crate::pubsub::rest::RestClient;
use crate::pubsub::types::ResourceName;
use crate::pubsub::{Acknowledger, MessageHandler, ReceivedMessage};

const MIN_BACKOFF_MILLIS: u64 = 100;
const MAX_BACKOFF_MILLIS: u64 = 30_000;

/// Acknowledges deliveries of one subscription and releases their leases.
pub struct SubscriptionAcker {
    client: RestClient,
    subscription: ResourceName,
    leases: LeaseRegistry,
}

impl SubscriptionAcker {
    /// Create an acker for `subscription`.
    pub fn new(client: RestClient, subscription: ResourceName, leases: LeaseRegistry) -> Self {
        Self {
            client,
            subscription,
            leases,
        }
    }
}

#[async_trait]
impl Acknowledger for SubscriptionAcker {
    async fn acknowledge(&self, ack_id: &str) -> Result<()> {
        // Flow control is released whether or not the RPC succeeds; a failed
        // ack surfaces later as a redelivery.
        self.leases.release(ack_id);
        self.client
            .acknowledge(&self.subscription, &[ack_id.to_string()])
            .await
    }

    fn release(&self, ack_id: &str) {
        if self.leases.release(ack_id) {
            debug!("Released lease {}", ack_id);
        }
    }
}

/// Run the receive loop until it fails.
pub async fn run(
    client: RestClient,
    subscription: ResourceName,
    handler: Arc<dyn MessageHandler>,
) -> Result<()> {
    let leases = LeaseRegistry::new();
    let keeper = tokio::spawn(lease::keep_alive(
        client.clone(),
        subscription.clone(),
        leases.clone(),
    ));

    info!("Receiving from {}", subscription);
    let result = pull_loop(&client, &subscription, &leases, handler).await;

    keeper.abort();
    result
}

async fn pull_loop(
    client: &RestClient,
    subscription: &ResourceName,
    leases: &LeaseRegistry,
    handler: Arc<dyn MessageHandler>,
) -> Result<()> {
    let settings = client.receive_config().clone();
    let flow = Arc::new(Semaphore::new(settings.max_outstanding_messages));
    let workers = Arc::new(Semaphore::new(settings.num_workers));
    let acker: Arc<dyn Acknowledger> = Arc::new(SubscriptionAcker::new(
        client.clone(),
        subscription.clone(),
        leases.clone(),
    ));

    // Dropping the set on return aborts in-flight handlers.
    let mut tasks: JoinSet<Result<()>> = JoinSet::new();
    let mut failures: u32 = 0;

    loop {
        // Wait for flow-control room, surfacing handler failures meanwhile.
        let first_permit = tokio::select! {
            permit = flow.clone().acquire_owned() => {
                permit.map_err(|_| Error::Internal("flow control closed".to_string()))?
            }
            Some(joined) = tasks.join_next() => {
                check_handler(joined)?;
                continue;
            }
        };

        let room = 1 + flow.available_permits();
        let max_messages = settings.max_messages_per_pull.min(room);

        let batch = match client.pull(subscription, max_messages).await {
            Ok(batch) => {
                failures = 0;
                batch
            }
            Err(e) if e.is_transient() => {
                let delay = backoff_delay(failures);
                failures = failures.saturating_add(1);
                warn!(
                    "Pull from {} failed, retrying in {:?}: {}",
                    subscription, delay, e
                );
                tokio::time::sleep(delay).await;
                continue;
            }
            Err(e) => return Err(e),
        };

        if batch.is_empty() {
            continue;
        }
        debug!("Pulled {} messages from {}", batch.len(), subscription);

        let ack_ids: Vec<String> = batch.iter().map(|m| m.ack_id.clone()).collect();
        if let Err(e) = client
            .modify_ack_deadline(subscription, &ack_ids, settings.ack_deadline_secs)
            .await
        {
            warn!("Failed to set initial ack deadline on {}: {}", subscription, e);
        }

        let mut first_permit = Some(first_permit);
        for received in batch {
            let permit = match first_permit.take() {
                Some(permit) => permit,
                None => flow
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::Internal("flow control closed".to_string()))?,
            };
            leases.track(received.ack_id.clone(), Some(permit));

            let message = ReceivedMessage::new(
                received.ack_id,
                received.message.into_message(),
                received.delivery_attempt,
                acker.clone(),
            );

            let worker = workers
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::Internal("worker pool closed".to_string()))?;
            let handler = handler.clone();
            tasks.spawn(async move {
                let _worker = worker;
                handler.handle(message).await
            });
        }

        while let Some(joined) = tasks.try_join_next() {
            check_handler(joined)?;
        }
    }
}

fn check_handler(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(Error::Internal(format!("message handler panicked: {}", e))),
    }
}

/// Exponential backoff: min(min * 2^attempt, max)
fn backoff_delay(attempt: u32) -> Duration {
    let millis = MIN_BACKOFF_MILLIS
        .saturating_mul(2_u64.saturating_pow(attempt))
        .min(MAX_BACKOFF_MILLIS);
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(0), Duration::from_millis(100));
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(4), Duration::from_millis(1600));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_delay(9), Duration::from_millis(30_000));
        assert_eq!(backoff_delay(64), Duration::from_millis(30_000));
    }
}
