//! Lease management for held deliveries.
//!
//! Every delivery handed to a handler holds a flow-control permit and a lease
//! entry keyed by its ack ID. While the entry exists its ack deadline keeps
//! being extended. The entry (and the permit with it) goes away when the
//! delivery is acknowledged or when it has been held for longer than the
//! maximum extension, after which the service will redeliver it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, warn};

use crate::config::ReceiveConfig;
use crate::pubsub::rest::RestClient;
use crate::pubsub::types::ResourceName;

/// Maximum ack IDs per modifyAckDeadline request.
const MAX_IDS_PER_REQUEST: usize = 2500;

struct Lease {
    received_at: Instant,
    _permit: Option<OwnedSemaphorePermit>,
}

/// Result of a sweep over held leases.
#[derive(Debug, Default)]
pub struct Sweep {
    /// Ack IDs whose leases were dropped for exceeding the maximum extension.
    pub expired: Vec<String>,
    /// Ack IDs still held and due for extension.
    pub live: Vec<String>,
}

/// Held leases, keyed by ack ID.
#[derive(Clone, Default)]
pub struct LeaseRegistry {
    leases: Arc<DashMap<String, Lease>>,
}

impl LeaseRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start holding a delivery. The permit is released with the lease.
    pub fn track(&self, ack_id: impl Into<String>, permit: Option<OwnedSemaphorePermit>) {
        self.leases.insert(
            ack_id.into(),
            Lease {
                received_at: Instant::now(),
                _permit: permit,
            },
        );
    }

    /// Stop holding a delivery. Returns whether it was held.
    pub fn release(&self, ack_id: &str) -> bool {
        self.leases.remove(ack_id).is_some()
    }

    /// Number of held deliveries.
    pub fn len(&self) -> usize {
        self.leases.len()
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    /// Drop leases held longer than `max_extension`; list the rest.
    pub fn sweep(&self, max_extension: Duration) -> Sweep {
        let mut sweep = Sweep::default();

        self.leases.retain(|ack_id, lease| {
            if lease.received_at.elapsed() >= max_extension {
                sweep.expired.push(ack_id.clone());
                false
            } else {
                sweep.live.push(ack_id.clone());
                true
            }
        });

        sweep
    }
}

/// Periodically extend held leases until the task is aborted.
pub async fn keep_alive(client: RestClient, subscription: ResourceName, leases: LeaseRegistry) {
    let settings: ReceiveConfig = client.receive_config().clone();
    let mut ticker = tokio::time::interval(settings.extension_period());
    // The first tick completes immediately; receipt already set the deadline.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let sweep = leases.sweep(settings.max_extension());
        for ack_id in &sweep.expired {
            warn!(
                "Lease on {} exceeded max extension of {}s, releasing",
                ack_id, settings.max_extension_secs
            );
        }

        if sweep.live.is_empty() {
            continue;
        }

        debug!("Extending {} leases on {}", sweep.live.len(), subscription);
        for chunk in sweep.live.chunks(MAX_IDS_PER_REQUEST) {
            if let Err(e) = client
                .modify_ack_deadline(&subscription, chunk, settings.ack_deadline_secs)
                .await
            {
                warn!("Failed to extend leases on {}: {}", subscription, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Semaphore;

    #[test]
    fn test_track_and_release() {
        let leases = LeaseRegistry::new();
        leases.track("ack-1", None);
        leases.track("ack-2", None);
        assert_eq!(leases.len(), 2);

        assert!(leases.release("ack-1"));
        assert!(!leases.release("ack-1"));
        assert_eq!(leases.len(), 1);
    }

    #[test]
    fn test_release_returns_permit() {
        let flow = Arc::new(Semaphore::new(1));
        let leases = LeaseRegistry::new();

        let permit = flow.clone().try_acquire_owned().unwrap();
        leases.track("ack-1", Some(permit));
        assert_eq!(flow.available_permits(), 0);

        leases.release("ack-1");
        assert_eq!(flow.available_permits(), 1);
    }

    #[test]
    fn test_sweep_keeps_fresh_leases() {
        let leases = LeaseRegistry::new();
        leases.track("ack-1", None);

        let sweep = leases.sweep(Duration::from_secs(3600));
        assert_eq!(sweep.live, vec!["ack-1".to_string()]);
        assert!(sweep.expired.is_empty());
        assert_eq!(leases.len(), 1);
    }

    #[test]
    fn test_sweep_drops_expired_leases_and_permits() {
        let flow = Arc::new(Semaphore::new(2));
        let leases = LeaseRegistry::new();
        leases.track("ack-1", Some(flow.clone().try_acquire_owned().unwrap()));
        leases.track("ack-2", Some(flow.clone().try_acquire_owned().unwrap()));

        let mut sweep = leases.sweep(Duration::ZERO);
        sweep.expired.sort();
        assert_eq!(sweep.expired, vec!["ack-1".to_string(), "ack-2".to_string()]);
        assert!(sweep.live.is_empty());
        assert!(leases.is_empty());
        assert_eq!(flow.available_permits(), 2);
    }
}
