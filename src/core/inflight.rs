//! Inflight table: received but not yet acknowledged deliveries.

use dashmap::DashMap;

/// Concurrent map from message ID to the delivery handle.
///
/// Entries are inserted by the receive path and removed exactly once by
/// [`take`](Self::take). There is no expiry: an ID that never shows up on the
/// ack stream stays until the process exits. Inserting an ID that is already
/// present replaces the older handle, so a redelivery is acked through its
/// newest ack ID.
#[derive(Debug)]
pub struct InflightTable<H> {
    entries: DashMap<String, H>,
}

impl<H> InflightTable<H> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Store a handle, returning the one it replaced.
    pub fn insert(&self, id: impl Into<String>, handle: H) -> Option<H> {
        self.entries.insert(id.into(), handle)
    }

    /// Atomically remove and return the handle stored under `id`.
    pub fn take(&self, id: &str) -> Option<H> {
        self.entries.remove(id).map(|(_, handle)| handle)
    }

    /// Whether `id` is currently held.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of held handles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H> Default for InflightTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_insert_then_take_once() {
        let table = InflightTable::new();
        assert!(table.insert("m1", 1).is_none());
        assert!(table.contains("m1"));

        assert_eq!(table.take("m1"), Some(1));
        assert_eq!(table.take("m1"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_take_unknown_id() {
        let table: InflightTable<u32> = InflightTable::new();
        assert_eq!(table.take("never-stored"), None);
    }

    #[test]
    fn test_insert_replaces_older_handle() {
        let table = InflightTable::new();
        table.insert("m1", "first-delivery");
        assert_eq!(table.insert("m1", "redelivery"), Some("first-delivery"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.take("m1"), Some("redelivery"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_insert_and_take() {
        let table = Arc::new(InflightTable::new());

        let writers: Vec<_> = (0..8)
            .map(|w| {
                let table = table.clone();
                tokio::spawn(async move {
                    for i in 0..250 {
                        table.insert(format!("{}-{}", w, i), i);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }
        assert_eq!(table.len(), 2000);

        let takers: Vec<_> = (0..8)
            .map(|w| {
                let table = table.clone();
                tokio::spawn(async move {
                    (0..250)
                        .filter(|i| table.take(&format!("{}-{}", w, i)).is_some())
                        .count()
                })
            })
            .collect();

        let mut taken = 0;
        for taker in takers {
            taken += taker.await.unwrap();
        }
        assert_eq!(taken, 2000);
        assert!(table.is_empty());
    }
}
