//! Ack reader: acknowledges held deliveries by message ID read from a line
//! stream.

use std::sync::Arc;

use tokio::io::AsyncBufRead;
use tracing::{info, warn};

use crate::core::inflight::InflightTable;
use crate::core::lines::next_line;
use crate::pubsub::ReceivedMessage;
use crate::Result;

/// Outcome of one ack request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The delivery was held and has been acknowledged.
    Acked,
    /// No delivery is held under that ID.
    NotFound,
    /// The delivery was held but the acknowledge call failed.
    Failed,
}

/// Counts of ack outcomes over a whole stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AckSummary {
    /// Acknowledged deliveries.
    pub acked: usize,
    /// IDs with no held delivery.
    pub not_found: usize,
    /// Failed acknowledge calls.
    pub failed: usize,
}

impl AckSummary {
    fn record(&mut self, outcome: AckOutcome) {
        match outcome {
            AckOutcome::Acked => self.acked += 1,
            AckOutcome::NotFound => self.not_found += 1,
            AckOutcome::Failed => self.failed += 1,
        }
    }
}

/// Resolves message IDs against the inflight table and acknowledges them.
pub struct AckReader {
    table: Arc<InflightTable<ReceivedMessage>>,
}

impl AckReader {
    /// Create a reader over `table`.
    pub fn new(table: Arc<InflightTable<ReceivedMessage>>) -> Self {
        Self { table }
    }

    /// Acknowledge the delivery held under `id`, if any.
    ///
    /// Neither a missing ID nor a failed acknowledge call is an error.
    pub async fn ack(&self, id: &str) -> AckOutcome {
        let Some(received) = self.table.take(id) else {
            info!("ack notfound {}", id);
            return AckOutcome::NotFound;
        };

        match received.ack().await {
            Ok(()) => {
                info!("ack done {}", id);
                AckOutcome::Acked
            }
            Err(e) => {
                warn!("ack failed {}: {}", id, e);
                AckOutcome::Failed
            }
        }
    }

    /// Read IDs line by line until end of input, acknowledging each.
    ///
    /// Surrounding whitespace is trimmed and blank lines are skipped.
    pub async fn run<R>(&self, mut input: R) -> Result<AckSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut summary = AckSummary::default();

        while let Some(line) = next_line(&mut input).await? {
            let line = String::from_utf8_lossy(&line);
            let id = line.trim();
            if id.is_empty() {
                continue;
            }
            summary.record(self.ack(id).await);
        }

        info!(
            "Ack stream closed: {} acked, {} not found, {} failed",
            summary.acked, summary.not_found, summary.failed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubsub::{Acknowledger, Message};
    use crate::Error;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::io::BufReader;

    #[derive(Default)]
    struct RecordingAcker {
        acked: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Acknowledger for RecordingAcker {
        async fn acknowledge(&self, ack_id: &str) -> crate::Result<()> {
            if self.fail {
                return Err(Error::Api {
                    status: 400,
                    message: "invalid ack id".to_string(),
                });
            }
            self.acked.lock().unwrap().push(ack_id.to_string());
            Ok(())
        }
    }

    fn delivery(id: &str, acker: Arc<RecordingAcker>) -> ReceivedMessage {
        ReceivedMessage::new(
            format!("ack-{}", id),
            Message {
                id: id.to_string(),
                data: b"payload".to_vec(),
                attributes: Default::default(),
                publish_time: Default::default(),
                ordering_key: String::new(),
            },
            None,
            acker,
        )
    }

    #[tokio::test]
    async fn test_second_ack_reports_not_found() {
        let acker = Arc::new(RecordingAcker::default());
        let table = Arc::new(InflightTable::new());
        table.insert("m1", delivery("m1", acker.clone()));

        let reader = AckReader::new(table.clone());
        assert_eq!(reader.ack("m1").await, AckOutcome::Acked);
        assert_eq!(reader.ack("m1").await, AckOutcome::NotFound);

        assert_eq!(*acker.acked.lock().unwrap(), vec!["ack-m1".to_string()]);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_fatal() {
        let table = Arc::new(InflightTable::new());
        let reader = AckReader::new(table);

        let summary = reader
            .run(BufReader::new(&b"nope\nstill-nope\n"[..]))
            .await
            .unwrap();
        assert_eq!(
            summary,
            AckSummary {
                acked: 0,
                not_found: 2,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_run_trims_and_skips_blank_lines() {
        let acker = Arc::new(RecordingAcker::default());
        let table = Arc::new(InflightTable::new());
        table.insert("m1", delivery("m1", acker.clone()));
        table.insert("m2", delivery("m2", acker.clone()));

        let reader = AckReader::new(table.clone());
        let summary = reader
            .run(BufReader::new(&b"  m2 \r\n\n\nm1\nm1"[..]))
            .await
            .unwrap();

        assert_eq!(summary.acked, 2);
        assert_eq!(summary.not_found, 1);
        assert_eq!(
            *acker.acked.lock().unwrap(),
            vec!["ack-m2".to_string(), "ack-m1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_ack_still_removes_entry() {
        let acker = Arc::new(RecordingAcker {
            fail: true,
            ..Default::default()
        });
        let table = Arc::new(InflightTable::new());
        table.insert("m1", delivery("m1", acker));

        let reader = AckReader::new(table.clone());
        assert_eq!(reader.ack("m1").await, AckOutcome::Failed);
        assert!(!table.contains("m1"));
    }
}
