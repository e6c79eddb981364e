// Output utilities for CLI
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::info;

use crate::types::Envelope;
use crate::Result;

/// Writes envelopes as JSON lines, one per message.
///
/// Every line is also logged. Concurrent handlers share one writer; the lock
/// keeps lines from interleaving.
pub struct EnvelopeWriter<W> {
    out: Mutex<W>,
}

impl<W> EnvelopeWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap an output stream.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Log and print one envelope.
    pub async fn emit(&self, envelope: &Envelope) -> Result<()> {
        let line = envelope.to_json()?;
        info!("{}", line);

        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }

    /// Recover the output stream.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn envelope(id: &str) -> Envelope {
        Envelope {
            id: id.to_string(),
            body: "body".to_string(),
            publish_time: Utc::now(),
            attributes: Default::default(),
            ordering_key: String::new(),
            delivery_attempt: None,
        }
    }

    #[tokio::test]
    async fn test_one_line_per_envelope() {
        let writer = EnvelopeWriter::new(Vec::new());
        writer.emit(&envelope("1")).await.unwrap();
        writer.emit(&envelope("2")).await.unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Envelope = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.id, "1");
        assert!(output.ends_with('\n'));
    }
}
