//! Byte-oriented line reading for stdin.
//!
//! Bodies are forwarded as raw bytes, so lines are read without requiring
//! valid UTF-8. A trailing `\n` or `\r\n` is stripped.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::Result;

/// Read the next line, or `None` at end of input.
pub async fn next_line<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line).await? == 0 {
        return Ok(None);
    }

    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }

    Ok(Some(line))
}
