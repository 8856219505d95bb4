//! Bounded stream readers for untrusted child output.
//!
//! Rules:
//! - stdout is read up to a ceiling. One byte past the ceiling stops reading and
//!   flags the result as truncated; the caller must treat it as a failure.
//! - stderr is always drained to EOF (a blocked stderr pipe would stall the
//!   child) but only the first `cap` bytes are retained.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK: usize = 8 * 1024;
/// Upfront allocation cap, independent of the configured ceiling.
const INITIAL_CAPACITY: usize = 64 * 1024;

/// Captured stdout.
#[derive(Debug, Clone)]
pub struct BoundedOutput {
    pub bytes: Bytes,
    pub truncated: bool,
}

/// Read until EOF or until more than `limit` bytes arrive.
pub async fn read_bounded<R>(reader: &mut R, limit: usize) -> std::io::Result<BoundedOutput>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(limit.min(INITIAL_CAPACITY));
    let mut chunk = [0u8; CHUNK];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(BoundedOutput {
                bytes: buf.freeze(),
                truncated: false,
            });
        }

        let room = limit.saturating_sub(buf.len());
        if n > room {
            buf.extend_from_slice(&chunk[..room]);
            return Ok(BoundedOutput {
                bytes: buf.freeze(),
                truncated: true,
            });
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Drain `reader` to EOF, keeping at most `cap` bytes as lossy UTF-8.
pub async fn read_capped<R>(mut reader: R, cap: usize) -> String
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::with_capacity(cap.min(INITIAL_CAPACITY));
    let mut dropped: u64 = 0;
    let mut chunk = [0u8; CHUNK];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        let room = cap.saturating_sub(kept.len());
        let take = n.min(room);
        kept.extend_from_slice(&chunk[..take]);
        dropped += (n - take) as u64;
    }

    let mut text = String::from_utf8_lossy(&kept).into_owned();
    if dropped > 0 {
        text.push_str(&format!(" [+{dropped} bytes dropped]"));
    }
    text
}
