//! Module `engine`
//!
//! Pumps bytes from a source to a destination under a rate limit. The same
//! loop serves both directions: uploads pass (local file, data socket) and
//! downloads pass (data socket, local file).

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::TransferError;
use crate::transfer::rate_limit::{RateLimit, RateLimiter};

/// Moves bytes until the source reports end of stream or a read error, and
/// returns how many bytes were moved.
///
/// Each window's quota is read in chunks of at most `buffer_size` bytes and
/// every chunk is written out as soon as it is read. A failed read ends the
/// transfer normally with the count so far. A failed write ends it with
/// [`TransferError::WriteFailed`]; the chunk that failed to be written is
/// included in `bytes_transferred`.
pub async fn transmit<R, W>(
    source: &mut R,
    destination: &mut W,
    limit: RateLimit,
    buffer_size: usize,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut limiter = RateLimiter::new(limit, buffer_size);
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total: u64 = 0;

    'windows: loop {
        let mut left = limiter.next_quota().await;

        while left > 0 {
            let want = left.min(buffer.len() as u64) as usize;
            let n = match source.read(&mut buffer[..want]).await {
                Ok(0) => break 'windows,
                Ok(n) => n,
                Err(e) => {
                    warn!("Read error after {} bytes, ending transfer: {}", total, e);
                    break 'windows;
                }
            };

            total += n as u64;
            if let Err(e) = destination.write_all(&buffer[..n]).await {
                return Err(TransferError::WriteFailed {
                    bytes_transferred: total,
                    source: e,
                });
            }
            left -= n as u64;
        }

        if let RateLimit::BytesPerSec(_) = limiter.limit() {
            debug!("Transferred {} bytes so far", total);
        }
    }

    destination
        .flush()
        .await
        .map_err(|e| TransferError::WriteFailed {
            bytes_transferred: total,
            source: e,
        })?;
    Ok(total)
}
