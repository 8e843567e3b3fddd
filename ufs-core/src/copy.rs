// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bounded-buffer byte transfer

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::cancel::{checkpoint, CancellationToken};
use crate::error::StorageResult;

/// 80 KiB, small enough to keep per-copy memory flat
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 81_920;

/// Copy `reader` to EOF into `writer`, one buffer at a time.
///
/// Cancellation is checked before every read. Whatever was written before a
/// cancelled checkpoint stays written.
pub async fn transfer<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
    cancel: &CancellationToken,
) -> StorageResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        checkpoint(cancel)?;
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buffer[..n]).await?;
        total += n as u64;
    }

    writer.flush().await?;
    Ok(total)
}
