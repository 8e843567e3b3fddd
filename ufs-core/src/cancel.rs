// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cancellation checkpoints

pub use tokio_util::sync::CancellationToken;

use crate::error::{StorageError, StorageResult};

/// Fail with [`StorageError::Cancelled`] once `token` has been signalled
pub fn checkpoint(token: &CancellationToken) -> StorageResult<()> {
    if token.is_cancelled() {
        Err(StorageError::Cancelled)
    } else {
        Ok(())
    }
}
