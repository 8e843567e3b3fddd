// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage provider: roots plus path-based handle lookup

use async_trait::async_trait;
use std::sync::Arc;

use crate::backend::StorageBackend;
use crate::cancel::{checkpoint, CancellationToken};
use crate::entry::{locate, Directory, EntryKind, File, HandleState};
use crate::error::{StorageError, StorageResult};
use crate::path::StoragePath;
use crate::roots::{StorageRoot, StorageRoots};

/// Entry point to one storage implementation.
///
/// Applications pick a provider at their composition root and reach every
/// file through it.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    fn backend(&self) -> Arc<dyn StorageBackend>;

    fn roots(&self) -> &StorageRoots;

    fn root(&self, root: StorageRoot) -> StorageResult<Directory> {
        let path = self.roots().path(root)?.clone();
        Ok(Directory::new(self.backend(), path))
    }

    fn local_storage(&self) -> StorageResult<Directory> {
        self.root(StorageRoot::Local)
    }

    /// `Unsupported` on platforms without roaming data
    fn roaming_storage(&self) -> StorageResult<Directory> {
        self.root(StorageRoot::Roaming)
    }

    fn temporary_storage(&self) -> StorageResult<Directory> {
        self.root(StorageRoot::Temporary)
    }

    /// Parse a raw path in this provider's syntax. No I/O.
    fn create_path(&self, raw: &str) -> StoragePath {
        StoragePath::new(Arc::clone(self.backend().resolver()), raw)
    }

    async fn get_file_from_path(
        &self,
        raw: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<File> {
        let backend = self.backend();
        let state = locate_raw(&backend, raw, EntryKind::File, cancel).await?;
        Ok(File::from_state(backend, state))
    }

    async fn get_directory_from_path(
        &self,
        raw: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<Directory> {
        let backend = self.backend();
        let state = locate_raw(&backend, raw, EntryKind::Directory, cancel).await?;
        Ok(Directory::from_state(backend, state))
    }
}

async fn locate_raw(
    backend: &Arc<dyn StorageBackend>,
    raw: &str,
    kind: EntryKind,
    cancel: &CancellationToken,
) -> StorageResult<HandleState> {
    if raw.trim().is_empty() {
        return Err(StorageError::InvalidArgument("path must not be empty".into()));
    }
    checkpoint(cancel)?;
    let path = StoragePath::new(Arc::clone(backend.resolver()), raw);
    locate(backend, path, kind).await
}
