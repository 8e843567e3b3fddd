// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage backend trait

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite};

use crate::{
    collision::CollisionPolicy,
    copy::DEFAULT_COPY_BUFFER_SIZE,
    entry::{AccessMode, NativeId, Probe},
    error::StorageResult,
    path::{PathResolver, StoragePath},
};

/// Readable, writable, seekable byte stream over one file
pub trait ByteStream: AsyncRead + AsyncWrite + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + AsyncSeek + Send + Unpin> ByteStream for T {}

/// Open file stream, exclusively owned by the caller
pub type FileStream = Box<dyn ByteStream>;

/// Storage backend capabilities
#[derive(Debug, Clone, Default)]
pub struct StorageCapabilities {
    /// `get_file`/`get_directory` try to resolve a native reference up front
    pub eager_resolution: bool,
}

impl StorageCapabilities {
    pub fn hierarchical_filesystem() -> Self {
        Self { eager_resolution: false }
    }

    pub fn native_storage() -> Self {
        Self { eager_resolution: true }
    }
}

/// Where an atomic native operation put its result
#[derive(Debug, Clone)]
pub struct Materialized {
    pub path: StoragePath,
    pub native: NativeId,
}

/// Storage backend trait
///
/// Primitives operate on exact paths and never resolve collisions themselves;
/// the handles in [`crate::entry`] layer the collision protocol on top.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn id(&self) -> &str;
    fn display_name(&self) -> &str;
    fn capabilities(&self) -> &StorageCapabilities;
    fn resolver(&self) -> &Arc<PathResolver>;

    fn copy_buffer_size(&self) -> usize {
        DEFAULT_COPY_BUFFER_SIZE
    }

    /// Non-destructive existence probe. Only "not found" maps to [`Probe::Missing`].
    async fn probe(&self, path: &StoragePath) -> StorageResult<Probe>;

    /// Create an empty file; fails with `AlreadyExists` rather than clobbering
    async fn create_file(&self, path: &StoragePath) -> StorageResult<NativeId>;

    /// Create a directory; fails with `AlreadyExists` rather than merging
    async fn create_directory(&self, path: &StoragePath) -> StorageResult<NativeId>;

    async fn remove_file(&self, path: &StoragePath) -> StorageResult<()>;

    /// Recursive
    async fn remove_directory(&self, path: &StoragePath) -> StorageResult<()>;

    /// Atomic native move of a file to an exact destination
    async fn rename(&self, from: &StoragePath, to: &StoragePath) -> StorageResult<NativeId>;

    /// Immediate children of `dir`, snapshot at call time
    async fn list(&self, dir: &StoragePath) -> StorageResult<Vec<(StoragePath, Probe)>>;

    /// `ReadOnly` requires the file; `ReadWrite` opens or creates it without truncating
    async fn open(&self, path: &StoragePath, mode: AccessMode) -> StorageResult<FileStream>;

    /// Atomic collision handling, when the native API has it
    fn native_collision(&self) -> Option<&dyn NativeCollision> {
        None
    }
}

/// Native operations that resolve name collisions themselves.
///
/// The unified policy is translated one-to-one; the core does no probing for
/// backends that expose this.
#[async_trait]
pub trait NativeCollision: Send + Sync {
    async fn create_file(
        &self,
        parent: &StoragePath,
        name: &str,
        policy: CollisionPolicy,
    ) -> StorageResult<Materialized>;

    async fn create_directory(
        &self,
        parent: &StoragePath,
        name: &str,
        policy: CollisionPolicy,
    ) -> StorageResult<Materialized>;

    async fn move_file(
        &self,
        source: &StoragePath,
        parent: &StoragePath,
        name: &str,
        policy: CollisionPolicy,
    ) -> StorageResult<Materialized>;

    async fn copy_file(
        &self,
        source: &StoragePath,
        parent: &StoragePath,
        name: &str,
        policy: CollisionPolicy,
    ) -> StorageResult<Materialized>;
}
