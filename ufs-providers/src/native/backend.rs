// SPDX-License-Identifier: AGPL-3.0-or-later
//! Native storage provider over a [`NativeStore`]

use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use tracing::debug;
use ufs_core::{
    backend::{FileStream, Materialized, NativeCollision, StorageBackend, StorageCapabilities},
    collision::CollisionPolicy,
    entry::{AccessMode, EntryKind, NativeId, Probe},
    error::{ErrorKind, StorageError, StorageResult},
    path::{PathResolver, StoragePath},
    provider::StorageProvider,
    roots::{PlatformContext, StorageRoot, StorageRoots},
    StorageConfig,
};

use super::memory::MemoryStore;
use super::store::{
    classify_native_error, codes, CreationCollisionOption, ItemKind, NameCollisionOption,
    NativeError, NativeStore, StorageItem,
};

/// Where a native call was aimed, for turning its error into a typed one
struct Site<'a> {
    /// Entry the call needed to find
    subject: &'a StoragePath,
    kind: EntryKind,
    /// Path the call was going to occupy
    target: &'a StoragePath,
}

impl Site<'_> {
    fn error(&self, err: NativeError) -> StorageError {
        if err.code == codes::E_PATH_NOT_FOUND {
            let folder = self.target.parent().unwrap_or_else(|| self.target.clone());
            return StorageError::DirectoryNotFound(folder);
        }
        match classify_native_error(err.code) {
            ErrorKind::NotFound => StorageError::not_found(self.kind, self.subject.clone()),
            ErrorKind::AlreadyExists => StorageError::AlreadyExists(self.target.clone()),
            ErrorKind::InvalidArgument => StorageError::InvalidArgument(err.message),
            ErrorKind::Unsupported => StorageError::Unsupported(err.message),
            ErrorKind::Cancelled => StorageError::Cancelled,
            ErrorKind::Io => StorageError::io(
                format!("native call failed for {}", self.subject),
                io::Error::other(err),
            ),
        }
    }
}

/// Backend for handle-based native storage
pub struct NativeBackend<S> {
    id: String,
    store: S,
    resolver: Arc<PathResolver>,
    capabilities: StorageCapabilities,
    copy_buffer_size: usize,
}

impl<S: NativeStore> NativeBackend<S> {
    pub fn new(id: impl Into<String>, store: S, resolver: Arc<PathResolver>, copy_buffer_size: usize) -> Self {
        Self {
            id: id.into(),
            store,
            resolver,
            capabilities: StorageCapabilities::native_storage(),
            copy_buffer_size,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn materialize(&self, item: StorageItem) -> Materialized {
        Materialized {
            path: StoragePath::new(Arc::clone(&self.resolver), &item.path),
            native: NativeId::new(item.id.to_string()),
        }
    }

    fn probe_of(item: &StorageItem) -> Probe {
        let id = NativeId::new(item.id.to_string());
        match item.kind {
            ItemKind::File => Probe::File(id),
            ItemKind::Folder => Probe::Directory(id),
        }
    }

    /// Parent folder and leaf of an exact path
    fn split<'p>(&self, path: &'p StoragePath) -> StorageResult<(StoragePath, &'p str)> {
        match path.parent() {
            Some(parent) if !path.leaf_name().is_empty() => Ok((parent, path.leaf_name())),
            _ => Err(StorageError::InvalidArgument(format!("'{path}' has no parent folder"))),
        }
    }

    async fn remove(&self, path: &StoragePath, kind: EntryKind) -> StorageResult<()> {
        let site = Site { subject: path, kind, target: path };
        self.store.delete(path.as_str()).await.map_err(|e| site.error(e))?;
        debug!(path = %path, %kind, "native delete");
        Ok(())
    }
}

#[async_trait]
impl<S: NativeStore + 'static> StorageBackend for NativeBackend<S> {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Native Storage"
    }

    fn capabilities(&self) -> &StorageCapabilities {
        &self.capabilities
    }

    fn resolver(&self) -> &Arc<PathResolver> {
        &self.resolver
    }

    fn copy_buffer_size(&self) -> usize {
        self.copy_buffer_size
    }

    async fn probe(&self, path: &StoragePath) -> StorageResult<Probe> {
        match self.store.get_item(path.as_str()).await {
            Ok(item) => Ok(Self::probe_of(&item)),
            Err(e) if classify_native_error(e.code) == ErrorKind::NotFound => Ok(Probe::Missing),
            Err(e) => Err(Site { subject: path, kind: EntryKind::File, target: path }.error(e)),
        }
    }

    async fn create_file(&self, path: &StoragePath) -> StorageResult<NativeId> {
        let (parent, name) = self.split(path)?;
        self.create_file_in(&parent, name, CollisionPolicy::FailIfExists)
            .await
            .map(|placed| placed.native)
    }

    async fn create_directory(&self, path: &StoragePath) -> StorageResult<NativeId> {
        let (parent, name) = self.split(path)?;
        self.create_directory_in(&parent, name, CollisionPolicy::FailIfExists)
            .await
            .map(|placed| placed.native)
    }

    async fn remove_file(&self, path: &StoragePath) -> StorageResult<()> {
        self.remove(path, EntryKind::File).await
    }

    async fn remove_directory(&self, path: &StoragePath) -> StorageResult<()> {
        self.remove(path, EntryKind::Directory).await
    }

    async fn rename(&self, from: &StoragePath, to: &StoragePath) -> StorageResult<NativeId> {
        let (parent, name) = self.split(to)?;
        NativeCollision::move_file(self, from, &parent, name, CollisionPolicy::FailIfExists)
            .await
            .map(|placed| placed.native)
    }

    async fn list(&self, dir: &StoragePath) -> StorageResult<Vec<(StoragePath, Probe)>> {
        let site = Site { subject: dir, kind: EntryKind::Directory, target: dir };
        let items = self.store.children(dir.as_str()).await.map_err(|e| match e.code {
            // A missing folder is the listed directory itself
            codes::E_PATH_NOT_FOUND => StorageError::DirectoryNotFound(dir.clone()),
            _ => site.error(e),
        })?;
        Ok(items
            .iter()
            .map(|item| (StoragePath::new(Arc::clone(&self.resolver), &item.path), Self::probe_of(item)))
            .collect())
    }

    async fn open(&self, path: &StoragePath, mode: AccessMode) -> StorageResult<FileStream> {
        let site = Site { subject: path, kind: EntryKind::File, target: path };
        self.store.open(path.as_str(), mode).await.map_err(|e| site.error(e))
    }

    fn native_collision(&self) -> Option<&dyn NativeCollision> {
        Some(self)
    }
}

impl<S: NativeStore> NativeBackend<S> {
    async fn create_file_in(
        &self,
        parent: &StoragePath,
        name: &str,
        policy: CollisionPolicy,
    ) -> StorageResult<Materialized> {
        let target = parent.join(name);
        let site = Site { subject: &target, kind: EntryKind::File, target: &target };
        let item = self
            .store
            .create_file(parent.as_str(), name, CreationCollisionOption::from(policy))
            .await
            .map_err(|e| site.error(e))?;
        debug!(path = %item.path, %policy, "native create file");
        Ok(self.materialize(item))
    }

    async fn create_directory_in(
        &self,
        parent: &StoragePath,
        name: &str,
        policy: CollisionPolicy,
    ) -> StorageResult<Materialized> {
        let target = parent.join(name);
        let site = Site { subject: &target, kind: EntryKind::Directory, target: &target };
        let item = self
            .store
            .create_folder(parent.as_str(), name, CreationCollisionOption::from(policy))
            .await
            .map_err(|e| site.error(e))?;
        debug!(path = %item.path, %policy, "native create folder");
        Ok(self.materialize(item))
    }
}

#[async_trait]
impl<S: NativeStore + 'static> NativeCollision for NativeBackend<S> {
    async fn create_file(
        &self,
        parent: &StoragePath,
        name: &str,
        policy: CollisionPolicy,
    ) -> StorageResult<Materialized> {
        self.create_file_in(parent, name, policy).await
    }

    async fn create_directory(
        &self,
        parent: &StoragePath,
        name: &str,
        policy: CollisionPolicy,
    ) -> StorageResult<Materialized> {
        self.create_directory_in(parent, name, policy).await
    }

    async fn move_file(
        &self,
        source: &StoragePath,
        parent: &StoragePath,
        name: &str,
        policy: CollisionPolicy,
    ) -> StorageResult<Materialized> {
        let option = NameCollisionOption::try_from(policy)?;
        let target = parent.join(name);
        let site = Site { subject: source, kind: EntryKind::File, target: &target };
        let item = self
            .store
            .move_file(source.as_str(), parent.as_str(), name, option)
            .await
            .map_err(|e| site.error(e))?;
        debug!(from = %source, to = %item.path, %policy, "native move");
        Ok(self.materialize(item))
    }

    async fn copy_file(
        &self,
        source: &StoragePath,
        parent: &StoragePath,
        name: &str,
        policy: CollisionPolicy,
    ) -> StorageResult<Materialized> {
        let option = NameCollisionOption::try_from(policy)?;
        let target = parent.join(name);
        let site = Site { subject: source, kind: EntryKind::File, target: &target };
        let item = self
            .store
            .copy_file(source.as_str(), parent.as_str(), name, option)
            .await
            .map_err(|e| site.error(e))?;
        debug!(from = %source, to = %item.path, %policy, "native copy");
        Ok(self.materialize(item))
    }
}

/// Storage provider backed by a native store
pub struct NativeFileSystem<S> {
    backend: Arc<NativeBackend<S>>,
    roots: StorageRoots,
}

impl<S: NativeStore + 'static> NativeFileSystem<S> {
    /// `store` must already contain the roots named by `context`
    pub fn new(store: S, context: &PlatformContext, config: &StorageConfig) -> Self {
        let resolver = Arc::new(context.resolver());
        let roots = StorageRoots::new(context, &resolver);
        let backend = Arc::new(NativeBackend::new("native", store, resolver, config.copy_buffer_size));
        Self { backend, roots }
    }

    pub fn native_backend(&self) -> &Arc<NativeBackend<S>> {
        &self.backend
    }
}

impl NativeFileSystem<MemoryStore> {
    /// Fresh in-memory store with the context's roots in place
    pub fn in_memory(context: &PlatformContext, config: &StorageConfig) -> Self {
        let store = MemoryStore::new(Arc::new(context.resolver()));
        let fs = Self::new(store, context, config);
        for root in StorageRoot::ALL {
            if let Ok(path) = fs.roots.path(root) {
                fs.backend.store().create_root(path.as_str());
            }
        }
        fs
    }
}

#[async_trait]
impl<S: NativeStore + 'static> StorageProvider for NativeFileSystem<S> {
    fn backend(&self) -> Arc<dyn StorageBackend> {
        self.backend.clone()
    }

    fn roots(&self) -> &StorageRoots {
        &self.roots
    }
}
