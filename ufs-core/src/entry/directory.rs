// SPDX-License-Identifier: AGPL-3.0-or-later
//! Directory handle

use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use super::{locate, validate_leaf_name, EntryKind, File, HandleState, NativeId, Probe};
use crate::backend::StorageBackend;
use crate::cancel::{checkpoint, CancellationToken};
use crate::collision::{evict, CollisionContext, CollisionPolicy, CollisionResolver, Resolution};
use crate::error::{StorageError, StorageResult};
use crate::glob::NameMask;
use crate::path::StoragePath;

/// Reference to a directory location
#[derive(Clone)]
pub struct Directory {
    backend: Arc<dyn StorageBackend>,
    state: HandleState,
}

impl Directory {
    /// Path-only handle. Never touches storage.
    pub fn new(backend: Arc<dyn StorageBackend>, path: StoragePath) -> Self {
        Self { backend, state: HandleState::Unresolved(path) }
    }

    pub(crate) fn from_state(backend: Arc<dyn StorageBackend>, state: HandleState) -> Self {
        Self { backend, state }
    }

    pub fn name(&self) -> &str {
        self.path().leaf_name()
    }

    pub fn path(&self) -> &StoragePath {
        self.state.path()
    }

    pub fn state(&self) -> &HandleState {
        &self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.state.is_resolved()
    }

    /// Answered from the path alone; storage roots never need a lookup
    pub fn is_root(&self) -> bool {
        self.path().is_root()
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Non-destructive probe; a file at this path counts as missing
    pub async fn exists(&mut self, cancel: &CancellationToken) -> StorageResult<bool> {
        checkpoint(cancel)?;
        let probe = self.backend.probe(self.path()).await?;
        Ok(self.state.observe(&probe, EntryKind::Directory))
    }

    /// Like `exists`, for callers that only hold `&self`
    async fn require(&self, cancel: &CancellationToken) -> StorageResult<NativeId> {
        checkpoint(cancel)?;
        match self.backend.probe(self.path()).await? {
            Probe::Directory(native) => Ok(native),
            _ => Err(StorageError::DirectoryNotFound(self.path().clone())),
        }
    }

    /// Handle to the file `name` in this directory, whether or not it exists
    pub async fn get_file(&self, name: &str, cancel: &CancellationToken) -> StorageResult<File> {
        validate_leaf_name(name, self.path())?;
        checkpoint(cancel)?;
        let state = locate(&self.backend, self.path().join(name), EntryKind::File).await?;
        Ok(File::from_state(Arc::clone(&self.backend), state))
    }

    /// Handle to the subdirectory `name`, whether or not it exists
    pub async fn get_directory(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<Directory> {
        validate_leaf_name(name, self.path())?;
        checkpoint(cancel)?;
        let state = locate(&self.backend, self.path().join(name), EntryKind::Directory).await?;
        Ok(Directory::from_state(Arc::clone(&self.backend), state))
    }

    /// Create an empty file named `name`, resolving any collision per `policy`
    pub async fn create_file(
        &self,
        name: &str,
        policy: CollisionPolicy,
        cancel: &CancellationToken,
    ) -> StorageResult<File> {
        let state = self.create_child(name, EntryKind::File, policy, cancel).await?;
        Ok(File::from_state(Arc::clone(&self.backend), state))
    }

    /// Create a subdirectory named `name`, resolving any collision per `policy`
    pub async fn create_directory(
        &self,
        name: &str,
        policy: CollisionPolicy,
        cancel: &CancellationToken,
    ) -> StorageResult<Directory> {
        let state = self.create_child(name, EntryKind::Directory, policy, cancel).await?;
        Ok(Directory::from_state(Arc::clone(&self.backend), state))
    }

    async fn create_child(
        &self,
        name: &str,
        kind: EntryKind,
        policy: CollisionPolicy,
        cancel: &CancellationToken,
    ) -> StorageResult<HandleState> {
        validate_leaf_name(name, self.path())?;
        policy.validate(CollisionContext::Create)?;
        self.require(cancel).await?;

        let backend = self.backend.as_ref();
        if let Some(native) = backend.native_collision() {
            let placed = match kind {
                EntryKind::File => native.create_file(self.path(), name, policy).await?,
                EntryKind::Directory => native.create_directory(self.path(), name, policy).await?,
            };
            debug!(path = %placed.path, %kind, %policy, "created");
            return Ok(HandleState::Resolved { path: placed.path, native: placed.native });
        }

        let resolution = CollisionResolver::new(backend, kind)
            .resolve(self.path(), name, policy, CollisionContext::Create, cancel)
            .await?;
        let path = match resolution {
            Resolution::Existing { path, native } => {
                debug!(path = %path, %kind, "opened existing entry");
                return Ok(HandleState::Resolved { path, native });
            }
            Resolution::Replace { path, occupant } => {
                evict(backend, &path, occupant, None).await?;
                path
            }
            Resolution::Vacant(path) => path,
        };

        let native = match kind {
            EntryKind::File => backend.create_file(&path).await?,
            EntryKind::Directory => backend.create_directory(&path).await?,
        };
        debug!(path = %path, %kind, %policy, "created");
        Ok(HandleState::Resolved { path, native })
    }

    /// Files in this directory, optionally filtered by a `*`/`?` mask
    pub async fn list_files(
        &self,
        pattern: Option<&str>,
        cancel: &CancellationToken,
    ) -> StorageResult<Vec<File>> {
        let mask = pattern.map(NameMask::new).transpose()?;
        self.require(cancel).await?;

        let mut files = Vec::new();
        for (path, probe) in self.backend.list(self.path()).await? {
            let Probe::File(native) = probe else { continue };
            if let Some(mask) = &mask {
                if !mask.is_match(path.leaf_name()) {
                    continue;
                }
            }
            files.push(File::from_state(
                Arc::clone(&self.backend),
                HandleState::Resolved { path, native },
            ));
        }
        trace!(
            dir = %self.path(),
            pattern = mask.as_ref().map(NameMask::pattern),
            count = files.len(),
            "listed files"
        );
        Ok(files)
    }

    pub async fn list_directories(
        &self,
        cancel: &CancellationToken,
    ) -> StorageResult<Vec<Directory>> {
        self.require(cancel).await?;

        let directories: Vec<Directory> = self
            .backend
            .list(self.path())
            .await?
            .into_iter()
            .filter_map(|(path, probe)| match probe {
                Probe::Directory(native) => Some(Directory::from_state(
                    Arc::clone(&self.backend),
                    HandleState::Resolved { path, native },
                )),
                _ => None,
            })
            .collect();
        trace!(dir = %self.path(), count = directories.len(), "listed directories");
        Ok(directories)
    }

    /// Recursive
    pub async fn delete(&mut self, cancel: &CancellationToken) -> StorageResult<()> {
        if !self.exists(cancel).await? {
            return Err(StorageError::DirectoryNotFound(self.path().clone()));
        }
        self.backend.remove_directory(self.path()).await?;
        debug!(path = %self.path(), "deleted directory");
        self.state = HandleState::Unresolved(self.path().clone());
        Ok(())
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_resolved() { "resolved" } else { "unresolved" };
        write!(f, "Name = {} ({state})", self.name())
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.path(), f)
    }
}
