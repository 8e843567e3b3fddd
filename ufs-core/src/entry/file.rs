// SPDX-License-Identifier: AGPL-3.0-or-later
//! File handle

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::{validate_leaf_name, AccessMode, Directory, EntryKind, HandleState, NativeId};
use crate::backend::{FileStream, StorageBackend};
use crate::cancel::{checkpoint, CancellationToken};
use crate::collision::{evict, CollisionContext, CollisionPolicy, CollisionResolver, Resolution};
use crate::copy::transfer;
use crate::error::{StorageError, StorageResult};
use crate::path::StoragePath;

/// Reference to a file location; not an open resource
#[derive(Clone)]
pub struct File {
    backend: Arc<dyn StorageBackend>,
    state: HandleState,
}

impl File {
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

    /// Includes the leading dot; a dotfile such as `.gitignore` is all extension
    pub fn extension(&self) -> &str {
        self.path().extension()
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

    /// Owning directory, derived from the path
    pub fn directory(&self) -> Option<Directory> {
        self.path()
            .parent()
            .map(|parent| Directory::new(Arc::clone(&self.backend), parent))
    }

    /// Non-destructive probe; a directory at this path counts as missing
    pub async fn exists(&mut self, cancel: &CancellationToken) -> StorageResult<bool> {
        checkpoint(cancel)?;
        let probe = self.backend.probe(self.path()).await?;
        Ok(self.state.observe(&probe, EntryKind::File))
    }

    async fn ensure_exists(&mut self, cancel: &CancellationToken) -> StorageResult<NativeId> {
        if !self.exists(cancel).await? {
            return Err(StorageError::FileNotFound(self.path().clone()));
        }
        self.state
            .native()
            .cloned()
            .ok_or_else(|| StorageError::FileNotFound(self.path().clone()))
    }

    /// `ReadOnly` requires the file to exist; `ReadWrite` creates it if needed
    pub async fn open(
        &mut self,
        mode: AccessMode,
        cancel: &CancellationToken,
    ) -> StorageResult<FileStream> {
        match mode {
            AccessMode::ReadOnly => {
                self.ensure_exists(cancel).await?;
            }
            AccessMode::ReadWrite => checkpoint(cancel)?,
        }

        let stream = self.backend.open(self.path(), mode).await?;
        if !self.is_resolved() {
            let probe = self.backend.probe(self.path()).await?;
            self.state.observe(&probe, EntryKind::File);
        }
        Ok(stream)
    }

    pub async fn delete(&mut self, cancel: &CancellationToken) -> StorageResult<()> {
        self.ensure_exists(cancel).await?;
        self.backend.remove_file(self.path()).await?;
        debug!(path = %self.path(), "deleted file");
        self.state = HandleState::Unresolved(self.path().clone());
        Ok(())
    }

    /// Move within the current directory
    pub async fn rename(
        &mut self,
        new_name: &str,
        policy: CollisionPolicy,
        cancel: &CancellationToken,
    ) -> StorageResult<&mut Self> {
        validate_leaf_name(new_name, self.path())?;
        let parent = self.path().parent().ok_or_else(|| {
            StorageError::InvalidArgument(format!("'{}' has no parent directory", self.path()))
        })?;
        let destination = parent.join(new_name);
        self.move_to(&destination, policy, cancel).await
    }

    /// Move to `destination`, updating this handle in place.
    ///
    /// The destination is settled before the source is touched, so a
    /// `FailIfExists` collision leaves both entries exactly as they were.
    pub async fn move_to(
        &mut self,
        destination: &StoragePath,
        policy: CollisionPolicy,
        cancel: &CancellationToken,
    ) -> StorageResult<&mut Self> {
        policy.validate(CollisionContext::Relocate)?;
        self.ensure_exists(cancel).await?;

        let source = self.path().clone();
        if destination.as_str() == source.as_str() {
            return Ok(self);
        }
        let (parent, name) = split_destination(destination)?;
        let backend = Arc::clone(&self.backend);

        let (path, native) = if let Some(native) = backend.native_collision() {
            let placed = native.move_file(&source, &parent, name, policy).await?;
            (placed.path, placed.native)
        } else if *destination == source {
            // Same entry under a different spelling, e.g. a case-only rename
            let native = backend.rename(&source, destination).await?;
            (destination.clone(), native)
        } else {
            let resolution = CollisionResolver::new(backend.as_ref(), EntryKind::File)
                .resolve(&parent, name, policy, CollisionContext::Relocate, cancel)
                .await?;
            if let Resolution::Replace { path, occupant } = &resolution {
                evict(backend.as_ref(), path, *occupant, Some(&source)).await?;
            }
            let target = resolution.path().clone();
            let native = backend.rename(&source, &target).await?;
            (target, native)
        };

        debug!(from = %source, to = %path, %policy, "moved file");
        self.state = HandleState::Resolved { path, native };
        Ok(self)
    }

    /// Copy to `destination`; the source is unaffected and a new handle returned
    pub async fn copy_to(
        &self,
        destination: &StoragePath,
        policy: CollisionPolicy,
        cancel: &CancellationToken,
    ) -> StorageResult<File> {
        policy.validate(CollisionContext::Relocate)?;
        let mut source = self.clone();
        source.ensure_exists(cancel).await?;

        if *destination == *source.path() && policy == CollisionPolicy::ReplaceExisting {
            return Err(StorageError::InvalidArgument(format!(
                "cannot copy '{}' onto itself",
                source.path()
            )));
        }
        let (parent, name) = split_destination(destination)?;
        let backend = Arc::clone(&self.backend);

        if let Some(native) = backend.native_collision() {
            let placed = native.copy_file(source.path(), &parent, name, policy).await?;
            debug!(from = %source.path(), to = %placed.path, "copied file");
            return Ok(File::from_state(
                backend,
                HandleState::Resolved { path: placed.path, native: placed.native },
            ));
        }

        let mut reader = backend.open(source.path(), AccessMode::ReadOnly).await?;
        let resolution = CollisionResolver::new(backend.as_ref(), EntryKind::File)
            .resolve(&parent, name, policy, CollisionContext::Relocate, cancel)
            .await?;
        if let Resolution::Replace { path, occupant } = &resolution {
            evict(backend.as_ref(), path, *occupant, Some(source.path())).await?;
        }
        let target = resolution.path().clone();
        let native = backend.create_file(&target).await?;
        let mut writer = backend.open(&target, AccessMode::ReadWrite).await?;
        let copied =
            transfer(&mut reader, &mut writer, backend.copy_buffer_size(), cancel).await?;

        debug!(from = %source.path(), to = %target, bytes = copied, "copied file");
        Ok(File::from_state(backend, HandleState::Resolved { path: target, native }))
    }
}

/// Parent directory and leaf name of a move/copy destination
fn split_destination(destination: &StoragePath) -> StorageResult<(StoragePath, &str)> {
    let name = destination.leaf_name();
    match destination.parent() {
        Some(parent) if !name.is_empty() => Ok((parent, name)),
        _ => Err(StorageError::InvalidArgument(format!(
            "'{destination}' is not a valid file destination"
        ))),
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_resolved() { "resolved" } else { "unresolved" };
        write!(f, "Name = {} ({state})", self.name())
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.path(), f)
    }
}
