// SPDX-License-Identifier: AGPL-3.0-or-later
//! File and directory handles
//!
//! A handle names a location; it is not an open resource. It may point at
//! something that does not exist yet, and only learns otherwise by probing.

mod directory;
mod file;

pub use directory::Directory;
pub use file::File;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::path::StoragePath;

/// Entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Directory => f.write_str("directory"),
        }
    }
}

/// Opaque provider reference to a confirmed storage object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeId(String);

impl NativeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a non-destructive existence probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Missing,
    File(NativeId),
    Directory(NativeId),
}

impl Probe {
    pub fn kind(&self) -> Option<EntryKind> {
        match self {
            Probe::Missing => None,
            Probe::File(_) => Some(EntryKind::File),
            Probe::Directory(_) => Some(EntryKind::Directory),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Probe::Missing)
    }

    /// The native reference, but only if the probe found an entry of `kind`
    pub fn native_for(&self, kind: EntryKind) -> Option<&NativeId> {
        match (self, kind) {
            (Probe::File(id), EntryKind::File) | (Probe::Directory(id), EntryKind::Directory) => {
                Some(id)
            }
            _ => None,
        }
    }
}

/// Per-handle resolution state
#[derive(Debug, Clone)]
pub enum HandleState {
    /// Only a path; existence unknown
    Unresolved(StoragePath),
    /// Backed by a confirmed storage object
    Resolved { path: StoragePath, native: NativeId },
}

impl HandleState {
    pub fn path(&self) -> &StoragePath {
        match self {
            HandleState::Unresolved(path) | HandleState::Resolved { path, .. } => path,
        }
    }

    pub fn native(&self) -> Option<&NativeId> {
        match self {
            HandleState::Unresolved(_) => None,
            HandleState::Resolved { native, .. } => Some(native),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, HandleState::Resolved { .. })
    }

    /// Record a probe result for an entry of `kind`
    fn observe(&mut self, probe: &Probe, kind: EntryKind) -> bool {
        let path = self.path().clone();
        match probe.native_for(kind) {
            Some(native) => {
                *self = HandleState::Resolved { path, native: native.clone() };
                true
            }
            None => {
                *self = HandleState::Unresolved(path);
                false
            }
        }
    }
}

/// Access requested when opening a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// Reject empty names, `.`/`..` and anything containing a separator
pub(crate) fn validate_leaf_name(name: &str, path: &StoragePath) -> StorageResult<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(StorageError::InvalidArgument(format!("'{name}' is not a valid name")));
    }
    if path.resolver().contains_separator(name) {
        return Err(StorageError::InvalidArgument(format!(
            "'{name}' must be a single name without path separators"
        )));
    }
    Ok(())
}

/// Build a handle for `path`, resolving eagerly when the provider prefers it
pub(crate) async fn locate(
    backend: &Arc<dyn StorageBackend>,
    path: StoragePath,
    kind: EntryKind,
) -> StorageResult<HandleState> {
    if path.is_empty() {
        return Err(StorageError::InvalidArgument("path must not be empty".into()));
    }
    if !backend.capabilities().eager_resolution {
        return Ok(HandleState::Unresolved(path));
    }

    let mut state = HandleState::Unresolved(path);
    let probe = backend.probe(state.path()).await?;
    state.observe(&probe, kind);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathResolver;

    fn path(raw: &str) -> StoragePath {
        StoragePath::new(Arc::new(PathResolver::posix()), raw)
    }

    #[test]
    fn test_probe_kind_mismatch_is_not_native() {
        let probe = Probe::Directory(NativeId::new("7"));
        assert_eq!(probe.kind(), Some(EntryKind::Directory));
        assert!(probe.native_for(EntryKind::File).is_none());
        assert_eq!(probe.native_for(EntryKind::Directory), Some(&NativeId::new("7")));
        assert!(Probe::Missing.is_missing());
    }

    #[test]
    fn test_observe_upgrades_and_downgrades() {
        let mut state = HandleState::Unresolved(path("/a.txt"));
        assert!(state.observe(&Probe::File(NativeId::new("1")), EntryKind::File));
        assert!(state.is_resolved());
        assert_eq!(state.native().map(NativeId::as_str), Some("1"));

        assert!(!state.observe(&Probe::Directory(NativeId::new("2")), EntryKind::File));
        assert!(!state.is_resolved());
        assert_eq!(state.path().as_str(), "/a.txt");
    }

    #[test]
    fn test_validate_leaf_name() {
        let parent = path("/data");
        assert!(validate_leaf_name("b.txt", &parent).is_ok());
        assert!(validate_leaf_name("", &parent).is_err());
        assert!(validate_leaf_name("..", &parent).is_err());
        assert!(validate_leaf_name("a/b.txt", &parent).is_err());
        assert!(validate_leaf_name("a\\b.txt", &parent).is_err());
        assert!(matches!(
            validate_leaf_name("/data/b.txt", &parent),
            Err(StorageError::InvalidArgument(_))
        ));
    }
}
