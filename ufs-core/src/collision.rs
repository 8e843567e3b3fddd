// SPDX-License-Identifier: AGPL-3.0-or-later
//! Name collision resolution
//!
//! Decides, before anything is mutated, where a create/move/copy lands and
//! what has to be cleared out of the way first. Providers whose native API
//! resolves collisions atomically skip this and translate the policy instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace, warn};

use crate::backend::StorageBackend;
use crate::cancel::{checkpoint, CancellationToken};
use crate::entry::{EntryKind, NativeId, Probe};
use crate::error::{StorageError, StorageResult};
use crate::path::{PathResolver, StoragePath};

/// Counter used for the first generated name: `report (2).txt`
pub const FIRST_UNIQUE_SUFFIX: u64 = 2;

const LONG_SEARCH_WARNING: u64 = 1_000;

/// What to do when the destination name is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionPolicy {
    FailIfExists,
    ReplaceExisting,
    GenerateUniqueName,
    /// Create only
    OpenIfExists,
}

/// Which family of operation is asking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionContext {
    Create,
    /// Move, rename and copy
    Relocate,
}

impl CollisionPolicy {
    pub fn validate(self, context: CollisionContext) -> StorageResult<()> {
        match (self, context) {
            (CollisionPolicy::OpenIfExists, CollisionContext::Relocate) => Err(
                StorageError::InvalidArgument("OpenIfExists is only valid when creating".into()),
            ),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollisionPolicy::FailIfExists => "fail",
            CollisionPolicy::ReplaceExisting => "replace",
            CollisionPolicy::GenerateUniqueName => "unique",
            CollisionPolicy::OpenIfExists => "open",
        };
        f.write_str(name)
    }
}

impl FromStr for CollisionPolicy {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" | "failifexists" => Ok(CollisionPolicy::FailIfExists),
            "replace" | "replaceexisting" => Ok(CollisionPolicy::ReplaceExisting),
            "unique" | "generateuniquename" => Ok(CollisionPolicy::GenerateUniqueName),
            "open" | "openifexists" => Ok(CollisionPolicy::OpenIfExists),
            other => Err(StorageError::InvalidArgument(format!(
                "unknown collision policy '{other}'"
            ))),
        }
    }
}

/// Name to try on attempt `counter`.
///
/// Files keep their extension last (`report (2).txt`); directories and names
/// that are all extension (`.gitignore (2)`) get the suffix appended.
pub fn candidate_name(
    resolver: &PathResolver,
    desired: &str,
    kind: EntryKind,
    counter: u64,
) -> String {
    if counter < FIRST_UNIQUE_SUFFIX {
        return desired.to_string();
    }
    let stem = resolver.file_stem(desired);
    if kind == EntryKind::Directory || stem.is_empty() {
        return format!("{desired} ({counter})");
    }
    let extension = resolver.extension(desired);
    format!("{stem} ({counter}){extension}")
}

/// Decision reached before the mutation runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing in the way
    Vacant(StoragePath),
    /// Remove the occupant, then proceed at `path`
    Replace { path: StoragePath, occupant: EntryKind },
    /// `OpenIfExists` hit a matching entry: hand it back untouched
    Existing { path: StoragePath, native: NativeId },
}

impl Resolution {
    pub fn path(&self) -> &StoragePath {
        match self {
            Resolution::Vacant(path)
            | Resolution::Replace { path, .. }
            | Resolution::Existing { path, .. } => path,
        }
    }
}

/// Probe-driven resolver for providers without native uniquification
pub struct CollisionResolver<'a> {
    backend: &'a dyn StorageBackend,
    kind: EntryKind,
}

impl<'a> CollisionResolver<'a> {
    /// `kind` is the kind of entry being placed
    pub fn new(backend: &'a dyn StorageBackend, kind: EntryKind) -> Self {
        Self { backend, kind }
    }

    pub async fn resolve(
        &self,
        parent: &StoragePath,
        desired: &str,
        policy: CollisionPolicy,
        context: CollisionContext,
        cancel: &CancellationToken,
    ) -> StorageResult<Resolution> {
        policy.validate(context)?;
        checkpoint(cancel)?;

        let path = parent.join(desired);
        let probe = self.backend.probe(&path).await?;
        trace!(path = %path, ?probe, "collision probe");

        let Some(occupant) = probe.kind() else {
            return Ok(Resolution::Vacant(path));
        };

        match policy {
            CollisionPolicy::FailIfExists => Err(StorageError::AlreadyExists(path)),
            CollisionPolicy::ReplaceExisting => Ok(Resolution::Replace { path, occupant }),
            CollisionPolicy::OpenIfExists => match probe {
                Probe::File(native) if self.kind == EntryKind::File => {
                    Ok(Resolution::Existing { path, native })
                }
                Probe::Directory(native) if self.kind == EntryKind::Directory => {
                    Ok(Resolution::Existing { path, native })
                }
                _ => Err(StorageError::AlreadyExists(path)),
            },
            CollisionPolicy::GenerateUniqueName => {
                self.unique(parent, desired, cancel).await.map(Resolution::Vacant)
            }
        }
    }

    async fn unique(
        &self,
        parent: &StoragePath,
        desired: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<StoragePath> {
        let resolver = parent.resolver();
        let mut counter = FIRST_UNIQUE_SUFFIX;
        loop {
            checkpoint(cancel)?;
            let candidate = parent.join(candidate_name(resolver, desired, self.kind, counter));
            if self.backend.probe(&candidate).await?.is_missing() {
                debug!(desired, resolved = %candidate, "generated unique name");
                return Ok(candidate);
            }
            trace!(candidate = %candidate, "unique name candidate taken");
            if counter == LONG_SEARCH_WARNING {
                warn!(desired, dir = %parent, "unique name search is taking many attempts");
            }
            counter = counter.checked_add(1).ok_or_else(|| {
                StorageError::InvalidArgument(format!("no unique name left for '{desired}'"))
            })?;
        }
    }
}

/// Clear `path` for a `ReplaceExisting` placement.
///
/// `keep` is the source of a move or copy; replacing a directory that holds it
/// is refused before anything is removed.
pub(crate) async fn evict(
    backend: &dyn StorageBackend,
    path: &StoragePath,
    occupant: EntryKind,
    keep: Option<&StoragePath>,
) -> StorageResult<()> {
    if let Some(source) = keep {
        if occupant == EntryKind::Directory && source.is_within(path) {
            return Err(StorageError::InvalidArgument(format!(
                "cannot replace '{path}' because it contains '{source}'"
            )));
        }
    }
    debug!(path = %path, %occupant, "replacing existing entry");
    match occupant {
        EntryKind::File => backend.remove_file(path).await,
        EntryKind::Directory => backend.remove_directory(path).await,
    }
}
