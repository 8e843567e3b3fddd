// SPDX-License-Identifier: AGPL-3.0-or-later
//! Unified Storage Core
//!
//! Files, directories and paths over interchangeable storage providers, with
//! one collision protocol for create, move, rename and copy.

pub mod backend;
pub mod cancel;
pub mod collision;
pub mod config;
pub mod copy;
pub mod entry;
pub mod error;
pub mod glob;
pub mod path;
pub mod platform;
pub mod provider;
pub mod roots;

#[cfg(test)]
mod testing;

pub use backend::{FileStream, Materialized, NativeCollision, StorageBackend, StorageCapabilities};
pub use cancel::CancellationToken;
pub use collision::{CollisionContext, CollisionPolicy, CollisionResolver, Resolution};
pub use config::StorageConfig;
pub use entry::{AccessMode, Directory, EntryKind, File, HandleState, NativeId, Probe};
pub use error::{ErrorKind, StorageError, StorageResult};
pub use path::{PathResolver, StoragePath};
pub use platform::Platform;
pub use provider::StorageProvider;
pub use roots::{PlatformContext, StorageRoot, StorageRoots};
