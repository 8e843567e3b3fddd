// SPDX-License-Identifier: AGPL-3.0-or-later
//! Handle-based native storage provider
//!
//! Models platform storage APIs that address items through folder handles and
//! resolve name collisions atomically inside each call. The vendor surface is
//! the [`NativeStore`] trait; [`MemoryStore`] implements it in-process.

mod backend;
mod memory;
mod store;

pub use backend::{NativeBackend, NativeFileSystem};
pub use memory::{MemoryStore, MemoryStream};
pub use store::{
    classify_native_error, codes, CreationCollisionOption, ItemKind, NameCollisionOption,
    NativeError, NativeResult, NativeStore, StorageItem,
};
