// SPDX-License-Identifier: AGPL-3.0-or-later
//! Vendor API surface of a native storage provider

use async_trait::async_trait;
use thiserror::Error;
use ufs_core::{AccessMode, CollisionPolicy, ErrorKind, FileStream, StorageError};

/// Raw failure codes reported by the native API
pub mod codes {
    pub const E_FILE_NOT_FOUND: u32 = 0x8007_0002;
    pub const E_PATH_NOT_FOUND: u32 = 0x8007_0003;
    pub const E_ACCESSDENIED: u32 = 0x8007_0005;
    pub const E_FILE_EXISTS: u32 = 0x8007_0050;
    pub const E_INVALIDARG: u32 = 0x8007_0057;
    pub const E_ALREADY_EXISTS: u32 = 0x8007_00B7;
    pub const E_NOTIMPL: u32 = 0x8000_4001;
    pub const E_ABORT: u32 = 0x8000_4004;
}

/// Error raised by the native API: a raw code plus its message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (0x{code:08X})")]
pub struct NativeError {
    pub code: u32,
    pub message: String,
}

impl NativeError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

pub type NativeResult<T> = Result<T, NativeError>;

/// The only place raw native codes are interpreted
pub fn classify_native_error(code: u32) -> ErrorKind {
    match code {
        codes::E_FILE_NOT_FOUND | codes::E_PATH_NOT_FOUND => ErrorKind::NotFound,
        codes::E_FILE_EXISTS | codes::E_ALREADY_EXISTS => ErrorKind::AlreadyExists,
        codes::E_INVALIDARG => ErrorKind::InvalidArgument,
        codes::E_NOTIMPL => ErrorKind::Unsupported,
        codes::E_ABORT => ErrorKind::Cancelled,
        _ => ErrorKind::Io,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Folder,
}

/// An item as the native API reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageItem {
    pub id: u64,
    pub path: String,
    pub kind: ItemKind,
}

/// Native collision option for creating files and folders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationCollisionOption {
    GenerateUniqueName,
    ReplaceExisting,
    FailIfExists,
    OpenIfExists,
}

impl From<CollisionPolicy> for CreationCollisionOption {
    fn from(policy: CollisionPolicy) -> Self {
        match policy {
            CollisionPolicy::GenerateUniqueName => Self::GenerateUniqueName,
            CollisionPolicy::ReplaceExisting => Self::ReplaceExisting,
            CollisionPolicy::FailIfExists => Self::FailIfExists,
            CollisionPolicy::OpenIfExists => Self::OpenIfExists,
        }
    }
}

/// Native collision option for moving and copying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCollisionOption {
    GenerateUniqueName,
    ReplaceExisting,
    FailIfExists,
}

impl TryFrom<CollisionPolicy> for NameCollisionOption {
    type Error = StorageError;

    fn try_from(policy: CollisionPolicy) -> Result<Self, Self::Error> {
        match policy {
            CollisionPolicy::GenerateUniqueName => Ok(Self::GenerateUniqueName),
            CollisionPolicy::ReplaceExisting => Ok(Self::ReplaceExisting),
            CollisionPolicy::FailIfExists => Ok(Self::FailIfExists),
            CollisionPolicy::OpenIfExists => Err(StorageError::InvalidArgument(
                "OpenIfExists has no native equivalent for move or copy".into(),
            )),
        }
    }
}

/// Handle-based storage API. Every call is atomic with respect to the others.
#[async_trait]
pub trait NativeStore: Send + Sync {
    async fn get_item(&self, path: &str) -> NativeResult<StorageItem>;

    async fn create_file(
        &self,
        folder: &str,
        name: &str,
        option: CreationCollisionOption,
    ) -> NativeResult<StorageItem>;

    async fn create_folder(
        &self,
        folder: &str,
        name: &str,
        option: CreationCollisionOption,
    ) -> NativeResult<StorageItem>;

    async fn move_file(
        &self,
        file: &str,
        folder: &str,
        name: &str,
        option: NameCollisionOption,
    ) -> NativeResult<StorageItem>;

    async fn copy_file(
        &self,
        file: &str,
        folder: &str,
        name: &str,
        option: NameCollisionOption,
    ) -> NativeResult<StorageItem>;

    /// Folders are deleted with their contents
    async fn delete(&self, path: &str) -> NativeResult<()>;

    async fn children(&self, folder: &str) -> NativeResult<Vec<StorageItem>>;

    async fn open(&self, file: &str, mode: AccessMode) -> NativeResult<FileStream>;
}
