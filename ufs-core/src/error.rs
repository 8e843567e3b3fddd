// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for Unified Storage

use std::io;
use thiserror::Error;

use crate::entry::EntryKind;
use crate::path::StoragePath;

/// Result type alias
pub type StorageResult<T> = Result<T, StorageError>;

/// Coarse classification, shared by every provider's error mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Unsupported,
    InvalidArgument,
    Io,
    Cancelled,
}

/// Main error type
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("The specified file '{0}' could not be found.")]
    FileNotFound(StoragePath),

    #[error("The specified directory '{0}' could not be found.")]
    DirectoryNotFound(StoragePath),

    #[error("Already exists: {0}")]
    AlreadyExists(StoragePath),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("Cancelled")]
    Cancelled,
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::FileNotFound(_) | StorageError::DirectoryNotFound(_) => ErrorKind::NotFound,
            StorageError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            StorageError::Unsupported(_) => ErrorKind::Unsupported,
            StorageError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StorageError::Io { .. } => ErrorKind::Io,
            StorageError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorageError::Cancelled)
    }

    pub fn not_found(kind: EntryKind, path: StoragePath) -> Self {
        match kind {
            EntryKind::File => StorageError::FileNotFound(path),
            EntryKind::Directory => StorageError::DirectoryNotFound(path),
        }
    }

    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        StorageError::Io { message: message.into(), source }
    }

    /// Translate an `io::Error` raised while working on `path`
    pub fn from_io(path: &StoragePath, kind: EntryKind, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::not_found(kind, path.clone()),
            io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.clone()),
            _ => Self::io(format!("{path}: {err}"), err),
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io { message: err.to_string(), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathResolver;
    use std::error::Error as _;
    use std::sync::Arc;

    fn path(raw: &str) -> StoragePath {
        StoragePath::new(Arc::new(PathResolver::posix()), raw)
    }

    #[test]
    fn test_kind() {
        assert_eq!(StorageError::FileNotFound(path("/a")).kind(), ErrorKind::NotFound);
        assert_eq!(StorageError::DirectoryNotFound(path("/a")).kind(), ErrorKind::NotFound);
        assert_eq!(StorageError::AlreadyExists(path("/a")).kind(), ErrorKind::AlreadyExists);
        assert_eq!(StorageError::Cancelled.kind(), ErrorKind::Cancelled);
        assert!(StorageError::Cancelled.is_cancelled());
        assert!(!StorageError::Unsupported("x".into()).is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::FileNotFound(path("/path/to/file"));
        assert_eq!(
            format!("{}", err),
            "The specified file '/path/to/file' could not be found."
        );

        let err = StorageError::DirectoryNotFound(path("/path/to/dir"));
        assert!(format!("{}", err).contains("directory '/path/to/dir'"));
    }

    #[test]
    fn test_from_io_classifies() {
        let p = path("/data/a.txt");

        let err = StorageError::from_io(&p, EntryKind::File, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, StorageError::FileNotFound(ref q) if *q == p));

        let err = StorageError::from_io(&p, EntryKind::Directory, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, StorageError::DirectoryNotFound(_)));

        let err = StorageError::from_io(&p, EntryKind::File, io::Error::from(io::ErrorKind::AlreadyExists));
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn test_io_preserves_source() {
        let p = path("/data/a.txt");
        let err = StorageError::from_io(
            &p,
            EntryKind::File,
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("/data/a.txt"));
        let source = err.source().expect("source preserved");
        assert_eq!(source.to_string(), "denied");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::Other, "disk on fire");
        let err: StorageError = io_err.into();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}
