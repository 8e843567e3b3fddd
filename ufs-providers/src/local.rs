// SPDX-License-Identifier: AGPL-3.0-or-later
//! Local filesystem provider

use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, trace};
use ufs_core::{
    backend::{FileStream, StorageBackend, StorageCapabilities},
    entry::{AccessMode, EntryKind, NativeId, Probe},
    error::{StorageError, StorageResult},
    path::{PathResolver, StoragePath},
    provider::StorageProvider,
    roots::{PlatformContext, StorageRoot, StorageRoots},
    StorageConfig,
};

/// Hierarchical filesystem backend over `tokio::fs`
pub struct LocalBackend {
    id: String,
    resolver: Arc<PathResolver>,
    capabilities: StorageCapabilities,
    copy_buffer_size: usize,
}

impl LocalBackend {
    pub fn new(id: impl Into<String>, resolver: Arc<PathResolver>, copy_buffer_size: usize) -> Self {
        Self {
            id: id.into(),
            resolver,
            capabilities: StorageCapabilities::hierarchical_filesystem(),
            copy_buffer_size,
        }
    }

    fn parent_of(&self, path: &StoragePath) -> StoragePath {
        path.parent().unwrap_or_else(|| path.clone())
    }

    async fn native_id(&self, path: &StoragePath) -> StorageResult<NativeId> {
        let meta = fs::metadata(path.to_path_buf())
            .await
            .map_err(|e| StorageError::from_io(path, EntryKind::File, e))?;
        Ok(native_id_of(path, &meta))
    }
}

#[cfg(unix)]
fn native_id_of(_path: &StoragePath, meta: &std::fs::Metadata) -> NativeId {
    use std::os::unix::fs::MetadataExt;
    NativeId::new(format!("{}:{}", meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn native_id_of(path: &StoragePath, _meta: &std::fs::Metadata) -> NativeId {
    NativeId::new(path.as_str())
}

/// Not-found style errors that mean "nothing there" to a probe
fn is_absent(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory)
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Local Filesystem"
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
        match fs::metadata(path.to_path_buf()).await {
            Ok(meta) if meta.is_dir() => Ok(Probe::Directory(native_id_of(path, &meta))),
            Ok(meta) => Ok(Probe::File(native_id_of(path, &meta))),
            Err(e) if is_absent(&e) => Ok(Probe::Missing),
            Err(e) => Err(StorageError::io(format!("failed to probe {path}"), e)),
        }
    }

    async fn create_file(&self, path: &StoragePath) -> StorageResult<NativeId> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.to_path_buf())
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => StorageError::DirectoryNotFound(self.parent_of(path)),
                _ => StorageError::from_io(path, EntryKind::File, e),
            })?;
        debug!(path = %path, "created file");
        self.native_id(path).await
    }

    async fn create_directory(&self, path: &StoragePath) -> StorageResult<NativeId> {
        fs::create_dir(path.to_path_buf()).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::DirectoryNotFound(self.parent_of(path)),
            _ => StorageError::from_io(path, EntryKind::Directory, e),
        })?;
        debug!(path = %path, "created directory");
        self.native_id(path).await
    }

    async fn remove_file(&self, path: &StoragePath) -> StorageResult<()> {
        fs::remove_file(path.to_path_buf())
            .await
            .map_err(|e| StorageError::from_io(path, EntryKind::File, e))
    }

    async fn remove_directory(&self, path: &StoragePath) -> StorageResult<()> {
        fs::remove_dir_all(path.to_path_buf())
            .await
            .map_err(|e| StorageError::from_io(path, EntryKind::Directory, e))
    }

    async fn rename(&self, from: &StoragePath, to: &StoragePath) -> StorageResult<NativeId> {
        if let Err(e) = fs::rename(from.to_path_buf(), to.to_path_buf()).await {
            if e.kind() != io::ErrorKind::NotFound {
                return Err(StorageError::io(format!("failed to move {from} to {to}"), e));
            }
            return Err(match self.probe(from).await? {
                Probe::Missing => StorageError::FileNotFound(from.clone()),
                _ => StorageError::DirectoryNotFound(self.parent_of(to)),
            });
        }
        self.native_id(to).await
    }

    async fn list(&self, dir: &StoragePath) -> StorageResult<Vec<(StoragePath, Probe)>> {
        let mut read_dir = fs::read_dir(dir.to_path_buf())
            .await
            .map_err(|e| StorageError::from_io(dir, EntryKind::Directory, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let path = StoragePath::new(Arc::clone(&self.resolver), entry.path().to_string_lossy());
            match self.probe(&path).await? {
                // Dangling symlink or removed since read_dir saw it
                Probe::Missing => trace!(path = %path, "skipping vanished entry"),
                probe => entries.push((path, probe)),
            }
        }
        Ok(entries)
    }

    async fn open(&self, path: &StoragePath, mode: AccessMode) -> StorageResult<FileStream> {
        let mut options = fs::OpenOptions::new();
        match mode {
            AccessMode::ReadOnly => options.read(true),
            AccessMode::ReadWrite => options.read(true).write(true).create(true),
        };
        let file = options
            .open(path.to_path_buf())
            .await
            .map_err(|e| StorageError::from_io(path, EntryKind::File, e))?;
        Ok(Box::new(file))
    }
}

/// Storage provider for the machine's own filesystem
pub struct LocalFileSystem {
    backend: Arc<LocalBackend>,
    roots: StorageRoots,
}

impl LocalFileSystem {
    pub fn new(context: &PlatformContext, config: &StorageConfig) -> Self {
        let resolver = Arc::new(context.resolver());
        let roots = StorageRoots::new(context, &resolver);
        let backend = Arc::new(LocalBackend::new("local", resolver, config.copy_buffer_size));
        Self { backend, roots }
    }

    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        config.validate()?;
        let context = PlatformContext::from_config(config)?;
        Ok(Self::new(&context, config))
    }

    /// Create any root directory that is missing
    pub async fn prepare(&self) -> StorageResult<()> {
        for root in StorageRoot::ALL {
            let Ok(path) = self.roots.path(root) else { continue };
            ensure_dir(path.to_path_buf().as_path()).await?;
        }
        Ok(())
    }
}

async fn ensure_dir(path: &Path) -> StorageResult<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| StorageError::io(format!("failed to create {}", path.display()), e))
}

#[async_trait]
impl StorageProvider for LocalFileSystem {
    fn backend(&self) -> Arc<dyn StorageBackend> {
        self.backend.clone()
    }

    fn roots(&self) -> &StorageRoots {
        &self.roots
    }
}
