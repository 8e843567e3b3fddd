// SPDX-License-Identifier: AGPL-3.0-or-later
//! Scripted backend for exercising the handles without a real provider

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite, ReadBuf};

use crate::backend::{FileStream, StorageBackend, StorageCapabilities};
use crate::cancel::CancellationToken;
use crate::entry::{AccessMode, EntryKind, NativeId, Probe};
use crate::error::{StorageError, StorageResult};
use crate::path::{PathResolver, StoragePath};

/// Hands out file contents a few bytes per read, cancelling a token after `cancel_after` reads
struct Trickle {
    chunk: usize,
    cancel_after: usize,
    token: CancellationToken,
}

pub(crate) struct ScriptedBackend {
    resolver: Arc<PathResolver>,
    capabilities: StorageCapabilities,
    entries: Mutex<BTreeMap<String, EntryKind>>,
    contents: Vec<u8>,
    probes: AtomicUsize,
    served: Arc<AtomicUsize>,
    cancel_on_probe: Option<(usize, CancellationToken)>,
    failing_probe: Option<String>,
    unreadable: Option<String>,
    trickle: Option<Trickle>,
    buffer_size: usize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(PathResolver::posix()),
            capabilities: StorageCapabilities::hierarchical_filesystem(),
            entries: Mutex::new(BTreeMap::new()),
            contents: Vec::new(),
            probes: AtomicUsize::new(0),
            served: Arc::new(AtomicUsize::new(0)),
            cancel_on_probe: None,
            failing_probe: None,
            unreadable: None,
            trickle: None,
            buffer_size: 8,
        }
    }

    pub fn with_directory(self, path: &str) -> Self {
        self.insert(path, EntryKind::Directory);
        self
    }

    pub fn with_file(self, path: &str) -> Self {
        self.insert(path, EntryKind::File);
        self
    }

    /// Every file reads back as `contents`
    pub fn with_contents(mut self, contents: &[u8]) -> Self {
        self.contents = contents.to_vec();
        self
    }

    /// Signal `token` from inside the `count`-th probe
    pub fn cancel_on_probe(mut self, count: usize, token: &CancellationToken) -> Self {
        self.cancel_on_probe = Some((count, token.clone()));
        self
    }

    /// Probing `path` fails with an I/O error that is not "not found"
    pub fn failing_probe(mut self, path: &str) -> Self {
        self.failing_probe = Some(path.to_string());
        self
    }

    /// Opening `path` for reading fails even though it probes as a file
    pub fn unreadable(mut self, path: &str) -> Self {
        self.unreadable = Some(path.to_string());
        self
    }

    /// Serve reads `chunk` bytes at a time and signal `token` after `cancel_after` reads
    pub fn trickle(mut self, chunk: usize, cancel_after: usize, token: &CancellationToken) -> Self {
        self.trickle = Some(Trickle { chunk, cancel_after, token: token.clone() });
        self
    }

    pub fn path(&self, raw: &str) -> StoragePath {
        StoragePath::new(Arc::clone(&self.resolver), raw)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn bytes_served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn insert(&self, path: &str, kind: EntryKind) {
        self.lock().insert(path.to_string(), kind);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, EntryKind>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn place(&self, path: &StoragePath, kind: EntryKind) -> StorageResult<NativeId> {
        let mut entries = self.lock();
        if entries.contains_key(path.as_str()) {
            return Err(StorageError::AlreadyExists(path.clone()));
        }
        entries.insert(path.as_str().to_string(), kind);
        Ok(NativeId::new(path.as_str()))
    }
}

#[async_trait]
impl StorageBackend for ScriptedBackend {
    fn id(&self) -> &str {
        "scripted"
    }

    fn display_name(&self) -> &str {
        "Scripted"
    }

    fn capabilities(&self) -> &StorageCapabilities {
        &self.capabilities
    }

    fn resolver(&self) -> &Arc<PathResolver> {
        &self.resolver
    }

    fn copy_buffer_size(&self) -> usize {
        self.buffer_size
    }

    async fn probe(&self, path: &StoragePath) -> StorageResult<Probe> {
        let count = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &self.cancel_on_probe {
            if count == *at {
                token.cancel();
            }
        }
        if self.failing_probe.as_deref() == Some(path.as_str()) {
            return Err(StorageError::io(
                format!("cannot stat '{path}'"),
                io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
            ));
        }

        let native = NativeId::new(path.as_str());
        Ok(match self.lock().get(path.as_str()) {
            Some(EntryKind::File) => Probe::File(native),
            Some(EntryKind::Directory) => Probe::Directory(native),
            None => Probe::Missing,
        })
    }

    async fn create_file(&self, path: &StoragePath) -> StorageResult<NativeId> {
        self.place(path, EntryKind::File)
    }

    async fn create_directory(&self, path: &StoragePath) -> StorageResult<NativeId> {
        self.place(path, EntryKind::Directory)
    }

    async fn remove_file(&self, path: &StoragePath) -> StorageResult<()> {
        self.lock().remove(path.as_str());
        Ok(())
    }

    async fn remove_directory(&self, path: &StoragePath) -> StorageResult<()> {
        let prefix = format!("{}/", path.as_str());
        self.lock().retain(|key, _| key != path.as_str() && !key.starts_with(&prefix));
        Ok(())
    }

    async fn rename(&self, from: &StoragePath, to: &StoragePath) -> StorageResult<NativeId> {
        let mut entries = self.lock();
        let kind = entries
            .remove(from.as_str())
            .ok_or_else(|| StorageError::FileNotFound(from.clone()))?;
        entries.insert(to.as_str().to_string(), kind);
        Ok(NativeId::new(to.as_str()))
    }

    async fn list(&self, dir: &StoragePath) -> StorageResult<Vec<(StoragePath, Probe)>> {
        let entries = self.lock();
        Ok(entries
            .iter()
            .filter(|(key, _)| self.resolver.parent(key) == Some(dir.as_str()))
            .map(|(key, kind)| {
                let native = NativeId::new(key.as_str());
                let probe = match kind {
                    EntryKind::File => Probe::File(native),
                    EntryKind::Directory => Probe::Directory(native),
                };
                (self.path(key), probe)
            })
            .collect())
    }

    async fn open(&self, path: &StoragePath, mode: AccessMode) -> StorageResult<FileStream> {
        let exists = self.lock().get(path.as_str()) == Some(&EntryKind::File);
        match mode {
            AccessMode::ReadOnly if !exists => Err(StorageError::FileNotFound(path.clone())),
            AccessMode::ReadOnly if self.unreadable.as_deref() == Some(path.as_str()) => {
                Err(StorageError::io(
                    format!("cannot open '{path}'"),
                    io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
                ))
            }
            AccessMode::ReadOnly => match &self.trickle {
                Some(trickle) => Ok(Box::new(TrickleReader {
                    data: self.contents.clone(),
                    pos: 0,
                    reads: 0,
                    chunk: trickle.chunk,
                    cancel_after: trickle.cancel_after,
                    token: trickle.token.clone(),
                    served: Arc::clone(&self.served),
                })),
                None => Ok(Box::new(Cursor::new(self.contents.clone()))),
            },
            AccessMode::ReadWrite => {
                if !exists {
                    self.place(path, EntryKind::File)?;
                }
                Ok(Box::new(Cursor::new(Vec::new())))
            }
        }
    }
}

struct TrickleReader {
    data: Vec<u8>,
    pos: usize,
    reads: usize,
    chunk: usize,
    cancel_after: usize,
    token: CancellationToken,
    served: Arc<AtomicUsize>,
}

impl AsyncRead for TrickleReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let end = (this.pos + this.chunk.min(buf.remaining())).min(this.data.len());
        buf.put_slice(&this.data[this.pos..end]);
        this.pos = end;
        this.served.store(end, Ordering::SeqCst);

        this.reads += 1;
        if this.reads == this.cancel_after {
            this.token.cancel();
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for TrickleReader {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only stream")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl AsyncSeek for TrickleReader {
    fn start_seek(self: Pin<&mut Self>, _position: io::SeekFrom) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "trickle streams are forward-only"))
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Ok(self.pos as u64))
    }
}
