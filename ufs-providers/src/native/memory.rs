// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-process native store
//!
//! Every call takes the tree lock once, so collision handling is atomic the
//! same way a platform storage API makes it.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite, ReadBuf};
use tracing::trace;
use ufs_core::collision::{candidate_name, FIRST_UNIQUE_SUFFIX};
use ufs_core::{AccessMode, EntryKind, FileStream, PathResolver};

use super::store::{
    codes, CreationCollisionOption, ItemKind, NameCollisionOption, NativeError, NativeResult,
    NativeStore, StorageItem,
};

struct Node {
    id: u64,
    path: String,
    kind: ItemKind,
    data: Arc<Mutex<Vec<u8>>>,
}

impl Node {
    fn item(&self) -> StorageItem {
        StorageItem { id: self.id, path: self.path.clone(), kind: self.kind }
    }
}

#[derive(Default)]
struct Tree {
    nodes: BTreeMap<String, Node>,
    next_id: u64,
}

impl Tree {
    fn insert(&mut self, key: String, path: String, kind: ItemKind, data: Vec<u8>) -> StorageItem {
        self.next_id += 1;
        let node = Node { id: self.next_id, path, kind, data: Arc::new(Mutex::new(data)) };
        let item = node.item();
        self.nodes.insert(key, node);
        item
    }

    fn remove_subtree(&mut self, key: &str, separator: char) {
        self.nodes.remove(key);
        let prefix = if key.ends_with(separator) {
            key.to_string()
        } else {
            format!("{key}{separator}")
        };
        self.nodes.retain(|k, _| !k.starts_with(&prefix));
    }
}

enum Placement {
    Vacant(String),
    Existing(StorageItem),
}

/// Native store held entirely in memory
pub struct MemoryStore {
    resolver: Arc<PathResolver>,
    tree: Mutex<Tree>,
}

impl MemoryStore {
    pub fn new(resolver: Arc<PathResolver>) -> Self {
        Self { resolver, tree: Mutex::new(Tree::default()) }
    }

    /// Register a top-level folder; existing roots are left alone
    pub fn create_root(&self, path: &str) -> StorageItem {
        let path = self.resolver.normalize(path);
        let key = self.key(&path);
        let mut tree = self.tree.lock();
        if let Some(node) = tree.nodes.get(&key) {
            return node.item();
        }
        tree.insert(key, path, ItemKind::Folder, Vec::new())
    }

    fn key(&self, path: &str) -> String {
        let normalized = self.resolver.normalize(path);
        if self.resolver.is_case_insensitive() {
            normalized.to_lowercase()
        } else {
            normalized
        }
    }

    fn folder_key(&self, tree: &Tree, folder: &str) -> NativeResult<String> {
        let key = self.key(folder);
        match tree.nodes.get(&key) {
            Some(node) if node.kind == ItemKind::Folder => Ok(key),
            _ => Err(path_not_found()),
        }
    }

    fn check_name(&self, name: &str) -> NativeResult<()> {
        if name.is_empty() || name == "." || name == ".." || self.resolver.contains_separator(name) {
            return Err(NativeError::new(codes::E_INVALIDARG, "The parameter is incorrect."));
        }
        Ok(())
    }

    /// Settle where `name` lands in `folder`, clearing the way for `ReplaceExisting`.
    ///
    /// `source` is the key of a file being moved or copied; a folder holding
    /// it is never replaced.
    fn place(
        &self,
        tree: &mut Tree,
        folder: &str,
        name: &str,
        kind: ItemKind,
        option: CreationCollisionOption,
        source: Option<&str>,
    ) -> NativeResult<Placement> {
        let target = self.resolver.combine(folder, &[name]);
        let key = self.key(&target);
        let Some(occupant) = tree.nodes.get(&key) else {
            return Ok(Placement::Vacant(target));
        };

        match option {
            CreationCollisionOption::FailIfExists => Err(already_exists()),
            CreationCollisionOption::OpenIfExists if occupant.kind == kind => {
                Ok(Placement::Existing(occupant.item()))
            }
            CreationCollisionOption::OpenIfExists => Err(already_exists()),
            CreationCollisionOption::ReplaceExisting => {
                if let Some(source) = source {
                    if self.resolver.is_within(source, &key) {
                        return Err(NativeError::new(
                            codes::E_INVALIDARG,
                            "The destination folder contains the source file.",
                        ));
                    }
                }
                tree.remove_subtree(&key, self.resolver.separator());
                Ok(Placement::Vacant(target))
            }
            CreationCollisionOption::GenerateUniqueName => {
                let entry_kind = match kind {
                    ItemKind::File => EntryKind::File,
                    ItemKind::Folder => EntryKind::Directory,
                };
                let mut counter = FIRST_UNIQUE_SUFFIX;
                loop {
                    let candidate = self
                        .resolver
                        .combine(folder, &[candidate_name(&self.resolver, name, entry_kind, counter)]);
                    if !tree.nodes.contains_key(&self.key(&candidate)) {
                        return Ok(Placement::Vacant(candidate));
                    }
                    trace!(candidate, "native name taken");
                    counter += 1;
                }
            }
        }
    }

    fn create(
        &self,
        folder: &str,
        name: &str,
        kind: ItemKind,
        option: CreationCollisionOption,
    ) -> NativeResult<StorageItem> {
        self.check_name(name)?;
        let mut tree = self.tree.lock();
        self.folder_key(&tree, folder)?;
        match self.place(&mut tree, folder, name, kind, option, None)? {
            Placement::Existing(item) => Ok(item),
            Placement::Vacant(path) => {
                let key = self.key(&path);
                Ok(tree.insert(key, path, kind, Vec::new()))
            }
        }
    }

    fn relocate(
        &self,
        file: &str,
        folder: &str,
        name: &str,
        option: NameCollisionOption,
        keep_source: bool,
    ) -> NativeResult<StorageItem> {
        self.check_name(name)?;
        let mut tree = self.tree.lock();
        let source_key = self.key(file);
        match tree.nodes.get(&source_key) {
            Some(node) if node.kind == ItemKind::File => {}
            _ => return Err(file_not_found()),
        }
        self.folder_key(&tree, folder)?;

        let target = self.resolver.combine(folder, &[name]);
        if !keep_source && self.key(&target) == source_key {
            // Only the spelling changes
            if let Some(node) = tree.nodes.get_mut(&source_key) {
                node.path = target;
                return Ok(node.item());
            }
        }

        let option = match option {
            NameCollisionOption::FailIfExists => CreationCollisionOption::FailIfExists,
            NameCollisionOption::ReplaceExisting => CreationCollisionOption::ReplaceExisting,
            NameCollisionOption::GenerateUniqueName => CreationCollisionOption::GenerateUniqueName,
        };
        let Placement::Vacant(path) =
            self.place(&mut tree, folder, name, ItemKind::File, option, Some(&source_key))?
        else {
            return Err(already_exists());
        };
        let key = self.key(&path);

        if keep_source {
            let bytes = match tree.nodes.get(&source_key) {
                Some(node) => node.data.lock().clone(),
                None => return Err(file_not_found()),
            };
            return Ok(tree.insert(key, path, ItemKind::File, bytes));
        }

        let mut node = tree.nodes.remove(&source_key).ok_or_else(file_not_found)?;
        node.path = path;
        let item = node.item();
        tree.nodes.insert(key, node);
        Ok(item)
    }
}

fn file_not_found() -> NativeError {
    NativeError::new(codes::E_FILE_NOT_FOUND, "The system cannot find the file specified.")
}

fn path_not_found() -> NativeError {
    NativeError::new(codes::E_PATH_NOT_FOUND, "The system cannot find the path specified.")
}

fn already_exists() -> NativeError {
    NativeError::new(
        codes::E_ALREADY_EXISTS,
        "Cannot create a file when that file already exists.",
    )
}

#[async_trait]
impl NativeStore for MemoryStore {
    async fn get_item(&self, path: &str) -> NativeResult<StorageItem> {
        let tree = self.tree.lock();
        tree.nodes.get(&self.key(path)).map(Node::item).ok_or_else(file_not_found)
    }

    async fn create_file(
        &self,
        folder: &str,
        name: &str,
        option: CreationCollisionOption,
    ) -> NativeResult<StorageItem> {
        self.create(folder, name, ItemKind::File, option)
    }

    async fn create_folder(
        &self,
        folder: &str,
        name: &str,
        option: CreationCollisionOption,
    ) -> NativeResult<StorageItem> {
        self.create(folder, name, ItemKind::Folder, option)
    }

    async fn move_file(
        &self,
        file: &str,
        folder: &str,
        name: &str,
        option: NameCollisionOption,
    ) -> NativeResult<StorageItem> {
        self.relocate(file, folder, name, option, false)
    }

    async fn copy_file(
        &self,
        file: &str,
        folder: &str,
        name: &str,
        option: NameCollisionOption,
    ) -> NativeResult<StorageItem> {
        self.relocate(file, folder, name, option, true)
    }

    async fn delete(&self, path: &str) -> NativeResult<()> {
        let mut tree = self.tree.lock();
        let key = self.key(path);
        if !tree.nodes.contains_key(&key) {
            return Err(file_not_found());
        }
        tree.remove_subtree(&key, self.resolver.separator());
        Ok(())
    }

    async fn children(&self, folder: &str) -> NativeResult<Vec<StorageItem>> {
        let tree = self.tree.lock();
        let folder_key = self.folder_key(&tree, folder)?;
        Ok(tree
            .nodes
            .values()
            .filter(|node| {
                self.resolver.parent(&node.path).map(|p| self.key(p)).as_deref()
                    == Some(folder_key.as_str())
            })
            .map(Node::item)
            .collect())
    }

    async fn open(&self, file: &str, mode: AccessMode) -> NativeResult<FileStream> {
        let mut tree = self.tree.lock();
        let key = self.key(file);
        let data = match (tree.nodes.get(&key), mode) {
            (Some(node), _) if node.kind == ItemKind::File => Arc::clone(&node.data),
            (Some(_), _) => {
                return Err(NativeError::new(codes::E_ACCESSDENIED, "Access is denied."));
            }
            (None, AccessMode::ReadOnly) => return Err(file_not_found()),
            (None, AccessMode::ReadWrite) => {
                let folder = self.resolver.parent(file).ok_or_else(path_not_found)?;
                self.folder_key(&tree, folder)?;
                let path = self.resolver.normalize(file);
                tree.insert(key.clone(), path, ItemKind::File, Vec::new());
                tree.nodes
                    .get(&key)
                    .map(|node| Arc::clone(&node.data))
                    .ok_or_else(file_not_found)?
            }
        };
        Ok(Box::new(MemoryStream::new(data, mode == AccessMode::ReadWrite)))
    }
}

/// Cursor over a shared in-memory file body
pub struct MemoryStream {
    data: Arc<Mutex<Vec<u8>>>,
    position: u64,
    writable: bool,
}

impl MemoryStream {
    fn new(data: Arc<Mutex<Vec<u8>>>, writable: bool) -> Self {
        Self { data, position: 0, writable }
    }
}

impl AsyncRead for MemoryStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let data = this.data.lock();
        let start = usize::try_from(this.position).unwrap_or(usize::MAX).min(data.len());
        let n = buf.remaining().min(data.len() - start);
        buf.put_slice(&data[start..start + n]);
        drop(data);
        this.position += n as u64;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MemoryStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if !this.writable {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "stream was opened read-only",
            )));
        }
        let start = usize::try_from(this.position)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "position out of range"))?;
        let end = start + buf.len();
        let mut data = this.data.lock();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        drop(data);
        this.position = end as u64;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl AsyncSeek for MemoryStream {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        let this = self.get_mut();
        let len = this.data.lock().len() as i64;
        let target = match position {
            SeekFrom::Start(pos) => Some(pos),
            SeekFrom::End(offset) => u64::try_from(len + offset).ok(),
            SeekFrom::Current(offset) => u64::try_from(this.position as i64 + offset).ok(),
        };
        this.position = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of file")
        })?;
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Ok(self.position))
    }
}
