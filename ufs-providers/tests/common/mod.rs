// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared fixtures: every test runs against both providers

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use ufs_core::{
    AccessMode, CancellationToken, Directory, File, Platform, PlatformContext, StorageConfig,
    StorageProvider,
};
use ufs_providers::{LocalFileSystem, NativeFileSystem};

pub struct Fixture {
    pub name: &'static str,
    pub provider: Arc<dyn StorageProvider>,
    _temp: Option<TempDir>,
}

impl Fixture {
    pub fn local_root(&self) -> Directory {
        self.provider.local_storage().unwrap()
    }
}

pub async fn fixtures() -> Vec<Fixture> {
    fixtures_with(StorageConfig::default()).await
}

pub async fn fixtures_with(config: StorageConfig) -> Vec<Fixture> {
    let temp = TempDir::new().unwrap();
    let context = PlatformContext::new(
        Platform::detect(),
        temp.path().join("local"),
        Some(temp.path().join("roaming")),
        temp.path().join("tmp"),
    );
    let local = LocalFileSystem::new(&context, &config);
    local.prepare().await.unwrap();

    let native_context = PlatformContext::new(
        Platform::Linux,
        PathBuf::from("/app/local"),
        Some(PathBuf::from("/app/roaming")),
        PathBuf::from("/app/tmp"),
    );
    let native = NativeFileSystem::in_memory(&native_context, &config);

    vec![
        Fixture { name: "local", provider: Arc::new(local), _temp: Some(temp) },
        Fixture { name: "native", provider: Arc::new(native), _temp: None },
    ]
}

pub fn token() -> CancellationToken {
    CancellationToken::new()
}

pub async fn write(file: &mut File, bytes: &[u8]) {
    let mut stream = file.open(AccessMode::ReadWrite, &token()).await.unwrap();
    stream.write_all(bytes).await.unwrap();
    stream.flush().await.unwrap();
    stream.shutdown().await.unwrap();
}

pub async fn read(file: &mut File) -> Vec<u8> {
    let mut stream = file.open(AccessMode::ReadOnly, &token()).await.unwrap();
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).await.unwrap();
    bytes
}

pub async fn file_names(dir: &Directory) -> Vec<String> {
    let mut names: Vec<String> = dir
        .list_files(None, &token())
        .await
        .unwrap()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    names.sort();
    names
}
