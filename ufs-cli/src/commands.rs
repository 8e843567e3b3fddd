// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations

use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::debug;
use ufs_core::{
    copy::transfer, AccessMode, CancellationToken, CollisionPolicy, Directory, File, Probe,
    StorageConfig, StorageError, StoragePath, StorageProvider, StorageResult, StorageRoot,
};
use ufs_providers::{LocalFileSystem, ProviderRegistry};

/// One CLI invocation: the provider plus a Ctrl-C driven cancellation token
pub struct Session {
    local: Arc<LocalFileSystem>,
    provider: Arc<dyn StorageProvider>,
    cancel: CancellationToken,
}

impl Session {
    pub async fn open(config_path: Option<&Path>) -> StorageResult<Self> {
        let config = match config_path {
            Some(path) => StorageConfig::load(path)?,
            None => StorageConfig::default(),
        };

        let local = Arc::new(LocalFileSystem::from_config(&config)?);

        let mut registry = ProviderRegistry::new();
        registry.register(local.clone());
        let provider = registry.get_or_err("local")?;

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{}", style("Interrupted, stopping at the next checkpoint").yellow());
                on_interrupt.cancel();
            }
        });

        Ok(Self { local, provider, cancel })
    }

    /// Create the storage roots; only commands that write call this
    async fn prepare(&self) -> StorageResult<()> {
        self.local.prepare().await
    }

    /// Absolute path for a command-line argument
    fn path(&self, raw: &str) -> StorageResult<StoragePath> {
        let path = PathBuf::from(raw);
        let absolute = if path.is_absolute() {
            path
        } else {
            let cwd = std::env::current_dir()
                .map_err(|e| StorageError::io("cannot read current directory", e))?;
            cwd.join(path)
        };
        Ok(self.provider.create_path(&absolute.to_string_lossy()))
    }

    async fn file(&self, raw: &str) -> StorageResult<File> {
        let path = self.path(raw)?;
        self.provider.get_file_from_path(path.as_str(), &self.cancel).await
    }

    async fn directory(&self, raw: &str) -> StorageResult<Directory> {
        let path = self.path(raw)?;
        self.provider.get_directory_from_path(path.as_str(), &self.cancel).await
    }

    /// Parent directory and leaf name for a path that is about to be created
    async fn split(&self, raw: &str) -> StorageResult<(Directory, String)> {
        let path = self.path(raw)?;
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidArgument(format!("'{path}' has no parent")))?;
        let dir = self.provider.get_directory_from_path(parent.as_str(), &self.cancel).await?;
        Ok((dir, path.leaf_name().to_string()))
    }

    /// `dest` itself, or `dest/<name>` when `dest` is an existing directory
    async fn destination(&self, dest: &str, name: &str) -> StorageResult<StoragePath> {
        let mut dir = self.directory(dest).await?;
        if dir.exists(&self.cancel).await? {
            Ok(dir.path().join(name))
        } else {
            self.path(dest)
        }
    }

    pub fn roots(&self) -> StorageResult<()> {
        #[derive(Tabled)]
        struct RootRow {
            #[tabled(rename = "Root")]
            root: String,
            #[tabled(rename = "Path")]
            path: String,
        }

        let rows: Vec<RootRow> = StorageRoot::ALL
            .iter()
            .map(|&root| RootRow {
                root: root.to_string(),
                path: match self.provider.root(root) {
                    Ok(dir) => dir.path().to_string(),
                    Err(e) => style(e.to_string()).dim().to_string(),
                },
            })
            .collect();

        println!(
            "Provider: {}  Platform: {}",
            style(self.provider.backend().display_name()).bold(),
            self.provider.roots().platform()
        );
        println!("{}", Table::new(rows));
        Ok(())
    }

    pub async fn ls(&self, raw: &str, pattern: Option<&str>) -> StorageResult<()> {
        #[derive(Tabled)]
        struct LsEntry {
            #[tabled(rename = "Type")]
            kind: String,
            #[tabled(rename = "Name")]
            name: String,
        }

        let dir = self.directory(raw).await?;
        debug!(dir = %dir, pattern, "listing");

        let mut entries: Vec<LsEntry> = Vec::new();
        if pattern.is_none() {
            let mut dirs: Vec<String> = dir
                .list_directories(&self.cancel)
                .await?
                .iter()
                .map(|sub| sub.name().to_string())
                .collect();
            dirs.sort();
            entries.extend(dirs.into_iter().map(|name| LsEntry {
                kind: style("d").cyan().to_string(),
                name: style(name).cyan().to_string(),
            }));
        }

        let mut files: Vec<String> = dir
            .list_files(pattern, &self.cancel)
            .await?
            .iter()
            .map(|file| file.name().to_string())
            .collect();
        files.sort();
        entries.extend(files.into_iter().map(|name| LsEntry { kind: "-".to_string(), name }));

        if entries.is_empty() {
            println!("(empty directory)");
        } else {
            println!("{}", Table::new(entries));
        }
        Ok(())
    }

    pub async fn touch(&self, raw: &str, policy: CollisionPolicy) -> StorageResult<()> {
        self.prepare().await?;
        let (dir, name) = self.split(raw).await?;
        let file = dir.create_file(&name, policy, &self.cancel).await?;
        println!("Created {}", style(file.path()).green());
        Ok(())
    }

    pub async fn mkdir(&self, raw: &str, policy: CollisionPolicy) -> StorageResult<()> {
        self.prepare().await?;
        let (dir, name) = self.split(raw).await?;
        let created = dir.create_directory(&name, policy, &self.cancel).await?;
        println!("Created {}", style(created.path()).green());
        Ok(())
    }

    pub async fn mv(&self, source: &str, dest: &str, policy: CollisionPolicy) -> StorageResult<()> {
        self.prepare().await?;
        let mut file = self.file(source).await?;
        let target = self.destination(dest, file.name()).await?;
        let from = file.path().clone();
        file.move_to(&target, policy, &self.cancel).await?;
        println!("Moved {} -> {}", from, style(file.path()).green());
        Ok(())
    }

    pub async fn rename(&self, raw: &str, new_name: &str, policy: CollisionPolicy) -> StorageResult<()> {
        self.prepare().await?;
        let mut file = self.file(raw).await?;
        let from = file.name().to_string();
        file.rename(new_name, policy, &self.cancel).await?;
        println!("Renamed {} -> {}", from, style(file.name()).green());
        Ok(())
    }

    pub async fn cp(&self, source: &str, dest: &str, policy: CollisionPolicy) -> StorageResult<()> {
        self.prepare().await?;
        let file = self.file(source).await?;
        let target = self.destination(dest, file.name()).await?;
        let copy = file.copy_to(&target, policy, &self.cancel).await?;
        println!("Copied {} -> {}", file.path(), style(copy.path()).green());
        Ok(())
    }

    pub async fn rm(&self, paths: &[String]) -> StorageResult<()> {
        for raw in paths {
            let path = self.path(raw)?;
            match self.provider.backend().probe(&path).await? {
                Probe::Directory(_) => self.directory(raw).await?.delete(&self.cancel).await?,
                _ => self.file(raw).await?.delete(&self.cancel).await?,
            }
            println!("Removed {raw}");
        }
        Ok(())
    }

    pub async fn exists(&self, raw: &str) -> StorageResult<()> {
        let path = self.path(raw)?;
        let verdict = match self.provider.backend().probe(&path).await? {
            Probe::File(_) => style("file").green(),
            Probe::Directory(_) => style("directory").cyan(),
            Probe::Missing => style("missing").red(),
        };
        println!("{path}: {verdict}");
        Ok(())
    }

    pub async fn cat(&self, raw: &str) -> StorageResult<()> {
        let mut file = self.file(raw).await?;
        let mut stream = file.open(AccessMode::ReadOnly, &self.cancel).await?;
        let mut stdout = tokio::io::stdout();
        let buffer_size = self.provider.backend().copy_buffer_size();
        transfer(&mut stream, &mut stdout, buffer_size, &self.cancel).await?;
        Ok(())
    }
}
