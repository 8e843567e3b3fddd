// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage providers for Unified Storage
//!
//! Two implementations of the provider seam: the machine's own hierarchical
//! filesystem, and handle-based native storage with atomic collision handling.

#[cfg(feature = "local")]
mod local;

#[cfg(feature = "native")]
pub mod native;

#[cfg(feature = "local")]
pub use local::{LocalBackend, LocalFileSystem};

#[cfg(feature = "native")]
pub use native::{MemoryStore, NativeBackend, NativeFileSystem};

use std::collections::HashMap;
use std::sync::Arc;
use ufs_core::{StorageError, StorageProvider, StorageResult};

/// Registry of storage providers, keyed by backend id
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn StorageProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self { providers: HashMap::new() }
    }

    pub fn register(&mut self, provider: Arc<dyn StorageProvider>) {
        let id = provider.backend().id().to_string();
        self.providers.insert(id, provider);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn StorageProvider>> {
        self.providers.get(id).cloned()
    }

    pub fn get_or_err(&self, id: &str) -> StorageResult<Arc<dyn StorageProvider>> {
        self.get(id)
            .ok_or_else(|| StorageError::Unsupported(format!("no provider registered as '{id}'")))
    }

    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn remove(&mut self, id: &str) -> Option<Arc<dyn StorageProvider>> {
        self.providers.remove(id)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
