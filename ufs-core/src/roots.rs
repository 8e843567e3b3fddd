// SPDX-License-Identifier: AGPL-3.0-or-later
//! Well-known storage roots: local, roaming and temporary

use directories::{BaseDirs, ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{AppIdentity, StorageConfig};
use crate::error::{StorageError, StorageResult};
use crate::path::{PathResolver, StoragePath};
use crate::platform::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageRoot {
    Local,
    Roaming,
    Temporary,
}

impl StorageRoot {
    pub const ALL: [StorageRoot; 3] = [StorageRoot::Local, StorageRoot::Roaming, StorageRoot::Temporary];
}

impl fmt::Display for StorageRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageRoot::Local => "local",
            StorageRoot::Roaming => "roaming",
            StorageRoot::Temporary => "temporary",
        })
    }
}

impl FromStr for StorageRoot {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(StorageRoot::Local),
            "roaming" => Ok(StorageRoot::Roaming),
            "temporary" | "temp" | "tmp" => Ok(StorageRoot::Temporary),
            other => Err(StorageError::InvalidArgument(format!("unknown storage root '{other}'"))),
        }
    }
}

/// Explicit platform facts handed to a provider at construction
#[derive(Debug, Clone)]
pub struct PlatformContext {
    pub platform: Platform,
    pub local: PathBuf,
    /// `None` where the platform has no roaming concept
    pub roaming: Option<PathBuf>,
    pub temporary: PathBuf,
}

impl PlatformContext {
    pub fn new(platform: Platform, local: PathBuf, roaming: Option<PathBuf>, temporary: PathBuf) -> Self {
        Self { platform, local, roaming, temporary }
    }

    /// Conventional per-app locations for the running platform
    pub fn detect(app: &AppIdentity) -> StorageResult<Self> {
        Self::detect_for(Platform::detect(), app)
    }

    fn detect_for(platform: Platform, app: &AppIdentity) -> StorageResult<Self> {
        let temporary = std::env::temp_dir();
        let context = match platform {
            Platform::Ios => {
                let base = BaseDirs::new().ok_or_else(no_home)?;
                Self::new(platform, base.home_dir().join("Library"), None, temporary)
            }
            Platform::Android => {
                let local = UserDirs::new()
                    .and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
                    .ok_or_else(|| {
                        StorageError::Unsupported("no documents directory on this device".into())
                    })?;
                Self::new(platform, local, None, temporary)
            }
            _ => {
                let dirs = ProjectDirs::from(&app.qualifier, &app.organization, &app.application)
                    .ok_or_else(no_home)?;
                Self::new(
                    platform,
                    dirs.data_local_dir().to_path_buf(),
                    Some(dirs.data_dir().to_path_buf()),
                    temporary,
                )
            }
        };
        Ok(context)
    }

    /// Detect, then apply the overrides in `config.roots`
    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let overrides = &config.roots;
        let mut context = match Self::detect(&config.app) {
            Ok(context) => context,
            // Fully overridden roots do not need a home directory
            Err(_) if overrides.local.is_some() => Self::new(
                Platform::detect(),
                PathBuf::new(),
                None,
                std::env::temp_dir(),
            ),
            Err(e) => return Err(e),
        };
        if let Some(local) = &overrides.local {
            context.local = local.clone();
        }
        if let Some(roaming) = &overrides.roaming {
            if context.platform.supports_roaming() {
                context.roaming = Some(roaming.clone());
            }
        }
        if let Some(temporary) = &overrides.temporary {
            context.temporary = temporary.clone();
        }
        Ok(context)
    }

    /// Path syntax for this platform, with the roots registered as known roots
    pub fn resolver(&self) -> PathResolver {
        let mut resolver = PathResolver::for_platform(self.platform)
            .with_known_root(self.local.to_string_lossy())
            .with_known_root(self.temporary.to_string_lossy());
        if let Some(roaming) = &self.roaming {
            resolver = resolver.with_known_root(roaming.to_string_lossy());
        }
        resolver
    }
}

fn no_home() -> StorageError {
    StorageError::Unsupported("no home directory for this user".into())
}

/// The three root locations as provider paths
#[derive(Debug, Clone)]
pub struct StorageRoots {
    platform: Platform,
    local: StoragePath,
    roaming: Option<StoragePath>,
    temporary: StoragePath,
}

impl StorageRoots {
    pub fn new(context: &PlatformContext, resolver: &Arc<PathResolver>) -> Self {
        let to_path = |p: &Path| StoragePath::new(Arc::clone(resolver), p.to_string_lossy());
        Self {
            platform: context.platform,
            local: to_path(&context.local),
            roaming: context.roaming.as_deref().map(to_path),
            temporary: to_path(&context.temporary),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn path(&self, root: StorageRoot) -> StorageResult<&StoragePath> {
        match root {
            StorageRoot::Local => Ok(&self.local),
            StorageRoot::Temporary => Ok(&self.temporary),
            StorageRoot::Roaming => self.roaming.as_ref().ok_or_else(|| {
                StorageError::Unsupported("Roaming storage is not supported on this platform.".into())
            }),
        }
    }
}
