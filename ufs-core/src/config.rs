// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::copy::DEFAULT_COPY_BUFFER_SIZE;
use crate::error::{StorageError, StorageResult};

/// Top-level configuration, usually read from a TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bytes moved per read/write step when copying
    pub copy_buffer_size: usize,
    pub app: AppIdentity,
    pub roots: RootOverrides,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            app: AppIdentity::default(),
            roots: RootOverrides::default(),
        }
    }
}

/// Identifies the application to the platform's data-directory conventions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppIdentity {
    pub qualifier: String,
    pub organization: String,
    pub application: String,
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            qualifier: "org".into(),
            organization: "ufs".into(),
            application: "ufs".into(),
        }
    }
}

/// Explicit root locations, taking precedence over platform detection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RootOverrides {
    pub local: Option<PathBuf>,
    pub roaming: Option<PathBuf>,
    pub temporary: Option<PathBuf>,
}

impl StorageConfig {
    pub fn from_toml_str(text: &str) -> StorageResult<Self> {
        let config: StorageConfig = toml::from_str(text)
            .map_err(|e| StorageError::InvalidArgument(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            StorageError::io(format!("failed to read config {}", path.display()), e)
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.copy_buffer_size == 0 {
            return Err(StorageError::InvalidArgument(
                "copy_buffer_size must be greater than zero".into(),
            ));
        }
        if self.app.application.is_empty() {
            return Err(StorageError::InvalidArgument("app.application must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.copy_buffer_size, 81_920);
        assert!(config.roots.local.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = StorageConfig::from_toml_str(
            r#"
            copy_buffer_size = 4096

            [app]
            application = "notes"

            [roots]
            temporary = "/var/tmp/notes"
            "#,
        )
        .unwrap();

        assert_eq!(config.copy_buffer_size, 4096);
        assert_eq!(config.app.application, "notes");
        assert_eq!(config.app.organization, "ufs");
        assert_eq!(config.roots.temporary, Some(PathBuf::from("/var/tmp/notes")));
        assert!(config.roots.roaming.is_none());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let err = StorageConfig::from_toml_str("copy_buffer_size = 0").unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ufs.toml");
        std::fs::write(&path, "copy_buffer_size = 512\n").unwrap();

        let config = StorageConfig::load(&path).unwrap();
        assert_eq!(config.copy_buffer_size, 512);

        let missing = StorageConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert_eq!(missing.kind(), crate::error::ErrorKind::Io);
    }
}
