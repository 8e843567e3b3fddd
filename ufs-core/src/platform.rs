// SPDX-License-Identifier: AGPL-3.0-or-later
//! Platform detection
//!
//! Supports: Linux, macOS, Windows, iOS, Android

use serde::{Deserialize, Serialize};
use std::fmt;

/// The platform a provider runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Ios,
    Android,
    Other,
}

impl Platform {
    pub fn detect() -> Self {
        #[cfg(target_os = "linux")]
        return Self::Linux;

        #[cfg(target_os = "macos")]
        return Self::MacOs;

        #[cfg(target_os = "windows")]
        return Self::Windows;

        #[cfg(target_os = "ios")]
        return Self::Ios;

        #[cfg(target_os = "android")]
        return Self::Android;

        #[cfg(not(any(
            target_os = "linux",
            target_os = "macos",
            target_os = "windows",
            target_os = "ios",
            target_os = "android"
        )))]
        return Self::Other;
    }

    /// Handsets have no cloud-synced roaming folder
    pub fn is_mobile(&self) -> bool {
        matches!(self, Self::Ios | Self::Android)
    }

    pub fn supports_roaming(&self) -> bool {
        !self.is_mobile()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "windows",
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
