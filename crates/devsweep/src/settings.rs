//! Configuration and settings management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub ui: UiSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanSettings {
    /// Extra target directory names, scanned as category `custom`.
    #[serde(default)]
    pub include: Vec<String>,
    /// Built-in target names to drop from the catalog.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Maximum directory depth from the root; 0 means unlimited.
    #[serde(default)]
    pub depth: u32,
    /// Directory names to skip entirely, on top of the built-in VCS set.
    #[serde(default)]
    pub skip: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    #[serde(default = "default_confirm_deletes")]
    pub confirm_deletes: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            confirm_deletes: default_confirm_deletes(),
        }
    }
}

fn default_confirm_deletes() -> bool {
    true
}

impl Settings {
    /// Load settings from a file, or return defaults if the file doesn't exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

        Ok(settings)
    }

    /// Save settings to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        Ok(())
    }

    /// Locate the settings file for a run: an explicit `--config` path wins,
    /// then `<root>/.devsweep.toml`, then the per-user config directory.
    pub fn resolve_path(root: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let in_root = root.join(".devsweep.toml");
        if in_root.is_file() {
            return Some(in_root);
        }
        let user = Self::default_path();
        if user.is_file() {
            return Some(user);
        }
        None
    }

    /// Get the default per-user settings file path
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("devsweep");

        config_dir.join("settings.toml")
    }
}

// Minimal cross-platform config directory lookup; avoids pulling in a crate
// for one path.
mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var_os("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
                })
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("APPDATA").map(PathBuf::from)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}
