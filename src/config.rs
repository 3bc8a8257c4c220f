//! Configuration management for panedeck.
//!
//! This module provides TOML configuration file loading from
//! `~/.panedeck/config.toml`.
//!
//! # Configuration File
//!
//! ```toml
//! # Shell for new shell panes (optional, defaults to $SHELL or bash)
//! shell = "zsh"
//!
//! # Panes opened when no files are given on the command line
//! startup = ["document"]
//!
//! # Prefix key letter (Ctrl+<letter>)
//! prefix_key = "b"
//!
//! [labels]
//! dirty_marker = "*"
//!
//! [directory]
//! show_hidden = false
//! show_parent_entry = true
//!
//! [tab_bar]
//! visible = true
//! max_label_width = 24
//!
//! [status_bar]
//! visible = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::content::home_dir;
use crate::session::PaneKind;

/// Directory under the home directory holding config and log files
pub const CONFIG_DIR: &str = ".panedeck";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell command for shell panes
    pub shell: Option<String>,
    /// Pane kinds opened at startup when no paths are given
    pub startup: Vec<PaneKind>,
    /// Prefix key letter (Ctrl+<letter>)
    pub prefix_key: String,
    /// Tab label settings
    pub labels: LabelConfig,
    /// Directory view settings
    pub directory: DirectoryConfig,
    /// Tab bar settings
    pub tab_bar: TabBarConfig,
    /// Status bar settings
    pub status_bar: StatusBarConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            startup: vec![PaneKind::Document],
            prefix_key: "b".to_string(),
            labels: LabelConfig::default(),
            directory: DirectoryConfig::default(),
            tab_bar: TabBarConfig::default(),
            status_bar: StatusBarConfig::default(),
        }
    }
}

/// Tab label configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Prefix shown on panes with unsaved changes
    pub dirty_marker: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            dirty_marker: "*".to_string(),
        }
    }
}

/// Directory view configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub show_hidden: bool,
    pub show_parent_entry: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            show_hidden: false,
            show_parent_entry: true,
        }
    }
}

/// Tab bar configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabBarConfig {
    pub visible: bool,
    /// Labels wider than this many columns are truncated
    pub max_label_width: usize,
}

impl Default for TabBarConfig {
    fn default() -> Self {
        Self {
            visible: true,
            max_label_width: 24,
        }
    }
}

/// Status bar configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusBarConfig {
    pub visible: bool,
}

impl Default for StatusBarConfig {
    fn default() -> Self {
        Self { visible: true }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Self {
        match Self::get_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                warn!("Failed to read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse configuration text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), String> {
        let path = Self::get_config_path().ok_or_else(|| "Could not determine config path".to_string())?;
        self.save_to(&path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;
        Ok(())
    }

    /// Prefix key as a lowercase ASCII letter
    pub fn prefix_char(&self) -> char {
        self.prefix_key
            .chars()
            .next()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or('b')
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }
}

/// `~/.panedeck`, created on first use
pub fn config_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(CONFIG_DIR);
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.startup, vec![PaneKind::Document]);
        assert_eq!(config.labels.dirty_marker, "*");
        assert!(config.directory.show_parent_entry);
        assert!(!config.directory.show_hidden);
        assert_eq!(config.prefix_char(), 'b');
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            shell = "zsh"
            startup = ["shell", "directory"]

            [directory]
            show_hidden = true
            "#,
        )
        .unwrap();

        assert_eq!(config.shell.as_deref(), Some("zsh"));
        assert_eq!(config.startup, vec![PaneKind::Shell, PaneKind::Directory]);
        assert!(config.directory.show_hidden);
        assert!(config.directory.show_parent_entry);
        assert_eq!(config.tab_bar.max_label_width, 24);
    }

    #[test]
    fn test_invalid_prefix_falls_back() {
        let config = Config {
            prefix_key: "1".to_string(),
            ..Config::default()
        };
        assert_eq!(config.prefix_char(), 'b');

        let config = Config {
            prefix_key: "A".to_string(),
            ..Config::default()
        };
        assert_eq!(config.prefix_char(), 'a');
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.labels.dirty_marker = "+".to_string();
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_unparsable_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "startup = 42").unwrap();

        assert_eq!(Config::load_from(&path), Config::default());
        assert_eq!(Config::load_from(&dir.path().join("absent.toml")), Config::default());
    }
}
