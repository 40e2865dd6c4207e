//! Configuration file support for tvone.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (TVONE_*)
//! 3. Local config file (./tvone.toml)
//! 4. Global config file (~/.config/tvone/config.toml)

use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Connection configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ConnectionConfig {
    /// Preferred serial port (e.g., "/dev/ttyUSB0" or "COM3").
    pub serial: Option<String>,
    /// Default baud rate.
    pub baud: Option<u32>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Config {
    /// Connection settings.
    #[serde(default)]
    pub connection: ConnectionConfig,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                if let Some(global_config) = Self::load_from_file(&global_path) {
                    debug!("Loaded global config from {}", global_path.display());
                    config.merge(global_config);
                }
            }
        }

        // Local config overrides global
        if let Some(local_config) = Self::load_from_file(Path::new("tvone.toml")) {
            debug!("Loaded local config from tvone.toml");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let content = fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(err) => {
                warn!("Invalid config file {}: {err}", path.display());
                None
            },
        }
    }

    /// Path of the global config file.
    fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "sparkav", "tvone")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Merge another config into this one; the other's values win.
    fn merge(&mut self, other: Self) {
        if other.connection.serial.is_some() {
            self.connection.serial = other.connection.serial;
        }
        if other.connection.baud.is_some() {
            self.connection.baud = other.connection.baud;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [connection]
            serial = "/dev/ttyUSB1"
            baud = 115200
            "#,
        )
        .unwrap();
        assert_eq!(config.connection.serial.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.connection.baud, Some(115200));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.connection.serial.is_none());
        assert!(config.connection.baud.is_none());
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Config::default();
        base.connection.serial = Some("/dev/ttyUSB0".into());
        base.connection.baud = Some(57600);

        let other = Config {
            connection: ConnectionConfig {
                serial: Some("/dev/ttyUSB9".into()),
                baud: None,
            },
        };

        base.merge(other);
        assert_eq!(base.connection.serial.as_deref(), Some("/dev/ttyUSB9"));
        assert_eq!(base.connection.baud, Some(57600));
    }

    #[test]
    fn test_load_from_invalid_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        let config = Config::load_from_path(file.path());
        assert!(config.connection.serial.is_none());
    }
}
