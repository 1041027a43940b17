//! Settings persistence for dataset roots and playback behavior.
//!
//! Settings live in a TOML file under the `.signpal` application directory.
//! A missing file yields defaults so fresh installs work without setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{self, AppDirError};

/// File name of the settings document inside the app directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that may occur while loading or saving app configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not resolve or create the application directory.
    #[error("Could not resolve application directory: {0}")]
    AppDir(#[from] AppDirError),
    /// Failed to read the settings file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write the settings file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse the settings file as TOML.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to serialize settings to TOML.
    #[error("Failed to serialize config to TOML: {0}")]
    SerializeToml(#[from] toml::ser::Error),
}

/// Persistent settings for the dataset tools and viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Root of the continuous dataset split.
    pub continuous_root: Option<PathBuf>,
    /// Root of the isolated dataset split.
    pub isolated_root: Option<PathBuf>,
    /// Location of the SQLite database file.
    pub database_path: Option<PathBuf>,
    /// Skeleton playback timing.
    pub playback: PlaybackSettings,
}

impl Settings {
    fn normalized(mut self) -> Self {
        self.playback = self.playback.normalized();
        self
    }
}

/// Tick timing for the skeleton viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Initial auto-advance period in milliseconds.
    pub interval_ms: u64,
    /// Lower bound accepted for the period.
    pub min_interval_ms: u64,
    /// Upper bound accepted for the period.
    pub max_interval_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            interval_ms: 40,
            min_interval_ms: 10,
            max_interval_ms: 1000,
        }
    }
}

impl PlaybackSettings {
    /// Clamp a requested tick period to the configured bounds.
    pub fn clamp_interval(&self, ms: u64) -> u64 {
        let max = self.max_interval_ms.max(self.min_interval_ms);
        ms.clamp(self.min_interval_ms, max)
    }

    fn normalized(mut self) -> Self {
        if self.max_interval_ms < self.min_interval_ms {
            std::mem::swap(&mut self.min_interval_ms, &mut self.max_interval_ms);
        }
        self.interval_ms = self.clamp_interval(self.interval_ms);
        self
    }
}

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load settings from the app directory, returning defaults if missing.
pub fn load_or_default() -> Result<Settings, ConfigError> {
    load_settings_from(&config_path()?)
}

/// Load settings from an explicit path, returning defaults if missing.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: Settings = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(settings.normalized())
}

/// Persist settings to the app directory.
pub fn save(settings: &Settings) -> Result<(), ConfigError> {
    save_settings_to(settings, &config_path()?)
}

/// Persist settings to an explicit path.
pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(settings)?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.playback.interval_ms, 40);
    }

    #[test]
    fn settings_roundtrip_through_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut settings = Settings::default();
        settings.continuous_root = Some(PathBuf::from("/data/cont"));
        settings.playback.interval_ms = 100;
        save_settings_to(&settings, &path).unwrap();
        let loaded = load_settings_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn interval_is_clamped_to_bounds() {
        let playback = PlaybackSettings::default();
        assert_eq!(playback.clamp_interval(5), 10);
        assert_eq!(playback.clamp_interval(5000), 1000);
        assert_eq!(playback.clamp_interval(250), 250);
    }

    #[test]
    fn normalization_repairs_inverted_bounds() {
        let settings = Settings {
            playback: PlaybackSettings {
                interval_ms: 2000,
                min_interval_ms: 500,
                max_interval_ms: 20,
            },
            ..Settings::default()
        }
        .normalized();
        assert_eq!(settings.playback.min_interval_ms, 20);
        assert_eq!(settings.playback.max_interval_ms, 500);
        assert_eq!(settings.playback.interval_ms, 500);
    }
}
