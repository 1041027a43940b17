//! Application directory helpers anchored to a single `.signpal` folder.
//!
//! Config and log files live under the OS config directory by default
//! (e.g., `%APPDATA%` on Windows). The `SIGNPAL_CONFIG_HOME` environment
//! variable overrides the base for tests or portable setups.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the OS config root.
pub const APP_DIR_NAME: &str = ".signpal";

const CONFIG_HOME_ENV: &str = "SIGNPAL_CONFIG_HOME";

static CONFIG_BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// No suitable base config directory could be resolved.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    /// Failed to create the application directory.
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the root `.signpal` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = config_base_dir().ok_or(AppDirError::NoBaseDir)?;
    let path = base.join(APP_DIR_NAME);
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Return the logs directory inside the `.signpal` root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    let path = app_root_dir()?.join("logs");
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Redirect the base directory, bypassing the environment and OS defaults.
///
/// Intended for tests that must not touch the real user profile. Pass `None`
/// to restore normal resolution.
pub fn set_config_base_override(path: Option<PathBuf>) {
    if let Ok(mut guard) = CONFIG_BASE_OVERRIDE.lock() {
        *guard = path;
    }
}

fn config_base_dir() -> Option<PathBuf> {
    if let Ok(guard) = CONFIG_BASE_OVERRIDE.lock() {
        if let Some(path) = guard.as_ref() {
            return Some(path.clone());
        }
    }
    if let Some(home) = std::env::var_os(CONFIG_HOME_ENV) {
        if !home.is_empty() {
            return Some(PathBuf::from(home));
        }
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}
