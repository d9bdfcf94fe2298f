//! Server connection settings.
//!
//! # Storage layout
//!
//! ```text
//! ~/.tcform/
//!   config.yaml          (server url, optional token, timeout; mode 0600)
//!   state/
//!     <workspace>.json   (written by tcform-sync)
//! ```
//!
//! Every path-deriving function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home, used by tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ManifestError};

fn default_timeout_secs() -> u64 {
    30
}

/// Where and how to reach the build server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL, e.g. `https://teamcity.example.com`.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ServerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Apply command-line or environment overrides on top of the file values.
    pub fn with_overrides(mut self, url: Option<String>, token: Option<String>) -> Self {
        if let Some(url) = url {
            self.url = url;
        }
        if token.is_some() {
            self.token = token;
        }
        self
    }
}

/// `<home>/.tcform/`
pub fn tcform_dir_at(home: &Path) -> PathBuf {
    home.join(".tcform")
}

/// `<home>/.tcform/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    tcform_dir_at(home).join("config.yaml")
}

/// Load the server config. Returns `Ok(None)` when no config file exists.
pub fn load_at(home: &Path) -> Result<Option<ServerConfig>, ManifestError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(|e| ManifestError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Option<ServerConfig>, ManifestError> {
    load_at(&home()?)
}

/// Atomically save the server config with mode `0600`; it may hold a token.
pub fn save_at(home: &Path, config: &ServerConfig) -> Result<(), ManifestError> {
    let dir = tcform_dir_at(home);
    std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    let path = config_path_at(home);
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Resolve the current user's home directory.
pub fn home() -> Result<PathBuf, ManifestError> {
    dirs::home_dir().ok_or(ManifestError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ManifestError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ManifestError> {
    Ok(())
}
