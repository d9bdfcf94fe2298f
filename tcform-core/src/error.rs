//! Error types for tcform-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or saving manifests and config.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Underlying I/O failure, with the path that was being accessed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path and serde_yaml's line context.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`, so `~/.tcform/` cannot be located.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The requested file did not exist.
    #[error("file not found at {path}")]
    NotFound { path: PathBuf },

    /// The manifest parsed but declares something unusable.
    #[error("invalid resource '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ManifestError {
    ManifestError::Io {
        path: path.into(),
        source,
    }
}
