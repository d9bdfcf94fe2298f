//! Error types for tcform-sync.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use tcform_client::ClientError;
use tcform_codec::CodecError;
use tcform_core::ManifestError;

use crate::report::CreateReport;

/// All errors that can arise from reconciliation and the apply pipeline.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Declared input could not be expanded, or a remote step could not be
    /// flattened.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A remote call failed before anything was created.
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The entity was created but a later sub-resource call failed. The
    /// entity is left in place; `report` lists what did and did not land.
    #[error("{entity} '{id}' was created but is incomplete: {source}")]
    PartialCreate {
        entity: &'static str,
        id: String,
        report: CreateReport,
        #[source]
        source: ClientError,
    },

    /// Any of the above, attributed to a manifest resource.
    #[error("{key}: {source}")]
    Resource {
        key: String,
        #[source]
        source: Box<SyncError>,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file JSON error.
    #[error("state file JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML rendering error (drift output).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Coarse classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed declarative input.
    Validation,
    /// A step engine with no codec variant, in either direction.
    UnsupportedVariant,
    /// Entity or sub-resource absent on the server.
    RemoteNotFound,
    /// Any other failure surfaced by the remote client.
    RemoteCallFailure,
    /// The local state file could not be read or written.
    LocalState,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::UnsupportedVariant => "unsupported variant",
            ErrorKind::RemoteNotFound => "remote not found",
            ErrorKind::RemoteCallFailure => "remote call failure",
            ErrorKind::LocalState => "local state error",
        };
        f.write_str(s)
    }
}

fn client_kind(err: &ClientError) -> ErrorKind {
    if err.is_not_found() {
        ErrorKind::RemoteNotFound
    } else {
        ErrorKind::RemoteCallFailure
    }
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Codec(CodecError::InvalidParameterValue { .. }) => ErrorKind::Validation,
            SyncError::Codec(CodecError::UnsupportedStepType { .. }) => {
                ErrorKind::UnsupportedVariant
            }
            SyncError::Manifest(_) => ErrorKind::Validation,
            SyncError::Client(err) | SyncError::PartialCreate { source: err, .. } => {
                client_kind(err)
            }
            SyncError::Resource { source, .. } => source.kind(),
            SyncError::Io { .. } | SyncError::Json(_) | SyncError::Yaml(_) => {
                ErrorKind::LocalState
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::RemoteNotFound
    }

    /// Attribute this error to manifest resource `key`.
    pub fn for_resource(self, key: impl Into<String>) -> Self {
        match self {
            already @ SyncError::Resource { .. } => already,
            other => SyncError::Resource {
                key: key.into(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through resource attribution.
    pub fn root(&self) -> &SyncError {
        match self {
            SyncError::Resource { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
