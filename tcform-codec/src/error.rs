//! Error types for tcform-codec.

use thiserror::Error;

use tcform_core::ParameterKind;

/// All errors that can arise while converting between declarative and remote shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A declared parameter value was not a plain string. The whole
    /// collection is rejected; nothing is partially applied.
    #[error("invalid value for {kind} parameter '{name}': expected a string, found {found}")]
    InvalidParameterValue {
        kind: ParameterKind,
        name: String,
        found: &'static str,
    },

    /// A step engine tag (declarative side) or runner type (remote side)
    /// that this codec has no variant for.
    #[error("unsupported step type '{tag}'")]
    UnsupportedStepType { tag: String },
}
