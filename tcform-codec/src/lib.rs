//! # tcform-codec
//!
//! Pure conversions between the declarative (flat) and remote (typed)
//! shapes, plus the identity fingerprints used to key unordered members.
//!
//! - [`params`]: per-kind key/value maps <-> [`ParameterCollection`](tcform_core::ParameterCollection)
//! - [`steps`]: [`StepSpec`](tcform_core::StepSpec) <-> [`BuildStep`](tcform_core::BuildStep) <-> runner records
//! - [`vcs`]: [`VcsRootSpec`](tcform_core::VcsRootSpec) <-> [`VcsRootEntry`](tcform_core::VcsRootEntry)
//! - [`fingerprint`]: set-membership identity for VCS roots and steps
//!
//! Nothing here performs I/O.

pub mod error;
pub mod fingerprint;
pub mod params;
pub mod steps;
pub mod vcs;

pub use error::CodecError;
pub use fingerprint::{
    dedupe, shadowed, step_fingerprint, vcs_root_fingerprint, Fingerprint, Identity,
};
pub use params::{expand_parameter_collection, expand_parameters, flatten_parameter_collection};
pub use steps::{decode_step, encode_step, expand_step, flatten_record, flatten_step, RunnerKind};
pub use vcs::{expand_vcs_root, flatten_vcs_root};
