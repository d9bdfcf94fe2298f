//! tcform core library: domain types, manifest and config loading, errors.
//!
//! - [`types`]: newtypes, the remote entity model and the declarative specs
//! - [`manifest`]: the user-authored YAML document listing desired resources
//! - [`config`]: server connection settings under `~/.tcform/`
//! - [`error`]: [`ManifestError`]

pub mod config;
pub mod error;
pub mod manifest;
pub mod types;

pub use config::ServerConfig;
pub use error::ManifestError;
pub use manifest::{Manifest, ResourceKey};
pub use types::{
    BuildConfigId, BuildConfigSpec, BuildStep, BuildType, CommandLine, NewBuildType, NewProject,
    ParamMap, Parameter, ParameterCollection, ParameterKind, ParameterMaps, Powershell, Project,
    ProjectId, ProjectSpec, StepBody, StepEngine, StepRecord, StepSpec, VcsRootEntry, VcsRootId,
    VcsRootSpec,
};
