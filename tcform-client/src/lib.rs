//! # tcform-client
//!
//! The remote collaborator the reconciler talks to.
//!
//! - [`RemoteClient`]: blocking CRUD surface for projects and build
//!   configurations, plus VCS-root and step sub-resources
//! - [`MemoryClient`]: in-process implementation with failure injection,
//!   used by tests and `--dry-run` rehearsals
//! - [`HttpClient`]: the TeamCity REST API over `ureq`
//!
//! Every call is a single synchronous request/response. Nothing is cached.

pub mod error;
pub mod http;
pub mod memory;
mod wire;

pub use error::ClientError;
pub use http::HttpClient;
pub use memory::{MemoryClient, Operation};

use tcform_core::{
    BuildConfigId, BuildType, NewBuildType, NewProject, Project, ProjectId, StepRecord,
    VcsRootEntry,
};

/// Remote CRUD surface consumed by the reconciler.
pub trait RemoteClient {
    /// Allocate a project from its identity fields; returns it with the
    /// server-assigned ID.
    fn create_project(&self, project: &NewProject) -> Result<Project, ClientError>;

    fn get_project(&self, id: &ProjectId) -> Result<Project, ClientError>;

    /// Persist the mutable fields (description, full parameter set).
    fn update_project(&self, project: &Project) -> Result<Project, ClientError>;

    fn delete_project(&self, id: &ProjectId) -> Result<(), ClientError>;

    /// Allocate a build configuration under `project_id`.
    fn create_build_type(&self, build_type: &NewBuildType) -> Result<BuildType, ClientError>;

    fn get_build_type(&self, id: &BuildConfigId) -> Result<BuildType, ClientError>;

    /// Persist description and the full parameter set. VCS-root entries
    /// and steps are not touched.
    fn update_build_type(&self, build_type: &BuildType) -> Result<BuildType, ClientError>;

    fn delete_build_type(&self, id: &BuildConfigId) -> Result<(), ClientError>;

    fn attach_vcs_root_entry(
        &self,
        id: &BuildConfigId,
        entry: &VcsRootEntry,
    ) -> Result<VcsRootEntry, ClientError>;

    /// Append a step; returns it as stored (with ID).
    fn add_step(&self, id: &BuildConfigId, step: &StepRecord) -> Result<StepRecord, ClientError>;

    fn get_steps(&self, id: &BuildConfigId) -> Result<Vec<StepRecord>, ClientError>;
}
