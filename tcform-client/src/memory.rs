//! In-memory [`RemoteClient`] for tests and rehearsals.
//!
//! Behaves like the server where it matters to the reconciler: IDs are
//! assigned on create, unknown IDs are [`ClientError::NotFound`], deleting a
//! project removes its build configurations, and steps keep insertion order.
//!
//! ## Limitations
//!
//! - Single process, no persistence
//! - Step names are stored as given; nothing is auto-assigned
//! - VCS root IDs are not checked against any registry

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use tcform_core::{
    BuildConfigId, BuildType, NewBuildType, NewProject, ParameterCollection, Project, ProjectId,
    StepRecord, VcsRootEntry,
};

use crate::error::ClientError;
use crate::RemoteClient;

/// One method of [`RemoteClient`], used to inject failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateProject,
    GetProject,
    UpdateProject,
    DeleteProject,
    CreateBuildType,
    GetBuildType,
    UpdateBuildType,
    DeleteBuildType,
    AttachVcsRootEntry,
    AddStep,
    GetSteps,
}

impl Operation {
    /// Whether the operation changes remote state.
    pub fn is_write(self) -> bool {
        !matches!(
            self,
            Operation::GetProject | Operation::GetBuildType | Operation::GetSteps
        )
    }
}

#[derive(Debug)]
struct PlannedFailure {
    operation: Operation,
    remaining: usize,
}

#[derive(Debug, Default)]
struct State {
    projects: BTreeMap<ProjectId, Project>,
    build_types: BTreeMap<BuildConfigId, BuildType>,
    steps: BTreeMap<BuildConfigId, Vec<StepRecord>>,
    next_step: u64,
    failures: Vec<PlannedFailure>,
    calls: Vec<Operation>,
}

impl State {
    /// Log the call and fire any failure planned for it.
    fn enter(&mut self, operation: Operation) -> Result<(), ClientError> {
        self.calls.push(operation);
        let mut fired = false;
        self.failures.retain_mut(|f| {
            if f.operation != operation || fired {
                return true;
            }
            f.remaining -= 1;
            if f.remaining == 0 {
                fired = true;
                return false;
            }
            true
        });
        if fired {
            debug!(?operation, "injected failure");
            return Err(ClientError::CallFailed(format!(
                "injected failure on {operation:?}"
            )));
        }
        Ok(())
    }

    fn build_type_mut(&mut self, id: &BuildConfigId) -> Result<&mut BuildType, ClientError> {
        self.build_types
            .get_mut(id)
            .ok_or_else(|| ClientError::not_found("build configuration", id.0.as_str()))
    }
}

/// Thread-safe in-memory server.
#[derive(Debug, Default)]
pub struct MemoryClient {
    state: RwLock<State>,
}

fn poison_err<T>(_: PoisonError<T>) -> ClientError {
    ClientError::CallFailed("memory client lock poisoned".into())
}

/// Server-style ID fragment: ASCII alphanumerics kept, runs of anything
/// else collapsed to `_`.
fn id_fragment(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "Id".to_string()
    } else {
        trimmed.to_string()
    }
}

/// First of `base`, `base2`, `base3`, ... that `taken` rejects.
fn unique_id(base: String, taken: impl Fn(&str) -> bool) -> String {
    if !taken(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `nth` (1-based) upcoming call of `operation` fail with
    /// [`ClientError::CallFailed`]. Other calls are unaffected.
    pub fn fail_on(&self, operation: Operation, nth: usize) -> Result<(), ClientError> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.failures.push(PlannedFailure {
            operation,
            remaining: nth.max(1),
        });
        Ok(())
    }

    /// Number of calls made to `operation` so far, failed ones included.
    pub fn call_count(&self, operation: Operation) -> Result<usize, ClientError> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.calls.iter().filter(|op| **op == operation).count())
    }

    /// Number of state-changing calls made so far.
    pub fn write_count(&self) -> Result<usize, ClientError> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.calls.iter().filter(|op| op.is_write()).count())
    }

    pub fn project_count(&self) -> Result<usize, ClientError> {
        Ok(self.state.read().map_err(poison_err)?.projects.len())
    }

    pub fn build_type_count(&self) -> Result<usize, ClientError> {
        Ok(self.state.read().map_err(poison_err)?.build_types.len())
    }
}

impl RemoteClient for MemoryClient {
    fn create_project(&self, project: &NewProject) -> Result<Project, ClientError> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.enter(Operation::CreateProject)?;
        let id = unique_id(id_fragment(&project.name), |c| {
            state.projects.contains_key(&ProjectId::from(c))
        });
        let created = Project {
            id: ProjectId(id),
            name: project.name.clone(),
            description: String::new(),
            parameters: ParameterCollection::new(),
        };
        debug!(id = %created.id, "memory: project created");
        state.projects.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    fn get_project(&self, id: &ProjectId) -> Result<Project, ClientError> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.enter(Operation::GetProject)?;
        state
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::not_found("project", id.0.as_str()))
    }

    fn update_project(&self, project: &Project) -> Result<Project, ClientError> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.enter(Operation::UpdateProject)?;
        let stored = state
            .projects
            .get_mut(&project.id)
            .ok_or_else(|| ClientError::not_found("project", project.id.0.as_str()))?;
        stored.description = project.description.clone();
        stored.parameters = project.parameters.clone();
        Ok(stored.clone())
    }

    fn delete_project(&self, id: &ProjectId) -> Result<(), ClientError> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.enter(Operation::DeleteProject)?;
        if state.projects.remove(id).is_none() {
            return Err(ClientError::not_found("project", id.0.as_str()));
        }
        let owned: Vec<BuildConfigId> = state
            .build_types
            .values()
            .filter(|bt| &bt.project_id == id)
            .map(|bt| bt.id.clone())
            .collect();
        for bt in owned {
            state.build_types.remove(&bt);
            state.steps.remove(&bt);
        }
        Ok(())
    }

    fn create_build_type(&self, build_type: &NewBuildType) -> Result<BuildType, ClientError> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.enter(Operation::CreateBuildType)?;
        if !state.projects.contains_key(&build_type.project_id) {
            return Err(ClientError::not_found(
                "project",
                build_type.project_id.0.as_str(),
            ));
        }
        let base = format!(
            "{}_{}",
            build_type.project_id,
            id_fragment(&build_type.name)
        );
        let id = unique_id(base, |c| {
            state.build_types.contains_key(&BuildConfigId::from(c))
        });
        let created = BuildType {
            id: BuildConfigId(id),
            project_id: build_type.project_id.clone(),
            name: build_type.name.clone(),
            description: String::new(),
            parameters: ParameterCollection::new(),
            vcs_root_entries: Vec::new(),
        };
        debug!(id = %created.id, "memory: build configuration created");
        state.build_types.insert(created.id.clone(), created.clone());
        state.steps.insert(created.id.clone(), Vec::new());
        Ok(created)
    }

    fn get_build_type(&self, id: &BuildConfigId) -> Result<BuildType, ClientError> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.enter(Operation::GetBuildType)?;
        state.build_type_mut(id).map(|bt| bt.clone())
    }

    fn update_build_type(&self, build_type: &BuildType) -> Result<BuildType, ClientError> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.enter(Operation::UpdateBuildType)?;
        let stored = state.build_type_mut(&build_type.id)?;
        stored.description = build_type.description.clone();
        stored.parameters = build_type.parameters.clone();
        Ok(stored.clone())
    }

    fn delete_build_type(&self, id: &BuildConfigId) -> Result<(), ClientError> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.enter(Operation::DeleteBuildType)?;
        state.steps.remove(id);
        state
            .build_types
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ClientError::not_found("build configuration", id.0.as_str()))
    }

    fn attach_vcs_root_entry(
        &self,
        id: &BuildConfigId,
        entry: &VcsRootEntry,
    ) -> Result<VcsRootEntry, ClientError> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.enter(Operation::AttachVcsRootEntry)?;
        let stored = state.build_type_mut(id)?;
        if stored.vcs_root_entries.iter().any(|e| e.root_id == entry.root_id) {
            return Err(ClientError::CallFailed(format!(
                "VCS root '{}' is already attached to '{id}'",
                entry.root_id
            )));
        }
        stored.vcs_root_entries.push(entry.clone());
        Ok(entry.clone())
    }

    fn add_step(&self, id: &BuildConfigId, step: &StepRecord) -> Result<StepRecord, ClientError> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.enter(Operation::AddStep)?;
        state.build_type_mut(id)?;
        state.next_step += 1;
        let stored = StepRecord {
            id: Some(format!("RUNNER_{}", state.next_step)),
            ..step.clone()
        };
        state
            .steps
            .entry(id.clone())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    fn get_steps(&self, id: &BuildConfigId) -> Result<Vec<StepRecord>, ClientError> {
        let mut state = self.state.write().map_err(poison_err)?;
        state.enter(Operation::GetSteps)?;
        state.build_type_mut(id)?;
        Ok(state.steps.get(id).cloned().unwrap_or_default())
    }
}
