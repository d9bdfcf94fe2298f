//! Manifest apply pipeline used by `plan`, `apply` and `destroy`.
//!
//! ## Apply, per run
//!
//! 1. Validate the manifest and normalize every declared resource.
//! 2. Plan projects, then build configurations, then deletions of recorded
//!    resources the manifest no longer declares (build configurations first).
//! 3. Unless `dry_run`, execute the plan in that order, recording each
//!    result in the workspace state as it lands.
//! 4. Save the state, including on failure, so created IDs are never lost.
//!
//! A build configuration whose `project_id` names a project key from the
//! same manifest is pointed at that project's recorded server ID.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};

use tcform_client::RemoteClient;
use tcform_core::{BuildConfigId, BuildConfigSpec, Manifest, ProjectId, ProjectSpec, ResourceKey};

use crate::diff::{
    normalize_build_config, normalize_project, plan_build_config, plan_project, render_drift,
    FieldChange,
};
use crate::error::SyncError;
use crate::reconciler;
use crate::state::{self, spec_digest, ResourceKind, ResourceState, StateFile};

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// What apply will do to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    /// Change mutable fields in place.
    Update,
    /// Delete, then create.
    Replace,
    Delete,
    NoOp,
}

impl Action {
    pub fn verb(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Replace => "replace",
            Action::Delete => "delete",
            Action::NoOp => "no change",
        }
    }

    fn from_changes(changes: &[FieldChange]) -> Self {
        if changes.is_empty() {
            Action::NoOp
        } else if changes.iter().any(|c| c.forces_replacement) {
            Action::Replace
        } else {
            Action::Update
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePlan {
    pub key: ResourceKey,
    pub kind: ResourceKind,
    /// Recorded server ID, if any.
    pub id: Option<String>,
    pub action: Action,
    /// Why a create or replace is planned when no field change explains it.
    pub reason: Option<String>,
    pub changes: Vec<FieldChange>,
    /// Unified remote-versus-declared diff; empty when there is nothing to show.
    pub drift: String,
}

impl ResourcePlan {
    fn new(key: &ResourceKey, kind: ResourceKind, id: Option<String>, action: Action) -> Self {
        Self {
            key: key.clone(),
            kind,
            id,
            action,
            reason: None,
            changes: Vec::new(),
            drift: String::new(),
        }
    }

    fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn is_noop(&self) -> bool {
        self.action == Action::NoOp
    }
}

/// The recorded ID for `key`, if it was recorded as `kind`.
fn recorded_id(state: &StateFile, key: &ResourceKey, kind: ResourceKind) -> Option<String> {
    state
        .get(key)
        .filter(|r| r.kind == kind)
        .map(|r| r.id.clone())
}

/// Server project ID a build configuration should live under.
///
/// `None` when it names a manifest project that has no usable ID yet.
fn resolve_project_id(
    spec: &BuildConfigSpec,
    manifest: &Manifest,
    state: &StateFile,
    pending: &HashSet<ResourceKey>,
) -> Option<String> {
    let key = ResourceKey::from(spec.project_id.as_str());
    if !manifest.projects.contains_key(&key) {
        return Some(spec.project_id.clone());
    }
    if pending.contains(&key) {
        return None;
    }
    recorded_id(state, &key, ResourceKind::Project)
}

fn plan_one_project<C: RemoteClient + ?Sized>(
    client: &C,
    key: &ResourceKey,
    spec: &ProjectSpec,
    state: &StateFile,
) -> Result<ResourcePlan, SyncError> {
    let declared = normalize_project(spec)?;
    let Some(id) = recorded_id(state, key, ResourceKind::Project) else {
        return Ok(ResourcePlan::new(key, ResourceKind::Project, None, Action::Create)
            .because("not yet created"));
    };
    let remote = match reconciler::read_project(client, &ProjectId::from(id.as_str())) {
        Ok(remote) => remote,
        Err(err) if err.is_not_found() => {
            return Ok(
                ResourcePlan::new(key, ResourceKind::Project, Some(id), Action::Create)
                    .because("missing on server"),
            );
        }
        Err(err) => return Err(err),
    };

    let changes = plan_project(&remote.spec, &declared);
    let mut shown = declared;
    if shown.description.is_none() {
        shown.description = remote.spec.description.clone();
    }
    let mut plan = ResourcePlan::new(
        key,
        ResourceKind::Project,
        Some(id),
        Action::from_changes(&changes),
    );
    plan.drift = render_drift(&key.0, &remote.spec, &shown)?;
    plan.changes = changes;
    Ok(plan)
}

fn plan_one_build_config<C: RemoteClient + ?Sized>(
    client: &C,
    key: &ResourceKey,
    spec: &BuildConfigSpec,
    parent: Option<String>,
    state: &StateFile,
) -> Result<ResourcePlan, SyncError> {
    let mut declared = normalize_build_config(spec)?;
    let recorded = recorded_id(state, key, ResourceKind::BuildConfiguration);
    let Some(parent) = parent else {
        let action = if recorded.is_some() {
            Action::Replace
        } else {
            Action::Create
        };
        return Ok(
            ResourcePlan::new(key, ResourceKind::BuildConfiguration, recorded, action)
                .because(format!("project '{}' is being (re)created", spec.project_id)),
        );
    };
    declared.project_id = parent;

    let Some(id) = recorded else {
        return Ok(
            ResourcePlan::new(key, ResourceKind::BuildConfiguration, None, Action::Create)
                .because("not yet created"),
        );
    };
    let remote = match reconciler::read_build_config(client, &BuildConfigId::from(id.as_str())) {
        Ok(remote) => remote,
        Err(err) if err.is_not_found() => {
            return Ok(ResourcePlan::new(
                key,
                ResourceKind::BuildConfiguration,
                Some(id),
                Action::Create,
            )
            .because("missing on server"));
        }
        Err(err) => return Err(err),
    };

    let changes = plan_build_config(&remote.spec, &declared);
    let mut shown = declared;
    if shown.description.is_none() {
        shown.description = remote.spec.description.clone();
    }
    let mut plan = ResourcePlan::new(
        key,
        ResourceKind::BuildConfiguration,
        Some(id),
        Action::from_changes(&changes),
    );
    plan.drift = render_drift(&key.0, &remote.spec, &shown)?;
    plan.changes = changes;
    Ok(plan)
}

/// Compute the plan for `manifest` against `state`. Makes read calls only.
pub fn plan<C: RemoteClient + ?Sized>(
    client: &C,
    manifest: &Manifest,
    state: &StateFile,
) -> Result<Vec<ResourcePlan>, SyncError> {
    manifest.validate()?;
    let mut plans = Vec::new();

    // Projects whose server ID will change during this run.
    let mut pending: HashSet<ResourceKey> = HashSet::new();
    for (key, spec) in &manifest.projects {
        let plan =
            plan_one_project(client, key, spec, state).map_err(|e| e.for_resource(&key.0))?;
        if matches!(plan.action, Action::Create | Action::Replace) {
            pending.insert(key.clone());
        }
        plans.push(plan);
    }

    for (key, spec) in &manifest.build_configurations {
        let parent = resolve_project_id(spec, manifest, state, &pending);
        let plan = plan_one_build_config(client, key, spec, parent, state)
            .map_err(|e| e.for_resource(&key.0))?;
        plans.push(plan);
    }

    for kind in [ResourceKind::BuildConfiguration, ResourceKind::Project] {
        for key in state.keys_of(kind) {
            let declared = match kind {
                ResourceKind::Project => manifest.projects.contains_key(key),
                ResourceKind::BuildConfiguration => {
                    manifest.build_configurations.contains_key(key)
                }
            };
            if !declared {
                plans.push(
                    ResourcePlan::new(key, kind, recorded_id(state, key, kind), Action::Delete)
                        .because("no longer declared"),
                );
            }
        }
    }
    Ok(plans)
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created { id: String },
    Updated { id: String },
    Replaced { old: String, new: String },
    Deleted { id: String },
    Unchanged { id: String },
    /// `--dry-run`: the action that would have run.
    Would(Action),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResult {
    pub key: ResourceKey,
    pub kind: ResourceKind,
    pub outcome: ApplyOutcome,
}

/// Outcome of an apply or destroy run.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub workspace: String,
    pub plans: Vec<ResourcePlan>,
    pub results: Vec<ResourceResult>,
}

impl ApplyReport {
    pub fn changed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| {
                !matches!(
                    r.outcome,
                    ApplyOutcome::Unchanged { .. } | ApplyOutcome::Would(Action::NoOp)
                )
            })
            .count()
    }
}

/// Delete by kind. A resource already gone counts as deleted.
fn delete_recorded<C: RemoteClient + ?Sized>(
    client: &C,
    kind: ResourceKind,
    id: &str,
) -> Result<(), SyncError> {
    let result = match kind {
        ResourceKind::Project => reconciler::delete_project(client, &ProjectId::from(id)),
        ResourceKind::BuildConfiguration => {
            reconciler::delete_build_config(client, &BuildConfigId::from(id))
        }
    };
    match result {
        Err(err) if err.is_not_found() => {
            warn!(%kind, %id, "already absent on server");
            Ok(())
        }
        other => other,
    }
}

/// Create and record a project; returns the new ID.
fn create_project<C: RemoteClient + ?Sized>(
    client: &C,
    key: &ResourceKey,
    spec: &ProjectSpec,
    state: &mut StateFile,
) -> Result<String, SyncError> {
    let created = reconciler::create_project(client, spec).map_err(|err| {
        record_partial(state, key, ResourceKind::Project, &err);
        err
    })?;
    let id = created.id.0.clone();
    state.resources.insert(
        key.clone(),
        ResourceState::for_project(&created, spec_digest(spec)?),
    );
    Ok(id)
}

fn create_build_config<C: RemoteClient + ?Sized>(
    client: &C,
    key: &ResourceKey,
    spec: &BuildConfigSpec,
    parent: String,
    state: &mut StateFile,
) -> Result<String, SyncError> {
    let resolved = BuildConfigSpec {
        project_id: parent,
        ..spec.clone()
    };
    let created = reconciler::create_build_config(client, &resolved).map_err(|err| {
        record_partial(state, key, ResourceKind::BuildConfiguration, &err);
        err
    })?;
    let id = created.id.0.clone();
    state.resources.insert(
        key.clone(),
        ResourceState::for_build_config(&created, spec_digest(spec)?),
    );
    Ok(id)
}

/// A partially created entity still exists; record it with a blank digest
/// so the next plan inspects it.
fn record_partial(state: &mut StateFile, key: &ResourceKey, kind: ResourceKind, err: &SyncError) {
    if let SyncError::PartialCreate { id, .. } = err {
        state.resources.insert(
            key.clone(),
            ResourceState {
                kind,
                id: id.clone(),
                digest: String::new(),
                vcs_roots: Vec::new(),
                steps: Vec::new(),
                synced_at: Utc::now(),
            },
        );
    }
}

fn execute<C: RemoteClient + ?Sized>(
    client: &C,
    manifest: &Manifest,
    state: &mut StateFile,
    plan: &ResourcePlan,
) -> Result<ApplyOutcome, SyncError> {
    let key = &plan.key;
    let old = plan.id.clone().unwrap_or_default();

    if plan.action == Action::Delete {
        delete_recorded(client, plan.kind, &old)?;
        // The key may have been re-recorded as the other kind this run.
        if state.get(key).is_some_and(|r| r.kind == plan.kind) {
            state.resources.remove(key);
        }
        return Ok(ApplyOutcome::Deleted { id: old });
    }

    match plan.kind {
        ResourceKind::Project => {
            let Some(spec) = manifest.projects.get(key) else {
                return Ok(ApplyOutcome::Unchanged { id: old });
            };
            match plan.action {
                Action::Create => Ok(ApplyOutcome::Created {
                    id: create_project(client, key, spec, state)?,
                }),
                Action::Replace => {
                    delete_recorded(client, plan.kind, &old)?;
                    let new = create_project(client, key, spec, state)?;
                    Ok(ApplyOutcome::Replaced { old, new })
                }
                Action::Update => {
                    let updated =
                        reconciler::update_project(client, &ProjectId::from(old.as_str()), spec)?;
                    state.resources.insert(
                        key.clone(),
                        ResourceState::for_project(&updated, spec_digest(spec)?),
                    );
                    Ok(ApplyOutcome::Updated { id: old })
                }
                Action::NoOp | Action::Delete => {
                    refresh_digest(state, key, spec_digest(spec)?);
                    Ok(ApplyOutcome::Unchanged { id: old })
                }
            }
        }
        ResourceKind::BuildConfiguration => {
            let Some(spec) = manifest.build_configurations.get(key) else {
                return Ok(ApplyOutcome::Unchanged { id: old });
            };
            // Projects have been applied by now, so every manifest project
            // key resolves.
            let parent = resolve_project_id(spec, manifest, state, &HashSet::new())
                .unwrap_or_else(|| spec.project_id.clone());
            match plan.action {
                Action::Create => Ok(ApplyOutcome::Created {
                    id: create_build_config(client, key, spec, parent, state)?,
                }),
                Action::Replace => {
                    delete_recorded(client, plan.kind, &old)?;
                    let new = create_build_config(client, key, spec, parent, state)?;
                    Ok(ApplyOutcome::Replaced { old, new })
                }
                Action::Update => {
                    reconciler::update_build_config(
                        client,
                        &BuildConfigId::from(old.as_str()),
                        spec,
                    )?;
                    refresh_digest(state, key, spec_digest(spec)?);
                    Ok(ApplyOutcome::Updated { id: old })
                }
                Action::NoOp | Action::Delete => {
                    refresh_digest(state, key, spec_digest(spec)?);
                    Ok(ApplyOutcome::Unchanged { id: old })
                }
            }
        }
    }
}

fn refresh_digest(state: &mut StateFile, key: &ResourceKey, digest: String) {
    if let Some(recorded) = state.resources.get_mut(key) {
        recorded.digest = digest;
        recorded.synced_at = Utc::now();
    }
}

fn run_plans<C: RemoteClient + ?Sized>(
    client: &C,
    manifest: &Manifest,
    state: &mut StateFile,
    plans: &[ResourcePlan],
    results: &mut Vec<ResourceResult>,
) -> Result<(), SyncError> {
    for plan in plans {
        debug!(key = %plan.key, action = plan.action.verb(), "executing");
        let outcome =
            execute(client, manifest, state, plan).map_err(|e| e.for_resource(&plan.key.0))?;
        results.push(ResourceResult {
            key: plan.key.clone(),
            kind: plan.kind,
            outcome,
        });
    }
    Ok(())
}

/// Reconcile the server with `manifest` and record the result under `home`.
///
/// With `dry_run`, only read calls are made and nothing is saved.
pub fn apply<C: RemoteClient + ?Sized>(
    client: &C,
    manifest: &Manifest,
    home: &Path,
    dry_run: bool,
) -> Result<ApplyReport, SyncError> {
    let started = Utc::now();
    let mut state = state::load_at(home, &manifest.workspace)?;
    let plans = plan(client, manifest, &state)?;

    let mut results = Vec::new();
    if dry_run {
        for plan in &plans {
            info!(key = %plan.key, "[dry-run] would {}", plan.action.verb());
            results.push(ResourceResult {
                key: plan.key.clone(),
                kind: plan.kind,
                outcome: ApplyOutcome::Would(plan.action),
            });
        }
        return Ok(ApplyReport {
            workspace: manifest.workspace.clone(),
            plans,
            results,
        });
    }

    let outcome = run_plans(client, manifest, &mut state, &plans, &mut results);
    state.synced_at = started;
    state::save_at(home, &manifest.workspace, &state)?;
    outcome?;

    Ok(ApplyReport {
        workspace: manifest.workspace.clone(),
        plans,
        results,
    })
}

/// Delete every resource recorded for `workspace`, build configurations
/// first.
pub fn destroy<C: RemoteClient + ?Sized>(
    client: &C,
    home: &Path,
    workspace: &str,
    dry_run: bool,
) -> Result<ApplyReport, SyncError> {
    let mut state = state::load_at(home, workspace)?;
    let mut plans = Vec::new();
    for kind in [ResourceKind::BuildConfiguration, ResourceKind::Project] {
        for key in state.keys_of(kind) {
            plans.push(
                ResourcePlan::new(key, kind, recorded_id(&state, key, kind), Action::Delete)
                    .because("destroy"),
            );
        }
    }

    let mut results = Vec::new();
    if dry_run {
        results.extend(plans.iter().map(|p| ResourceResult {
            key: p.key.clone(),
            kind: p.kind,
            outcome: ApplyOutcome::Would(Action::Delete),
        }));
    } else {
        let outcome = run_plans(client, &Manifest::default(), &mut state, &plans, &mut results);
        state.synced_at = Utc::now();
        state::save_at(home, workspace, &state)?;
        outcome?;
    }

    Ok(ApplyReport {
        workspace: workspace.to_string(),
        plans,
        results,
    })
}
