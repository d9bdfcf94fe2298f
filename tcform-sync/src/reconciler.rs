//! Entity reconciler: create, read, update and delete for projects and
//! build configurations against a [`RemoteClient`].
//!
//! Every operation is a sequence of blocking client calls with no state
//! kept between operations. Errors surface immediately; nothing is retried
//! or rolled back.
//!
//! Creation allocates the entity from its identity fields only, then runs
//! the remaining sub-resource calls in declared order, tracked in a
//! [`CreateReport`]. The first failure aborts the rest and is returned as
//! [`SyncError::PartialCreate`]; the entity stays on the server with exactly
//! the sub-resources that succeeded. A failed read-back after a complete
//! create is reported the same way, with every entry done.

use tracing::{debug, info, warn};

use tcform_client::{ClientError, RemoteClient};
use tcform_codec::{
    dedupe, encode_step, expand_parameter_collection, expand_step, expand_vcs_root,
    flatten_parameter_collection, flatten_record, flatten_vcs_root,
};
use tcform_core::{
    BuildConfigId, BuildConfigSpec, NewBuildType, NewProject, ProjectId, ProjectSpec,
    StepRecord, StepSpec, VcsRootSpec,
};

use crate::diff::shadowed_members;
use crate::error::SyncError;
use crate::report::{CreateReport, SubResource};

/// A project as read back from the server, in declarative shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectState {
    pub id: ProjectId,
    pub spec: ProjectSpec,
}

/// A build configuration as read back from the server, in declarative shape.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfigState {
    pub id: BuildConfigId,
    pub spec: BuildConfigSpec,
}

type PendingCall<'a> = Box<dyn FnOnce() -> Result<(), ClientError> + 'a>;

/// Run planned sub-resource calls in order, stopping at the first failure.
fn run_planned(
    entity: &'static str,
    id: &str,
    calls: Vec<(SubResource, PendingCall<'_>)>,
) -> Result<CreateReport, SyncError> {
    let mut report = CreateReport::new(id);
    let mut pending = Vec::with_capacity(calls.len());
    for (part, call) in calls {
        report.plan(part);
        pending.push(call);
    }

    for (index, call) in pending.into_iter().enumerate() {
        match call() {
            Ok(()) => report.mark_done(index),
            Err(source) => {
                report.mark_failed(index, source.to_string());
                if let Some(entry) = report.entries.get(index) {
                    warn!(%entity, %id, part = %entry.part, error = %source, "create left incomplete");
                }
                return Err(SyncError::PartialCreate {
                    entity,
                    id: id.to_string(),
                    report,
                    source,
                });
            }
        }
    }
    Ok(report)
}

/// Read back a freshly created entity. A remote failure here still leaves
/// the entity on the server, so it is reported with the completed `report`.
fn read_back<T>(
    entity: &'static str,
    report: CreateReport,
    read: Result<T, SyncError>,
) -> Result<T, SyncError> {
    match read {
        Err(SyncError::Client(source)) => {
            warn!(%entity, id = %report.id, error = %source, "created but not read back");
            Err(SyncError::PartialCreate {
                entity,
                id: report.id.clone(),
                report,
                source,
            })
        }
        other => other,
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

fn non_empty_vec<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

/// Description to write: an absent or empty declared value leaves the
/// remote one alone.
fn declared_description(description: &Option<String>) -> Option<&str> {
    description.as_deref().filter(|d| !d.is_empty())
}

/// Short human label for a step in reports and logs.
pub(crate) fn step_label(step: &StepSpec) -> String {
    let present = |s: &&str| !s.is_empty();
    let what = step
        .name
        .as_deref()
        .filter(present)
        .or(step.file.as_deref().filter(present))
        .unwrap_or("inline");
    format!("{} {what}", step.step_type)
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

pub fn create_project<C: RemoteClient + ?Sized>(
    client: &C,
    spec: &ProjectSpec,
) -> Result<ProjectState, SyncError> {
    let parameters = expand_parameter_collection(&spec.params)?;

    let mut project = client.create_project(&NewProject {
        name: spec.name.clone(),
    })?;
    info!(id = %project.id, name = %spec.name, "project created");

    if let Some(description) = declared_description(&spec.description) {
        project.description = description.to_string();
    }
    project.parameters = parameters;

    let id = project.id.clone();
    let settings: PendingCall<'_> = Box::new(move || client.update_project(&project).map(drop));
    let report = run_planned("project", &id.0, vec![(SubResource::Settings, settings)])?;

    read_back("project", report, read_project(client, &id))
}

pub fn read_project<C: RemoteClient + ?Sized>(
    client: &C,
    id: &ProjectId,
) -> Result<ProjectState, SyncError> {
    let project = client.get_project(id)?;
    debug!(%id, params = project.parameters.len(), "project read");
    Ok(ProjectState {
        id: project.id,
        spec: ProjectSpec {
            name: project.name,
            description: non_empty(project.description),
            params: flatten_parameter_collection(&project.parameters),
        },
    })
}

/// Overlay description and the full parameter set onto the remote project.
///
/// The name is immutable here; renaming is a replacement.
pub fn update_project<C: RemoteClient + ?Sized>(
    client: &C,
    id: &ProjectId,
    spec: &ProjectSpec,
) -> Result<ProjectState, SyncError> {
    let parameters = expand_parameter_collection(&spec.params)?;
    let mut project = client.get_project(id)?;
    if let Some(description) = declared_description(&spec.description) {
        project.description = description.to_string();
    }
    project.parameters = parameters;
    client.update_project(&project)?;
    info!(%id, "project updated");
    read_project(client, id)
}

/// No existence check is made; a missing project is whatever the client
/// reports.
pub fn delete_project<C: RemoteClient + ?Sized>(
    client: &C,
    id: &ProjectId,
) -> Result<(), SyncError> {
    client.delete_project(id)?;
    info!(%id, "project deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Build configurations
// ---------------------------------------------------------------------------

/// Create a build configuration, then its settings, VCS roots and steps.
///
/// Everything declared is expanded before the first remote call, so a
/// validation error never leaves a half-built entity behind.
pub fn create_build_config<C: RemoteClient + ?Sized>(
    client: &C,
    spec: &BuildConfigSpec,
) -> Result<BuildConfigState, SyncError> {
    for part in shadowed_members(spec) {
        warn!(name = %spec.name, %part, "declared twice; only the last occurrence is kept");
    }
    let parameters = expand_parameter_collection(&spec.params)?;
    let roots: Vec<VcsRootSpec> = dedupe(spec.vcs_root.as_deref().unwrap_or_default());
    let steps: Vec<StepSpec> = dedupe(spec.step.as_deref().unwrap_or_default());
    let records = steps
        .iter()
        .map(|s| expand_step(s).map(|step| encode_step(&step)))
        .collect::<Result<Vec<StepRecord>, _>>()?;
    let entries: Vec<_> = roots.iter().map(expand_vcs_root).collect();

    let mut build_type = client.create_build_type(&NewBuildType {
        project_id: ProjectId::from(spec.project_id.as_str()),
        name: spec.name.clone(),
    })?;
    info!(id = %build_type.id, name = %spec.name, "build configuration created");

    if let Some(description) = declared_description(&spec.description) {
        build_type.description = description.to_string();
    }
    build_type.parameters = parameters;
    let owned_id = build_type.id.clone();
    let id = &owned_id;

    let settings: PendingCall<'_> =
        Box::new(move || client.update_build_type(&build_type).map(drop));
    let mut calls = vec![(SubResource::Settings, settings)];
    for entry in &entries {
        let attach: PendingCall<'_> =
            Box::new(move || client.attach_vcs_root_entry(id, entry).map(drop));
        let part = SubResource::VcsRoot {
            id: entry.root_id.0.clone(),
        };
        calls.push((part, attach));
    }
    for (index, (step, record)) in steps.iter().zip(&records).enumerate() {
        let add: PendingCall<'_> = Box::new(move || client.add_step(id, record).map(drop));
        let part = SubResource::Step {
            index,
            label: step_label(step),
        };
        calls.push((part, add));
    }
    let report = run_planned("build configuration", &id.0, calls)?;

    read_back("build configuration", report, read_build_config(client, id))
}

/// Read a build configuration with its VCS roots and steps.
///
/// A step whose runner type has no codec variant fails the read with
/// `UnsupportedStepType` instead of being dropped.
pub fn read_build_config<C: RemoteClient + ?Sized>(
    client: &C,
    id: &BuildConfigId,
) -> Result<BuildConfigState, SyncError> {
    let build_type = client.get_build_type(id)?;
    let records = client.get_steps(id)?;
    let steps = records
        .iter()
        .map(flatten_record)
        .collect::<Result<Vec<_>, _>>()?;
    let roots: Vec<VcsRootSpec> = build_type
        .vcs_root_entries
        .iter()
        .map(flatten_vcs_root)
        .collect();
    debug!(%id, steps = steps.len(), "build configuration read");

    Ok(BuildConfigState {
        id: build_type.id,
        spec: BuildConfigSpec {
            name: build_type.name,
            project_id: build_type.project_id.0,
            description: non_empty(build_type.description),
            params: flatten_parameter_collection(&build_type.parameters),
            vcs_root: non_empty_vec(roots),
            step: non_empty_vec(steps),
        },
    })
}

/// Deliberately does nothing: changes to an existing build configuration
/// are applied by replacement (delete, then create).
pub fn update_build_config<C: RemoteClient + ?Sized>(
    _client: &C,
    id: &BuildConfigId,
    _spec: &BuildConfigSpec,
) -> Result<(), SyncError> {
    debug!(%id, "build configuration update is a no-op");
    Ok(())
}

pub fn delete_build_config<C: RemoteClient + ?Sized>(
    client: &C,
    id: &BuildConfigId,
) -> Result<(), SyncError> {
    client.delete_build_type(id)?;
    info!(%id, "build configuration deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_label_prefers_name_then_file() {
        let mut step = StepSpec {
            step_type: "cmd_line".into(),
            file: Some("build.sh".into()),
            ..Default::default()
        };
        assert_eq!(step_label(&step), "cmd_line build.sh");
        step.name = Some("Compile".into());
        assert_eq!(step_label(&step), "cmd_line Compile");
        step.name = None;
        step.file = None;
        assert_eq!(step_label(&step), "cmd_line inline");
    }

    #[test]
    fn blank_description_is_not_written() {
        assert_eq!(declared_description(&Some(String::new())), None);
        assert_eq!(declared_description(&None), None);
        assert_eq!(declared_description(&Some("x".into())), Some("x"));
    }
}
