//! Declared-versus-remote comparison.
//!
//! Declared specs are first normalized to what a read-back after create
//! would return (parameters, steps and VCS roots pushed through their
//! codecs, duplicates collapsed, empty collections absent). Remote and
//! normalized declared state are then compared field by field, with
//! set-valued fields matched by identity fingerprint.

use std::collections::{BTreeSet, HashMap};

use similar::TextDiff;

use tcform_codec::{
    dedupe, expand_parameter_collection, expand_step, expand_vcs_root,
    flatten_parameter_collection, flatten_step, flatten_vcs_root, shadowed, Fingerprint,
    Identity,
};
use tcform_core::{
    BuildConfigSpec, ParamMap, ParameterKind, ParameterMaps, ProjectSpec, StepSpec, VcsRootSpec,
};

use crate::error::SyncError;
use crate::reconciler::step_label;
use crate::report::SubResource;

// ---------------------------------------------------------------------------
// Set diff
// ---------------------------------------------------------------------------

/// Partition of two member sets by identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    /// Declared only, in declared order.
    pub added: Vec<T>,
    /// Remote only, in remote order.
    pub removed: Vec<T>,
    /// Same identity, different payload: `(remote, declared)`.
    pub changed: Vec<(T, T)>,
    pub unchanged: Vec<T>,
}

impl<T> SetDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// `+added -removed ~changed`
    pub fn summary(&self) -> String {
        format!(
            "+{} -{} ~{}",
            self.added.len(),
            self.removed.len(),
            self.changed.len()
        )
    }
}

/// Match declared and remote members by fingerprint. Order is ignored;
/// duplicates on either side collapse first.
pub fn diff_members<T>(declared: &[T], remote: &[T]) -> SetDiff<T>
where
    T: Identity + Clone + PartialEq,
{
    let declared = dedupe(declared);
    let remote = dedupe(remote);
    let by_print: HashMap<Fingerprint, &T> =
        remote.iter().map(|m| (m.fingerprint(), m)).collect();

    let mut diff = SetDiff {
        added: Vec::new(),
        removed: Vec::new(),
        changed: Vec::new(),
        unchanged: Vec::new(),
    };
    let mut matched = BTreeSet::new();
    for member in declared {
        let print = member.fingerprint();
        match by_print.get(&print) {
            None => diff.added.push(member),
            Some(existing) => {
                matched.insert(print);
                if **existing == member {
                    diff.unchanged.push(member);
                } else {
                    diff.changed.push(((*existing).clone(), member));
                }
            }
        }
    }
    diff.removed = remote
        .into_iter()
        .filter(|m| !matched.contains(&m.fingerprint()))
        .collect();
    diff
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

/// Declared project as the server would report it after create.
pub fn normalize_project(spec: &ProjectSpec) -> Result<ProjectSpec, SyncError> {
    Ok(ProjectSpec {
        name: spec.name.clone(),
        description: blank_to_none(&spec.description),
        params: flatten_parameter_collection(&expand_parameter_collection(&spec.params)?),
    })
}

/// Declared build configuration as the server would report it after create.
pub fn normalize_build_config(spec: &BuildConfigSpec) -> Result<BuildConfigSpec, SyncError> {
    let roots: Vec<VcsRootSpec> = dedupe(spec.vcs_root.as_deref().unwrap_or_default())
        .iter()
        .map(|r| flatten_vcs_root(&expand_vcs_root(r)))
        .collect();
    let steps = dedupe(spec.step.as_deref().unwrap_or_default())
        .iter()
        .map(|s| expand_step(s).map(|step| flatten_step(&step)))
        .collect::<Result<Vec<StepSpec>, _>>()?;
    Ok(BuildConfigSpec {
        name: spec.name.clone(),
        project_id: spec.project_id.clone(),
        description: blank_to_none(&spec.description),
        params: flatten_parameter_collection(&expand_parameter_collection(&spec.params)?),
        vcs_root: non_empty(roots),
        step: non_empty(steps),
    })
}

/// Declared VCS roots and steps that a later member with the same identity
/// overrides. They never reach the server.
pub fn shadowed_members(spec: &BuildConfigSpec) -> Vec<SubResource> {
    let roots = spec.vcs_root.as_deref().unwrap_or_default();
    let steps = spec.step.as_deref().unwrap_or_default();
    let mut parts: Vec<SubResource> = shadowed(roots)
        .into_iter()
        .map(|i| SubResource::VcsRoot {
            id: roots[i].id.clone(),
        })
        .collect();
    parts.extend(shadowed(steps).into_iter().map(|index| SubResource::Step {
        index,
        label: step_label(&steps[index]),
    }));
    parts
}

// ---------------------------------------------------------------------------
// Field changes
// ---------------------------------------------------------------------------

/// One differing field between remote and declared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub detail: String,
    /// The change cannot be applied in place.
    pub forces_replacement: bool,
}

impl FieldChange {
    fn in_place(field: &'static str, detail: String) -> Self {
        Self {
            field,
            detail,
            forces_replacement: false,
        }
    }

    fn replacing(field: &'static str, detail: String) -> Self {
        Self {
            field,
            detail,
            forces_replacement: true,
        }
    }
}

fn show(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("<none>")
}

fn change_detail(from: &str, to: &str) -> String {
    format!("'{from}' -> '{to}'")
}

/// Per-kind parameter differences as `+added -removed ~changed`.
fn param_changes(remote: &ParameterMaps, declared: &ParameterMaps) -> Vec<(ParameterKind, String)> {
    let empty = ParamMap::new();
    let mut out = Vec::new();
    for kind in ParameterKind::MERGE_ORDER {
        let old = remote.get(kind).unwrap_or(&empty);
        let new = declared.get(kind).unwrap_or(&empty);
        if old == new {
            continue;
        }
        let added = new.keys().filter(|k| !old.contains_key(*k)).count();
        let removed = old.keys().filter(|k| !new.contains_key(*k)).count();
        let changed = new
            .iter()
            .filter(|(k, v)| old.get(*k).is_some_and(|o| o != *v))
            .count();
        out.push((kind, format!("+{added} -{removed} ~{changed}")));
    }
    out
}

/// Changes needed to bring a remote project to its declared form.
///
/// Both sides must already be normalized. A declared description that is
/// absent leaves the remote one alone, so it is not a change.
pub fn plan_project(remote: &ProjectSpec, declared: &ProjectSpec) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    if remote.name != declared.name {
        changes.push(FieldChange::replacing(
            "name",
            change_detail(&remote.name, &declared.name),
        ));
    }
    if declared.description.is_some() && remote.description != declared.description {
        changes.push(FieldChange::in_place(
            "description",
            change_detail(show(&remote.description), show(&declared.description)),
        ));
    }
    for (kind, detail) in param_changes(&remote.params, &declared.params) {
        changes.push(FieldChange::in_place(kind.field_name(), detail));
    }
    changes
}

/// Changes between a remote build configuration and its declared form.
///
/// Build configuration update is a no-op, so every change forces
/// replacement.
pub fn plan_build_config(remote: &BuildConfigSpec, declared: &BuildConfigSpec) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    if remote.name != declared.name {
        changes.push(FieldChange::replacing(
            "name",
            change_detail(&remote.name, &declared.name),
        ));
    }
    if remote.project_id != declared.project_id {
        changes.push(FieldChange::replacing(
            "project_id",
            change_detail(&remote.project_id, &declared.project_id),
        ));
    }
    if declared.description.is_some() && remote.description != declared.description {
        changes.push(FieldChange::replacing(
            "description",
            change_detail(show(&remote.description), show(&declared.description)),
        ));
    }
    for (kind, detail) in param_changes(&remote.params, &declared.params) {
        changes.push(FieldChange::replacing(kind.field_name(), detail));
    }

    let roots = diff_members(
        declared.vcs_root.as_deref().unwrap_or_default(),
        remote.vcs_root.as_deref().unwrap_or_default(),
    );
    if !roots.is_empty() {
        changes.push(FieldChange::replacing("vcs_root", roots.summary()));
    }
    let steps = diff_members(
        declared.step.as_deref().unwrap_or_default(),
        remote.step.as_deref().unwrap_or_default(),
    );
    if !steps.is_empty() {
        changes.push(FieldChange::replacing("step", steps.summary()));
    }
    changes
}

// ---------------------------------------------------------------------------
// Drift rendering
// ---------------------------------------------------------------------------

/// Unified diff of remote versus declared YAML for `key`.
///
/// Returns an empty string when both render identically.
pub fn render_drift<T: serde::Serialize>(
    key: &str,
    remote: &T,
    declared: &T,
) -> Result<String, SyncError> {
    let old = serde_yaml::to_string(remote)?;
    let new = serde_yaml::to_string(declared)?;
    if old == new {
        return Ok(String::new());
    }
    let old_header = format!("remote/{key}");
    let new_header = format!("declared/{key}");
    Ok(TextDiff::from_lines(&old, &new)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn root(id: &str, rules: &[&str]) -> VcsRootSpec {
        VcsRootSpec {
            id: id.into(),
            checkout_rules: rules.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn file_step(file: &str) -> StepSpec {
        StepSpec {
            step_type: "cmd_line".into(),
            file: Some(file.into()),
            ..Default::default()
        }
    }

    #[test]
    fn members_partition_by_identity() {
        let remote = [root("a", &[]), root("b", &["+:x"]), root("c", &[])];
        let declared = [root("b", &["+:y"]), root("c", &[]), root("d", &[])];
        let diff = diff_members(&declared, &remote);

        assert_eq!(diff.added, [root("d", &[])]);
        assert_eq!(diff.removed, [root("a", &[])]);
        assert_eq!(diff.changed, [(root("b", &["+:x"]), root("b", &["+:y"]))]);
        assert_eq!(diff.unchanged, [root("c", &[])]);
        assert_eq!(diff.summary(), "+1 -1 ~1");
    }

    #[test]
    fn member_order_is_ignored() {
        let a = [file_step("one.sh"), file_step("two.sh")];
        let b = [file_step("two.sh"), file_step("one.sh")];
        assert!(diff_members(&a, &b).is_empty());
    }

    #[test]
    fn inline_code_edit_is_a_changed_member() {
        let mut old = StepSpec {
            step_type: "powershell".into(),
            code: Some("Write-Host a".into()),
            ..Default::default()
        };
        let remote = [old.clone()];
        old.code = Some("Write-Host b".into());
        let diff = diff_members(&[old], &remote);
        assert_eq!(diff.changed.len(), 1);
        assert!(diff.added.is_empty() && diff.removed.is_empty());
    }

    #[test]
    fn normalization_drops_code_from_file_steps_and_empty_sets() {
        let spec = BuildConfigSpec {
            name: "Build".into(),
            project_id: "App".into(),
            description: Some(String::new()),
            step: Some(vec![StepSpec {
                code: Some("ignored".into()),
                ..file_step("run.sh")
            }]),
            vcs_root: Some(Vec::new()),
            ..Default::default()
        };
        let normalized = normalize_build_config(&spec).unwrap();
        assert_eq!(normalized.description, None);
        assert_eq!(normalized.vcs_root, None);
        assert_eq!(normalized.step, Some(vec![file_step("run.sh")]));
    }

    #[test]
    fn project_name_change_forces_replacement_but_params_do_not() {
        let remote = ProjectSpec {
            name: "Old".into(),
            ..Default::default()
        };
        let mut env = ParamMap::new();
        env.insert("A".into(), Value::from("1"));
        let declared = ProjectSpec {
            name: "New".into(),
            params: ParameterMaps {
                env_params: Some(env),
                ..Default::default()
            },
            ..Default::default()
        };
        let changes = plan_project(&remote, &declared);
        assert_eq!(changes.len(), 2);
        assert!(changes[0].forces_replacement);
        assert_eq!(changes[1].field, "env_params");
        assert_eq!(changes[1].detail, "+1 -0 ~0");
        assert!(!changes[1].forces_replacement);
    }

    #[test]
    fn absent_declared_description_is_not_a_change() {
        let remote = ProjectSpec {
            name: "P".into(),
            description: Some("set by hand".into()),
            ..Default::default()
        };
        let declared = ProjectSpec {
            name: "P".into(),
            ..Default::default()
        };
        assert!(plan_project(&remote, &declared).is_empty());
    }

    #[test]
    fn any_build_config_change_forces_replacement() {
        let remote = BuildConfigSpec {
            name: "Build".into(),
            project_id: "App".into(),
            vcs_root: Some(vec![root("r", &["+:a"])]),
            ..Default::default()
        };
        let mut declared = remote.clone();
        declared.vcs_root = Some(vec![root("r", &["+:b"])]);
        let changes = plan_build_config(&remote, &declared);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "vcs_root");
        assert!(changes[0].forces_replacement);
    }

    #[test]
    fn drift_is_empty_when_identical_and_unified_otherwise() {
        let a = ProjectSpec {
            name: "P".into(),
            ..Default::default()
        };
        assert_eq!(render_drift("app", &a, &a).unwrap(), "");
        let b = ProjectSpec {
            description: Some("d".into()),
            ..a.clone()
        };
        let drift = render_drift("app", &a, &b).unwrap();
        assert!(drift.contains("--- remote/app"));
        assert!(drift.contains("+++ declared/app"));
        assert!(drift.contains("+description: d"));
    }

    #[test]
    fn shadowed_members_name_the_dropped_entries() {
        let inline = |code: &str| StepSpec {
            step_type: "cmd_line".into(),
            code: Some(code.into()),
            ..Default::default()
        };
        let spec = BuildConfigSpec {
            name: "Build".into(),
            project_id: "App".into(),
            vcs_root: Some(vec![root("Repo", &["+:a"]), root("Repo", &["+:b"])]),
            step: Some(vec![inline("make"), file_step("build.sh"), inline("make test")]),
            ..Default::default()
        };
        let parts = shadowed_members(&spec);
        assert_eq!(
            parts,
            vec![
                SubResource::VcsRoot { id: "Repo".into() },
                SubResource::Step {
                    index: 0,
                    label: "cmd_line inline".into()
                },
            ]
        );
        assert_eq!(parts[1].to_string(), "step #1 (cmd_line inline)");
    }
}
