//! TeamCity REST JSON shapes and their mapping to the core model.

use serde::{Deserialize, Serialize};

use tcform_core::{
    BuildConfigId, BuildType, Parameter, ParameterCollection, ParameterKind, Project, ProjectId,
    StepRecord, VcsRootEntry, VcsRootId,
};

const ENV_PREFIX: &str = "env.";
const SYSTEM_PREFIX: &str = "system.";

/// Root project every created project is parented to.
pub(crate) const ROOT_PROJECT: &str = "_Root";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Property {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Properties {
    #[serde(default)]
    pub property: Vec<Property>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Locator {
    pub locator: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewProjectBody {
    pub name: String,
    pub parent_project: Locator,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProjectBody {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Properties,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewBuildTypeBody {
    pub name: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BuildTypeBody {
    pub id: String,
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Properties,
    #[serde(default, rename = "vcs-root-entries")]
    pub vcs_root_entries: VcsRootEntries,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct VcsRootEntries {
    #[serde(default, rename = "vcs-root-entry")]
    pub entries: Vec<VcsRootEntryBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct VcsRootRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct VcsRootEntryBody {
    pub id: String,
    #[serde(rename = "vcs-root")]
    pub vcs_root: VcsRootRef,
    #[serde(default, rename = "checkout-rules")]
    pub checkout_rules: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StepBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub runner_type: String,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StepsBody {
    #[serde(default)]
    pub step: Vec<StepBody>,
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Server-side parameter name: environment and system parameters carry a
/// prefix, configuration parameters do not.
pub(crate) fn wire_name(param: &Parameter) -> String {
    match param.kind {
        ParameterKind::Environment => format!("{ENV_PREFIX}{}", param.name),
        ParameterKind::System => format!("{SYSTEM_PREFIX}{}", param.name),
        ParameterKind::Configuration => param.name.clone(),
    }
}

pub(crate) fn parameter_from_wire(property: Property) -> Parameter {
    if let Some(name) = property.name.strip_prefix(ENV_PREFIX) {
        Parameter::new(ParameterKind::Environment, name, property.value)
    } else if let Some(name) = property.name.strip_prefix(SYSTEM_PREFIX) {
        Parameter::new(ParameterKind::System, name, property.value)
    } else {
        Parameter::new(ParameterKind::Configuration, property.name, property.value)
    }
}

pub(crate) fn parameters_to_wire(params: &ParameterCollection) -> Properties {
    Properties {
        property: params
            .iter()
            .map(|p| Property {
                name: wire_name(p),
                value: p.value.clone(),
            })
            .collect(),
    }
}

pub(crate) fn parameters_from_wire(properties: Properties) -> ParameterCollection {
    properties
        .property
        .into_iter()
        .map(parameter_from_wire)
        .collect()
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

impl From<ProjectBody> for Project {
    fn from(body: ProjectBody) -> Self {
        Project {
            id: ProjectId(body.id),
            name: body.name,
            description: body.description,
            parameters: parameters_from_wire(body.parameters),
        }
    }
}

impl From<BuildTypeBody> for BuildType {
    fn from(body: BuildTypeBody) -> Self {
        BuildType {
            id: BuildConfigId(body.id),
            project_id: ProjectId(body.project_id),
            name: body.name,
            description: body.description,
            parameters: parameters_from_wire(body.parameters),
            vcs_root_entries: body
                .vcs_root_entries
                .entries
                .into_iter()
                .map(VcsRootEntry::from)
                .collect(),
        }
    }
}

impl From<VcsRootEntryBody> for VcsRootEntry {
    fn from(body: VcsRootEntryBody) -> Self {
        VcsRootEntry {
            root_id: VcsRootId(body.vcs_root.id),
            checkout_rules: body.checkout_rules,
        }
    }
}

impl From<&VcsRootEntry> for VcsRootEntryBody {
    fn from(entry: &VcsRootEntry) -> Self {
        VcsRootEntryBody {
            id: entry.root_id.0.clone(),
            vcs_root: VcsRootRef {
                id: entry.root_id.0.clone(),
            },
            checkout_rules: entry.checkout_rules.clone(),
        }
    }
}

impl From<StepBody> for StepRecord {
    fn from(body: StepBody) -> Self {
        StepRecord {
            id: body.id,
            name: body.name,
            runner_type: body.runner_type,
            properties: body
                .properties
                .property
                .into_iter()
                .map(|p| (p.name, p.value))
                .collect(),
        }
    }
}

impl From<&StepRecord> for StepBody {
    fn from(record: &StepRecord) -> Self {
        StepBody {
            id: None,
            name: record.name.clone(),
            runner_type: record.runner_type.clone(),
            properties: Properties {
                property: record
                    .properties
                    .iter()
                    .map(|(name, value)| Property {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ParameterKind::Environment, "JAVA_HOME", "env.JAVA_HOME")]
    #[case(ParameterKind::System, "opt", "system.opt")]
    #[case(ParameterKind::Configuration, "branch", "branch")]
    fn parameter_names_roundtrip_through_prefixes(
        #[case] kind: ParameterKind,
        #[case] name: &str,
        #[case] wire: &str,
    ) {
        let param = Parameter::new(kind, name, "v");
        assert_eq!(wire_name(&param), wire);
        let back = parameter_from_wire(Property {
            name: wire.into(),
            value: "v".into(),
        });
        assert_eq!(back, param);
    }

    #[test]
    fn build_type_json_decodes() {
        let json = r#"{
            "id": "App_Build",
            "name": "Build",
            "projectId": "App",
            "parameters": {"count": 2, "property": [
                {"name": "env.PATH", "value": "/bin"},
                {"name": "branch", "value": "main"}
            ]},
            "vcs-root-entries": {"count": 1, "vcs-root-entry": [
                {"id": "Repo", "vcs-root": {"id": "Repo", "name": "repo"}, "checkout-rules": "+:src"}
            ]}
        }"#;
        let body: BuildTypeBody = serde_json::from_str(json).unwrap();
        let bt = BuildType::from(body);
        assert_eq!(bt.id.0, "App_Build");
        assert_eq!(bt.description, "");
        assert_eq!(
            bt.parameters.get(ParameterKind::Environment, "PATH"),
            Some("/bin")
        );
        assert_eq!(bt.vcs_root_entries[0].root_id.0, "Repo");
        assert_eq!(bt.vcs_root_entries[0].checkout_rules, "+:src");
    }

    #[test]
    fn step_record_serializes_as_property_list() {
        let mut record = StepRecord {
            name: "build".into(),
            runner_type: "simpleRunner".into(),
            ..Default::default()
        };
        record
            .properties
            .insert("command.executable".into(), "build.sh".into());
        let json = serde_json::to_value(StepBody::from(&record)).unwrap();
        assert_eq!(json["type"], "simpleRunner");
        assert_eq!(json["properties"]["property"][0]["name"], "command.executable");
        assert!(json.get("id").is_none());
    }
}
