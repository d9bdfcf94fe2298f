//! Domain types shared by every tcform crate.
//!
//! Two shapes live side by side here:
//! - the *remote* shape (typed, nested) that the build server stores:
//!   [`Project`], [`BuildType`], [`ParameterCollection`], [`BuildStep`];
//! - the *declarative* shape (flat, stringly) that users author:
//!   [`ProjectSpec`], [`BuildConfigSpec`], [`StepSpec`], [`VcsRootSpec`].
//!
//! Conversions between the two live in `tcform-codec`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Server-assigned identifier of a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Server-assigned identifier of a build configuration ("build type").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildConfigId(pub String);

impl fmt::Display for BuildConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BuildConfigId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BuildConfigId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of an existing VCS root on the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VcsRootId(pub String);

impl fmt::Display for VcsRootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for VcsRootId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VcsRootId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// The namespace a parameter lives in. Names are unique within a kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Environment,
    System,
    Configuration,
}

impl ParameterKind {
    /// Every kind, in collection merge order.
    pub const MERGE_ORDER: [ParameterKind; 3] = [
        ParameterKind::Configuration,
        ParameterKind::System,
        ParameterKind::Environment,
    ];

    /// Declarative field that carries parameters of this kind.
    pub fn field_name(self) -> &'static str {
        match self {
            ParameterKind::Environment => "env_params",
            ParameterKind::System => "sys_params",
            ParameterKind::Configuration => "config_params",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::Environment => write!(f, "env"),
            ParameterKind::System => write!(f, "system"),
            ParameterKind::Configuration => write!(f, "configuration"),
        }
    }
}

/// A single typed parameter as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub kind: ParameterKind,
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(kind: ParameterKind, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered parameter collection with add-or-replace semantics on `(kind, name)`.
///
/// Insertion order is kept for the first occurrence of a key; a later add
/// with the same key replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterCollection {
    items: Vec<Parameter>,
}

impl ParameterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `param`, replacing any existing parameter with the same kind and name.
    pub fn add_or_replace(&mut self, param: Parameter) {
        match self
            .items
            .iter_mut()
            .find(|p| p.kind == param.kind && p.name == param.name)
        {
            Some(existing) => existing.value = param.value,
            None => self.items.push(param),
        }
    }

    /// Merge `other` into `self`; `other` wins on conflicting keys.
    pub fn concat(mut self, other: ParameterCollection) -> Self {
        for p in other.items {
            self.add_or_replace(p);
        }
        self
    }

    pub fn get(&self, kind: ParameterKind, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|p| p.kind == kind && p.name == name)
            .map(|p| p.value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.items.iter()
    }

    pub fn of_kind(&self, kind: ParameterKind) -> impl Iterator<Item = &Parameter> {
        self.items.iter().filter(move |p| p.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Parameter> for ParameterCollection {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        let mut out = Self::new();
        for p in iter {
            out.add_or_replace(p);
        }
        out
    }
}

impl<'a> IntoIterator for &'a ParameterCollection {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ---------------------------------------------------------------------------
// VCS roots
// ---------------------------------------------------------------------------

/// A VCS root attached to a build configuration, as stored remotely.
///
/// `checkout_rules` is the newline-joined rule list; empty means "no rules".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsRootEntry {
    pub root_id: VcsRootId,
    #[serde(default)]
    pub checkout_rules: String,
}

// ---------------------------------------------------------------------------
// Build steps (remote shape)
// ---------------------------------------------------------------------------

/// Declarative engine tag of a build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepEngine {
    #[serde(rename = "powershell")]
    Powershell,
    #[serde(rename = "cmd_line")]
    CmdLine,
}

impl StepEngine {
    pub const ALL: [StepEngine; 2] = [StepEngine::Powershell, StepEngine::CmdLine];

    /// The tag users write in the `type` field.
    pub fn tag(self) -> &'static str {
        match self {
            StepEngine::Powershell => "powershell",
            StepEngine::CmdLine => "cmd_line",
        }
    }

    /// Parse a declarative tag. Returns `None` for anything unsupported.
    pub fn from_tag(tag: &str) -> Option<Self> {
        StepEngine::ALL.into_iter().find(|e| e.tag() == tag)
    }
}

impl fmt::Display for StepEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Command-line runner content: either an executable or an inline script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Executable { path: String, args: String },
    Script { content: String },
}

/// PowerShell runner content: either a script file or inline code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Powershell {
    ScriptFile { path: String, args: String },
    Code { code: String },
}

/// Engine-specific payload of a build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepBody {
    CommandLine(CommandLine),
    Powershell(Powershell),
}

impl StepBody {
    /// The declarative engine tag for this variant.
    pub fn engine(&self) -> StepEngine {
        match self {
            StepBody::CommandLine(_) => StepEngine::CmdLine,
            StepBody::Powershell(_) => StepEngine::Powershell,
        }
    }
}

/// A typed build step. `id` and a non-empty `name` are assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub id: Option<String>,
    pub name: String,
    pub body: StepBody,
}

/// A build step exactly as the server exchanges it: a runner type string and
/// a flat property bag. Runner types the codec does not know are kept here
/// verbatim so they can be reported instead of dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub runner_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl StepRecord {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Remote entities
// ---------------------------------------------------------------------------

/// Mandatory identity fields for allocating a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
}

/// A project as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: ParameterCollection,
}

/// Mandatory identity fields for allocating a build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBuildType {
    pub project_id: ProjectId,
    pub name: String,
}

/// A build configuration as stored remotely. Steps are fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildType {
    pub id: BuildConfigId,
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: ParameterCollection,
    #[serde(default)]
    pub vcs_root_entries: Vec<VcsRootEntry>,
}

// ---------------------------------------------------------------------------
// Declarative shape
// ---------------------------------------------------------------------------

/// A flat key/value parameter map as authored. Values are kept untyped so
/// that non-string input can be rejected by the codec instead of the parser.
pub type ParamMap = BTreeMap<String, serde_yaml::Value>;

/// The three per-kind parameter fields. `None` means "field absent".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterMaps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_params: Option<ParamMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sys_params: Option<ParamMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_params: Option<ParamMap>,
}

impl ParameterMaps {
    pub fn get(&self, kind: ParameterKind) -> Option<&ParamMap> {
        match kind {
            ParameterKind::Environment => self.env_params.as_ref(),
            ParameterKind::System => self.sys_params.as_ref(),
            ParameterKind::Configuration => self.config_params.as_ref(),
        }
    }

    pub fn set(&mut self, kind: ParameterKind, map: Option<ParamMap>) {
        match kind {
            ParameterKind::Environment => self.env_params = map,
            ParameterKind::System => self.sys_params = map,
            ParameterKind::Configuration => self.config_params = map,
        }
    }
}

/// A declared VCS root attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsRootSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checkout_rules: Vec<String>,
}

/// A declared build step. `step_type` stays a string so unknown engines are
/// reported by the codec with the offending tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Declared desired state of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub params: ParameterMaps,
}

/// Declared desired state of a build configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfigSpec {
    pub name: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub params: ParameterMaps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_root: Option<Vec<VcsRootSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Vec<StepSpec>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(ProjectId::from("Root_App").to_string(), "Root_App");
        assert_eq!(BuildConfigId::from("App_Build").to_string(), "App_Build");
        assert_eq!(VcsRootId::from("vcs1").to_string(), "vcs1");
    }

    #[test]
    fn add_or_replace_keeps_position_and_replaces_value() {
        let mut params = ParameterCollection::new();
        params.add_or_replace(Parameter::new(ParameterKind::Configuration, "a", "1"));
        params.add_or_replace(Parameter::new(ParameterKind::Configuration, "b", "2"));
        params.add_or_replace(Parameter::new(ParameterKind::Configuration, "a", "3"));

        let names: Vec<_> = params.iter().map(|p| (p.name.as_str(), p.value.as_str())).collect();
        assert_eq!(names, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn same_name_in_different_kinds_does_not_collide() {
        let params: ParameterCollection = [
            Parameter::new(ParameterKind::Environment, "PATH", "/env"),
            Parameter::new(ParameterKind::System, "PATH", "/sys"),
        ]
        .into_iter()
        .collect();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get(ParameterKind::Environment, "PATH"), Some("/env"));
        assert_eq!(params.get(ParameterKind::System, "PATH"), Some("/sys"));
        assert_eq!(params.get(ParameterKind::Configuration, "PATH"), None);
    }

    #[test]
    fn concat_lets_the_right_side_win() {
        let left: ParameterCollection =
            [Parameter::new(ParameterKind::System, "x", "old")].into_iter().collect();
        let right: ParameterCollection =
            [Parameter::new(ParameterKind::System, "x", "new")].into_iter().collect();
        let merged = left.concat(right);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get(ParameterKind::System, "x"), Some("new"));
    }

    #[test]
    fn engine_tags_roundtrip() {
        for engine in StepEngine::ALL {
            assert_eq!(StepEngine::from_tag(engine.tag()), Some(engine));
        }
        assert_eq!(StepEngine::from_tag("gradle"), None);
        assert_eq!(StepEngine::from_tag("Powershell"), None);
    }

    #[test]
    fn step_body_reports_engine() {
        let body = StepBody::Powershell(Powershell::Code { code: String::new() });
        assert_eq!(body.engine(), StepEngine::Powershell);
        let body = StepBody::CommandLine(CommandLine::Script { content: "make".into() });
        assert_eq!(body.engine(), StepEngine::CmdLine);
    }

    #[test]
    fn build_config_spec_yaml_uses_declarative_field_names() {
        let yaml = r#"
name: Build
project_id: App
env_params:
  HOME: /root
vcs_root:
  - id: vcs1
    checkout_rules: ["+:src"]
step:
  - type: cmd_line
    file: build.sh
"#;
        let spec: BuildConfigSpec = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(spec.name, "Build");
        assert_eq!(spec.project_id, "App");
        assert!(spec.params.sys_params.is_none());
        let env = spec.params.env_params.as_ref().expect("env_params");
        assert_eq!(env.get("HOME"), Some(&serde_yaml::Value::from("/root")));
        let vcs = spec.vcs_root.as_ref().expect("vcs_root");
        assert_eq!(vcs[0].checkout_rules, vec!["+:src".to_string()]);
        let steps = spec.step.as_ref().expect("step");
        assert_eq!(steps[0].step_type, "cmd_line");
        assert_eq!(steps[0].file.as_deref(), Some("build.sh"));

        let back = serde_yaml::to_string(&spec).expect("serialize");
        assert!(back.contains("env_params"));
        assert!(!back.contains("sys_params"), "absent kinds stay absent: {back}");
    }
}
