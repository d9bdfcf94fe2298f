//! Declarative manifest: the YAML document a user writes to describe the
//! projects and build configurations they want on the server.
//!
//! ```yaml
//! workspace: payments
//! projects:
//!   app:
//!     name: Payments
//!     env_params: { JAVA_HOME: /opt/jdk }
//! build_configurations:
//!   app_build:
//!     name: Build
//!     project_id: Payments
//!     step:
//!       - type: cmd_line
//!         file: build.sh
//! ```
//!
//! Resource keys are manifest-local names; the server assigns the real IDs,
//! which `tcform-sync` records in its state file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ManifestError};
use crate::types::{BuildConfigSpec, ProjectSpec};

/// Manifest-local name of a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(pub String);

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ResourceKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Root of a manifest file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Names the state file this manifest is reconciled against.
    pub workspace: String,
    #[serde(default)]
    pub projects: BTreeMap<ResourceKey, ProjectSpec>,
    #[serde(default)]
    pub build_configurations: BTreeMap<ResourceKey, BuildConfigSpec>,
}

impl Manifest {
    /// Structural checks that the YAML schema cannot express.
    ///
    /// Parameter values and step engines are checked later by the codecs.
    pub fn validate(&self) -> Result<(), ManifestError> {
        check_workspace_name(&self.workspace)?;
        for (key, project) in &self.projects {
            if project.name.trim().is_empty() {
                return Err(invalid(&key.0, "project name must not be empty"));
            }
        }
        for (key, config) in &self.build_configurations {
            if self.projects.contains_key(key) {
                return Err(invalid(
                    &key.0,
                    "key is used by both a project and a build configuration",
                ));
            }
            if config.name.trim().is_empty() {
                return Err(invalid(&key.0, "build configuration name must not be empty"));
            }
            if config.project_id.trim().is_empty() {
                return Err(invalid(&key.0, "project_id must not be empty"));
            }
            if let Some(roots) = &config.vcs_root {
                if roots.iter().any(|r| r.id.trim().is_empty()) {
                    return Err(invalid(&key.0, "vcs_root id must not be empty"));
                }
            }
        }
        Ok(())
    }

    /// Total number of declared resources.
    pub fn len(&self) -> usize {
        self.projects.len() + self.build_configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A workspace name becomes a state file name: ASCII letters, digits,
/// `-`, `_` and `.`, not starting with `.`.
pub fn check_workspace_name(name: &str) -> Result<(), ManifestError> {
    if name.is_empty() {
        return Err(invalid("workspace", "workspace name must not be empty"));
    }
    if name.starts_with('.') {
        return Err(invalid("workspace", "workspace name must not start with '.'"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(invalid(
            "workspace",
            &format!("workspace name must not contain {c:?}"),
        ));
    }
    Ok(())
}

fn invalid(key: &str, reason: &str) -> ManifestError {
    ManifestError::Invalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Load and validate a manifest from `path`.
///
/// Returns `ManifestError::NotFound` if absent and `ManifestError::Parse`
/// (with path + line context) if malformed.
pub fn load(path: &Path) -> Result<Manifest, ManifestError> {
    let manifest = parse_file(path)?;
    manifest.validate()?;
    Ok(manifest)
}

/// Load a manifest without running [`Manifest::validate`].
pub fn parse_file(path: &Path) -> Result<Manifest, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| ManifestError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
workspace: payments
projects:
  app:
    name: Payments
    description: Payment services
    config_params:
      region: eu
build_configurations:
  app_build:
    name: Build
    project_id: Payments
    step:
      - type: cmd_line
        file: build.sh
        args: --release
"#;

    #[test]
    fn load_sample_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tcform.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let manifest = load(&path).expect("load");
        assert_eq!(manifest.workspace, "payments");
        assert_eq!(manifest.len(), 2);
        let project = &manifest.projects[&ResourceKey::from("app")];
        assert_eq!(project.description.as_deref(), Some("Payment services"));
        let build = &manifest.build_configurations[&ResourceKey::from("app_build")];
        assert_eq!(build.step.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }));
    }

    #[test]
    fn shared_key_between_kinds_is_rejected() {
        let mut manifest: Manifest = serde_yaml::from_str(SAMPLE).unwrap();
        let build = manifest
            .build_configurations
            .remove(&ResourceKey::from("app_build"))
            .unwrap();
        manifest.build_configurations.insert(ResourceKey::from("app"), build);
        let err = manifest.validate().unwrap_err();
        assert!(matches!(err, ManifestError::Invalid { ref key, .. } if key == "app"));
    }
}
