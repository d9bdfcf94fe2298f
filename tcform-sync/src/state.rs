//! Resource state: what the last apply left on the server, per workspace.
//!
//! Persists a [`StateFile`] JSON document at
//! `<home>/.tcform/state/<workspace>.json`, keyed by manifest resource key.
//! Writes use the atomic `.tmp` + rename pattern.
//!
//! `digest` is the SHA-256 of the declared spec at apply time, so local edits
//! can be spotted without contacting the server. `vcs_roots` and `steps`
//! hold the member fingerprints read back after the apply.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use tcform_codec::Identity;
use tcform_core::config::tcform_dir_at;
use tcform_core::manifest::check_workspace_name;
use tcform_core::ResourceKey;

use crate::error::{io_err, SyncError};
use crate::reconciler::{BuildConfigState, ProjectState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Project,
    BuildConfiguration,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Project => f.write_str("project"),
            ResourceKind::BuildConfiguration => f.write_str("build configuration"),
        }
    }
}

/// One recorded resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    pub kind: ResourceKind,
    /// Server-assigned ID.
    pub id: String,
    pub digest: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vcs_roots: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
    pub synced_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn for_project(remote: &ProjectState, digest: String) -> Self {
        Self {
            kind: ResourceKind::Project,
            id: remote.id.0.clone(),
            digest,
            vcs_roots: Vec::new(),
            steps: Vec::new(),
            synced_at: Utc::now(),
        }
    }

    pub fn for_build_config(remote: &BuildConfigState, digest: String) -> Self {
        Self {
            kind: ResourceKind::BuildConfiguration,
            id: remote.id.0.clone(),
            digest,
            vcs_roots: fingerprints(remote.spec.vcs_root.as_deref()),
            steps: fingerprints(remote.spec.step.as_deref()),
            synced_at: Utc::now(),
        }
    }
}

fn fingerprints<T: Identity>(members: Option<&[T]>) -> Vec<String> {
    members
        .unwrap_or_default()
        .iter()
        .map(|m| m.fingerprint().to_string())
        .collect()
}

/// On-disk state payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    pub synced_at: DateTime<Utc>,
    #[serde(default)]
    pub resources: BTreeMap<ResourceKey, ResourceState>,
}

impl StateFile {
    pub fn empty() -> Self {
        Self {
            synced_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&ResourceState> {
        self.resources.get(key)
    }

    /// Recorded keys of `kind` in key order.
    pub fn keys_of(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceKey> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.kind == kind)
            .map(|(k, _)| k)
    }
}

/// SHA-256 hex digest of a declared spec's canonical JSON.
pub fn spec_digest<T: Serialize>(spec: &T) -> Result<String, SyncError> {
    let json = serde_json::to_vec(spec)?;
    Ok(hex::encode(Sha256::digest(&json)))
}

/// `<home>/.tcform/state/<workspace>.json`
pub fn state_path_at(home: &Path, workspace: &str) -> PathBuf {
    tcform_dir_at(home)
        .join("state")
        .join(format!("{workspace}.json"))
}

/// Load the state for `workspace`. Returns an empty state if none exists.
///
/// The workspace name is checked first, so it can never address a file
/// outside the state directory.
pub fn load_at(home: &Path, workspace: &str) -> Result<StateFile, SyncError> {
    check_workspace_name(workspace)?;
    let path = state_path_at(home, workspace);
    if !path.exists() {
        return Ok(StateFile::empty());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the state for `workspace` atomically.
pub fn save_at(home: &Path, workspace: &str, state: &StateFile) -> Result<(), SyncError> {
    check_workspace_name(workspace)?;
    let path = state_path_at(home, workspace);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid state path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Every workspace with a state file, sorted by name.
pub fn list_workspaces_at(home: &Path) -> Result<Vec<String>, SyncError> {
    let dir = tcform_dir_at(home).join("state");
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))? {
        let path = entry.map_err(|e| io_err(&dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcform_core::{ProjectSpec, VcsRootSpec};
    use tempfile::TempDir;

    fn recorded(kind: ResourceKind, id: &str) -> ResourceState {
        ResourceState {
            kind,
            id: id.into(),
            digest: "d".into(),
            vcs_roots: Vec::new(),
            steps: Vec::new(),
            synced_at: Utc::now(),
        }
    }

    #[test]
    fn empty_state_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let state = load_at(tmp.path(), "nonexistent").unwrap();
        assert!(state.resources.is_empty());
    }

    #[test]
    fn roundtrip_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut state = StateFile::empty();
        state
            .resources
            .insert("app".into(), recorded(ResourceKind::Project, "App"));
        state.resources.insert(
            "app_build".into(),
            recorded(ResourceKind::BuildConfiguration, "App_Build"),
        );

        save_at(tmp.path(), "payments", &state).unwrap();
        let loaded = load_at(tmp.path(), "payments").unwrap();
        assert_eq!(loaded, state);
        assert!(!state_path_at(tmp.path(), "payments")
            .with_extension("json.tmp")
            .exists());
    }

    #[test]
    fn keys_of_filters_by_kind() {
        let mut state = StateFile::empty();
        state
            .resources
            .insert("b".into(), recorded(ResourceKind::BuildConfiguration, "B"));
        state
            .resources
            .insert("a".into(), recorded(ResourceKind::Project, "A"));
        let projects: Vec<_> = state.keys_of(ResourceKind::Project).collect();
        assert_eq!(projects, [&ResourceKey::from("a")]);
    }

    #[test]
    fn digest_tracks_content() {
        let a = ProjectSpec {
            name: "A".into(),
            ..Default::default()
        };
        let mut b = a.clone();
        assert_eq!(spec_digest(&a).unwrap(), spec_digest(&b).unwrap());
        b.description = Some("changed".into());
        assert_ne!(spec_digest(&a).unwrap(), spec_digest(&b).unwrap());
        assert_eq!(spec_digest(&a).unwrap().len(), 64);
    }

    #[test]
    fn fingerprints_are_hex_strings() {
        let roots = vec![VcsRootSpec {
            id: "Repo".into(),
            checkout_rules: Vec::new(),
        }];
        let prints = fingerprints(Some(roots.as_slice()));
        assert_eq!(prints.len(), 1);
        assert_eq!(prints[0].len(), 16);
    }

    #[test]
    fn workspaces_are_listed_from_state_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(list_workspaces_at(tmp.path()).unwrap().is_empty());
        save_at(tmp.path(), "zeta", &StateFile::empty()).unwrap();
        save_at(tmp.path(), "alpha", &StateFile::empty()).unwrap();
        assert_eq!(list_workspaces_at(tmp.path()).unwrap(), ["alpha", "zeta"]);
    }

    #[test]
    fn workspace_names_cannot_leave_the_state_dir() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        let err = save_at(&home, "../../escaped", &StateFile::empty()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
        assert!(load_at(&home, "team/payments").is_err());
        assert!(!home.exists());
    }
}
