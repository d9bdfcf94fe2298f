//! Offline status of recorded resources.
//!
//! Classification, per resource key:
//! 1. `Pending` (declared, never applied)
//! 2. `Orphaned` (recorded, no longer declared)
//! 3. `Modified` (declared spec digest differs from the one recorded)
//! 4. `InSync`
//!
//! Without a manifest every recorded resource is `Recorded`. No server calls
//! are made.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use tcform_core::{Manifest, ResourceKey};

use crate::state::{self, spec_digest, ResourceKind, ResourceState};
use crate::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Pending,
    Orphaned,
    Modified,
    InSync,
    Recorded,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceStatus::Pending => "pending",
            ResourceStatus::Orphaned => "orphaned",
            ResourceStatus::Modified => "modified",
            ResourceStatus::InSync => "in sync",
            ResourceStatus::Recorded => "recorded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub key: ResourceKey,
    pub kind: ResourceKind,
    pub id: Option<String>,
    pub status: ResourceStatus,
    pub vcs_roots: usize,
    pub steps: usize,
    pub synced_at: Option<DateTime<Utc>>,
}

impl StatusRow {
    fn recorded(key: &ResourceKey, recorded: &ResourceState, status: ResourceStatus) -> Self {
        Self {
            key: key.clone(),
            kind: recorded.kind,
            id: Some(recorded.id.clone()),
            status,
            vcs_roots: recorded.vcs_roots.len(),
            steps: recorded.steps.len(),
            synced_at: Some(recorded.synced_at),
        }
    }

    fn pending(key: &ResourceKey, kind: ResourceKind) -> Self {
        Self {
            key: key.clone(),
            kind,
            id: None,
            status: ResourceStatus::Pending,
            vcs_roots: 0,
            steps: 0,
            synced_at: None,
        }
    }
}

fn classify(recorded: Option<&ResourceState>, kind: ResourceKind, digest: &str) -> ResourceStatus {
    match recorded {
        None => ResourceStatus::Pending,
        Some(r) if r.kind != kind => ResourceStatus::Pending,
        Some(r) if r.digest != digest => ResourceStatus::Modified,
        Some(_) => ResourceStatus::InSync,
    }
}

/// Status rows for `manifest`'s workspace, in key order per kind.
pub fn check_at(home: &Path, manifest: &Manifest) -> Result<Vec<StatusRow>, SyncError> {
    let state = state::load_at(home, &manifest.workspace)?;
    let mut rows = Vec::new();

    let mut declared = Vec::with_capacity(manifest.len());
    for (key, spec) in &manifest.projects {
        declared.push((key, ResourceKind::Project, spec_digest(spec)?));
    }
    for (key, spec) in &manifest.build_configurations {
        declared.push((key, ResourceKind::BuildConfiguration, spec_digest(spec)?));
    }

    for (key, kind, digest) in declared {
        let recorded = state.get(key);
        match classify(recorded, kind, &digest) {
            ResourceStatus::Pending => rows.push(StatusRow::pending(key, kind)),
            status => {
                if let Some(recorded) = recorded {
                    rows.push(StatusRow::recorded(key, recorded, status));
                }
            }
        }
    }

    for (key, recorded) in &state.resources {
        let still_declared = match recorded.kind {
            ResourceKind::Project => manifest.projects.contains_key(key),
            ResourceKind::BuildConfiguration => manifest.build_configurations.contains_key(key),
        };
        if !still_declared {
            rows.push(StatusRow::recorded(key, recorded, ResourceStatus::Orphaned));
        }
    }
    Ok(rows)
}

/// Status rows for a workspace from its state file alone.
pub fn recorded_at(home: &Path, workspace: &str) -> Result<Vec<StatusRow>, SyncError> {
    let state = state::load_at(home, workspace)?;
    Ok(state
        .resources
        .iter()
        .map(|(key, recorded)| StatusRow::recorded(key, recorded, ResourceStatus::Recorded))
        .collect())
}

/// Format age from a chrono timestamp (state `synced_at`).
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
