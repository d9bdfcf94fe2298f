//! `tcform status`: recorded resources and local edits since the last apply.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use tcform_sync::status::{self, format_datetime_age};
use tcform_sync::{state, ResourceKind, ResourceStatus, StatusRow};

use super::{home_dir, ManifestArgs};

/// Arguments for `tcform status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Show one workspace from its state alone, ignoring any manifest.
    #[arg(long)]
    pub workspace: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let report = self.collect(&home)?;
        if self.json {
            print_json(&report)?;
            return Ok(());
        }
        print_tables(&report);
        Ok(())
    }

    fn collect(&self, home: &Path) -> Result<Vec<(String, Vec<StatusRow>)>> {
        if let Some(workspace) = &self.workspace {
            let rows = status::recorded_at(home, workspace)
                .with_context(|| format!("failed to load state for '{workspace}'"))?;
            return Ok(vec![(workspace.clone(), rows)]);
        }
        if self.manifest.file.exists() {
            let manifest = self.manifest.load()?;
            let rows = status::check_at(home, &manifest)
                .with_context(|| format!("status check failed for '{}'", manifest.workspace))?;
            return Ok(vec![(manifest.workspace, rows)]);
        }

        let workspaces =
            state::list_workspaces_at(home).context("failed to list recorded workspaces")?;
        workspaces
            .into_iter()
            .map(|workspace| {
                let rows = status::recorded_at(home, &workspace)
                    .with_context(|| format!("failed to load state for '{workspace}'"))?;
                Ok((workspace, rows))
            })
            .collect()
    }
}

#[derive(Serialize)]
struct WorkspaceJson {
    workspace: String,
    resources: Vec<ResourceJson>,
}

#[derive(Serialize)]
struct ResourceJson {
    key: String,
    kind: ResourceKind,
    id: Option<String>,
    status: ResourceStatus,
    vcs_roots: usize,
    steps: usize,
    last_sync_at: Option<DateTime<Utc>>,
    last_sync_age: String,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "resource")]
    key: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "vcs roots")]
    vcs_roots: usize,
    #[tabled(rename = "steps")]
    steps: usize,
    #[tabled(rename = "last sync")]
    last_sync: String,
}

fn last_sync_age(row: &StatusRow) -> String {
    row.synced_at
        .map(format_datetime_age)
        .unwrap_or_else(|| "never".to_string())
}

fn print_json(report: &[(String, Vec<StatusRow>)]) -> Result<()> {
    let payload: Vec<WorkspaceJson> = report
        .iter()
        .map(|(workspace, rows)| WorkspaceJson {
            workspace: workspace.clone(),
            resources: rows
                .iter()
                .map(|row| ResourceJson {
                    key: row.key.0.clone(),
                    kind: row.kind,
                    id: row.id.clone(),
                    status: row.status,
                    vcs_roots: row.vcs_roots,
                    steps: row.steps,
                    last_sync_at: row.synced_at,
                    last_sync_age: last_sync_age(row),
                })
                .collect(),
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_tables(report: &[(String, Vec<StatusRow>)]) {
    let total: usize = report.iter().map(|(_, rows)| rows.len()).sum();
    println!(
        "tcform v{} | {} workspaces | {} resources",
        env!("CARGO_PKG_VERSION"),
        report.len(),
        total
    );
    if total == 0 {
        println!("No resources recorded.");
        return;
    }

    let mut needs_apply = false;
    for (workspace, rows) in report {
        println!("{}", workspace.to_uppercase().bold());
        let table_rows: Vec<StatusTableRow> = rows
            .iter()
            .map(|row| {
                needs_apply |= matches!(
                    row.status,
                    ResourceStatus::Pending | ResourceStatus::Modified | ResourceStatus::Orphaned
                );
                StatusTableRow {
                    key: row.key.0.clone(),
                    kind: row.kind.to_string(),
                    id: row.id.clone().unwrap_or_else(|| "-".to_string()),
                    status: status_label(row.status),
                    vcs_roots: row.vcs_roots,
                    steps: row.steps,
                    last_sync: last_sync_age(row),
                }
            })
            .collect();
        let mut table = Table::new(table_rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    if needs_apply {
        println!("Run 'tcform plan' to see the pending changes.");
    }
}

fn status_label(status: ResourceStatus) -> String {
    let label = status.to_string().to_uppercase();
    match status {
        ResourceStatus::InSync => label.green().to_string(),
        ResourceStatus::Pending => label.bright_black().to_string(),
        ResourceStatus::Modified => label.yellow().to_string(),
        ResourceStatus::Orphaned => label.magenta().to_string(),
        ResourceStatus::Recorded => label,
    }
}
