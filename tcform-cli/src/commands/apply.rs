//! `tcform apply`: reconcile the server with a manifest.

use anyhow::{Context, Result};
use clap::Args;

use tcform_sync::pipeline::ResourceResult;
use tcform_sync::{ApplyOutcome, ApplyReport};

use super::plan::action_marker;
use super::{home_dir, ManifestArgs, ServerArgs};

/// Arguments for `tcform apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    #[command(flatten)]
    pub server: ServerArgs,

    /// Show what would change without writing to the server or the state.
    #[arg(long)]
    pub dry_run: bool,
}

impl ApplyArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let manifest = self.manifest.load()?;
        let client = self.server.connect(&home)?;

        let report = tcform_sync::apply(&client, &manifest, &home, self.dry_run)
            .with_context(|| format!("apply failed for '{}'", manifest.workspace))?;
        print_report(&report, self.dry_run);
        Ok(())
    }
}

pub(crate) fn print_report(report: &ApplyReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if report.changed() == 0 {
        println!("{prefix}✓ '{}': nothing to do", report.workspace);
        return;
    }
    println!(
        "{prefix}✓ '{}': {} changed, {} unchanged",
        report.workspace,
        report.changed(),
        report.results.len() - report.changed()
    );
    for result in &report.results {
        println!("  {}", describe(result));
    }
}

fn describe(result: &ResourceResult) -> String {
    let key = &result.key;
    let kind = result.kind;
    match &result.outcome {
        ApplyOutcome::Created { id } => format!("✎  created {kind} {key} ({id})"),
        ApplyOutcome::Updated { id } => format!("✎  updated {kind} {key} ({id})"),
        ApplyOutcome::Replaced { old, new } => {
            format!("✎  replaced {kind} {key} ({old} → {new})")
        }
        ApplyOutcome::Deleted { id } => format!("✗  deleted {kind} {key} ({id})"),
        ApplyOutcome::Unchanged { id } => format!("·  {kind} {key} ({id})"),
        ApplyOutcome::Would(action) => {
            format!("{}  would {} {kind} {key}", action_marker(*action), action.verb())
        }
    }
}
