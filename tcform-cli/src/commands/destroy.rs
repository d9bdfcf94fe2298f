//! `tcform destroy`: delete everything a workspace recorded.

use anyhow::{Context, Result};
use clap::Args;

use super::apply::print_report;
use super::{home_dir, ManifestArgs, ServerArgs};

/// Arguments for `tcform destroy`.
#[derive(Args, Debug)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Workspace to destroy; defaults to the manifest's.
    #[arg(long)]
    pub workspace: Option<String>,

    #[command(flatten)]
    pub server: ServerArgs,

    /// List what would be deleted without deleting it.
    #[arg(long)]
    pub dry_run: bool,
}

impl DestroyArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let workspace = self.manifest.workspace(self.workspace.as_deref())?;
        let client = self.server.connect(&home)?;

        let report = tcform_sync::destroy(&client, &home, &workspace, self.dry_run)
            .with_context(|| format!("destroy failed for '{workspace}'"))?;
        if report.results.is_empty() {
            println!("Nothing recorded for '{workspace}'.");
            return Ok(());
        }
        print_report(&report, self.dry_run);
        Ok(())
    }
}
