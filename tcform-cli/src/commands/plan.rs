//! `tcform plan`: what apply would change, and why.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tcform_sync::{state, Action, ResourcePlan};

use super::{home_dir, ManifestArgs, ServerArgs};

/// Arguments for `tcform plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    #[command(flatten)]
    pub server: ServerArgs,

    /// Also print a unified remote-versus-declared diff per resource.
    #[arg(long)]
    pub diff: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let manifest = self.manifest.load()?;
        let client = self.server.connect(&home)?;
        let recorded = state::load_at(&home, &manifest.workspace)
            .with_context(|| format!("failed to load state for '{}'", manifest.workspace))?;

        let plans = tcform_sync::plan(&client, &manifest, &recorded)
            .with_context(|| format!("plan failed for '{}'", manifest.workspace))?;

        for plan in &plans {
            print_plan(plan);
            if self.diff && !plan.drift.is_empty() {
                print!("{}", plan.drift);
                if !plan.drift.ends_with('\n') {
                    println!();
                }
            }
        }
        println!("{}", summary(&plans));
        Ok(())
    }
}

pub(crate) fn action_marker(action: Action) -> String {
    match action {
        Action::Create => "+".green().bold().to_string(),
        Action::Update => "~".yellow().bold().to_string(),
        Action::Replace => "±".magenta().bold().to_string(),
        Action::Delete => "-".red().bold().to_string(),
        Action::NoOp => "·".bright_black().to_string(),
    }
}

fn print_plan(plan: &ResourcePlan) {
    let id = plan.id.as_deref().unwrap_or("(new)");
    println!(
        "{} {} {} [{id}]: {}",
        action_marker(plan.action),
        plan.kind,
        plan.key.0.bold(),
        plan.action.verb()
    );
    if let Some(reason) = &plan.reason {
        println!("    {}", reason.bright_black());
    }
    for change in &plan.changes {
        let note = if change.forces_replacement {
            " (forces replacement)"
        } else {
            ""
        };
        println!("    {}: {}{note}", change.field, change.detail);
    }
}

fn summary(plans: &[ResourcePlan]) -> String {
    let count = |action: Action| plans.iter().filter(|p| p.action == action).count();
    if plans.iter().all(ResourcePlan::is_noop) {
        return "No changes. The server matches the manifest.".to_string();
    }
    format!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete.",
        count(Action::Create),
        count(Action::Update),
        count(Action::Replace),
        count(Action::Delete)
    )
}
