//! `tcform validate`: offline manifest check.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use tcform_core::manifest;
use tcform_sync::diff::{normalize_build_config, normalize_project, shadowed_members};
use tcform_sync::SyncError;

use super::ManifestArgs;

/// Arguments for `tcform validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,
}

impl ValidateArgs {
    pub fn run(self) -> Result<()> {
        let path = &self.manifest.file;
        let manifest = manifest::parse_file(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        manifest
            .validate()
            .with_context(|| format!("{} is invalid", path.display()))?;

        let mut failures = 0;
        let checks = manifest
            .projects
            .iter()
            .map(|(key, spec)| (key, normalize_project(spec).map(drop)))
            .chain(
                manifest
                    .build_configurations
                    .iter()
                    .map(|(key, spec)| (key, normalize_build_config(spec).map(drop))),
            );
        for (key, result) in checks {
            match result {
                Ok(()) => println!("  {}  {key}", "✓".green()),
                Err(err) => {
                    failures += 1;
                    print_failure(&key.0, &err);
                }
            }
        }

        // Duplicates are kept as the last occurrence, so they only warn.
        for (key, spec) in &manifest.build_configurations {
            for part in shadowed_members(spec) {
                println!(
                    "  {}  {key}: {part} is overridden by a later duplicate",
                    "⚠".yellow()
                );
            }
        }

        if failures > 0 {
            bail!("{failures} of {} resources failed validation", manifest.len());
        }
        println!(
            "✓ '{}' is valid ({} resources)",
            manifest.workspace,
            manifest.len()
        );
        Ok(())
    }
}

fn print_failure(key: &str, err: &SyncError) {
    println!("  {}  {key}: {} ({})", "✗".red(), err, err.kind());
}
