//! `tcform show`: import an existing entity as declarative YAML.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Args;

use tcform_core::{BuildConfigId, ProjectId};
use tcform_sync::reconciler;

use super::{home_dir, ServerArgs};

/// Which entity family an ID belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KindArg {
    #[default]
    Project,
    BuildConfig,
}

impl FromStr for KindArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "build-config" | "build_config" | "buildtype" => Ok(Self::BuildConfig),
            other => Err(format!(
                "unknown kind '{other}'; expected: project, build-config"
            )),
        }
    }
}

impl fmt::Display for KindArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindArg::Project => f.write_str("project"),
            KindArg::BuildConfig => f.write_str("build-config"),
        }
    }
}

/// Arguments for `tcform show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Server ID of the entity.
    #[arg(long)]
    pub id: String,

    #[arg(long, default_value_t = KindArg::Project)]
    pub kind: KindArg,

    #[command(flatten)]
    pub server: ServerArgs,
}

impl ShowArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let client = self.server.connect(&home)?;

        let yaml = match self.kind {
            KindArg::Project => {
                let remote = reconciler::read_project(&client, &ProjectId::from(self.id.as_str()))
                    .with_context(|| format!("failed to read project '{}'", self.id))?;
                serde_yaml::to_string(&remote.spec)?
            }
            KindArg::BuildConfig => {
                let remote =
                    reconciler::read_build_config(&client, &BuildConfigId::from(self.id.as_str()))
                        .with_context(|| {
                            format!("failed to read build configuration '{}'", self.id)
                        })?;
                serde_yaml::to_string(&remote.spec)?
            }
        };
        println!("# {} {}", self.kind, self.id);
        print!("{yaml}");
        Ok(())
    }
}
