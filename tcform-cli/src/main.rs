//! tcform: declarative TeamCity projects and build configurations.
//!
//! # Usage
//!
//! ```text
//! tcform validate [-f tcform.yaml]
//! tcform plan [-f tcform.yaml] [--diff]
//! tcform apply [-f tcform.yaml] [--dry-run]
//! tcform show --id <ID> [--kind project|build-config]
//! tcform destroy [-f tcform.yaml | --workspace <name>] [--dry-run]
//! tcform status [-f tcform.yaml | --workspace <name>] [--json]
//! ```
//!
//! Server commands read `~/.tcform/config.yaml`; `--server`/`TEAMCITY_URL`
//! and `--token`/`TEAMCITY_TOKEN` override it.

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{
    apply::ApplyArgs, destroy::DestroyArgs, plan::PlanArgs, show::ShowArgs, status::StatusArgs,
    validate::ValidateArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tcform",
    version,
    about = "Reconcile TeamCity projects and build configurations with a YAML manifest",
    long_about = None,
)]
struct Cli {
    /// More log output (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a manifest offline, expanding every resource.
    Validate(ValidateArgs),

    /// Show what apply would change on the server.
    Plan(PlanArgs),

    /// Create, update, replace or delete server entities to match the manifest.
    Apply(ApplyArgs),

    /// Read an existing server entity into declarative YAML.
    Show(ShowArgs),

    /// Delete every entity recorded for a workspace.
    Destroy(DestroyArgs),

    /// Show recorded resources and local edits since the last apply.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Validate(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Apply(args) => args.run(),
        Commands::Show(args) => args.run(),
        Commands::Destroy(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
