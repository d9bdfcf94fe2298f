//! Subcommands and the arguments they share.

pub mod apply;
pub mod destroy;
pub mod plan;
pub mod show;
pub mod status;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use tcform_client::HttpClient;
use tcform_core::{config, manifest, Manifest, ServerConfig};

pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// `-f/--file`, the manifest to read.
#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Path to the manifest.
    #[arg(short = 'f', long = "file", default_value = "tcform.yaml")]
    pub file: PathBuf,
}

impl ManifestArgs {
    pub fn load(&self) -> Result<Manifest> {
        manifest::load(&self.file)
            .with_context(|| format!("failed to load manifest {}", self.file.display()))
    }

    /// Workspace named by `--workspace`, or else by the manifest.
    pub fn workspace(&self, explicit: Option<&str>) -> Result<String> {
        match explicit {
            Some(name) => Ok(name.to_string()),
            None => Ok(self.load()?.workspace),
        }
    }
}

/// Server connection overrides.
#[derive(Args, Debug)]
pub struct ServerArgs {
    /// TeamCity base URL.
    #[arg(long, env = "TEAMCITY_URL")]
    pub server: Option<String>,

    /// Access token sent as a bearer token.
    #[arg(long, env = "TEAMCITY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl ServerArgs {
    /// Config file values with command-line and environment overrides.
    pub fn resolve(&self, home: &Path) -> Result<ServerConfig> {
        let from_file = config::load_at(home).context("failed to read server config")?;
        let base = match (from_file, &self.server) {
            (Some(file), _) => file,
            (None, Some(url)) => ServerConfig::new(url.clone()),
            (None, None) => bail!(
                "no server configured; pass --server or write {}",
                config::config_path_at(home).display()
            ),
        };
        Ok(base.with_overrides(self.server.clone(), self.token.clone()))
    }

    pub fn connect(&self, home: &Path) -> Result<HttpClient> {
        let config = self.resolve(home)?;
        tracing::debug!(url = %config.url, "connecting");
        Ok(HttpClient::new(&config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn flag_wins_over_config_file() {
        let home = TempDir::new().unwrap();
        config::save_at(home.path(), &ServerConfig::new("https://file.example")).unwrap();

        let args = ServerArgs {
            server: Some("https://flag.example".into()),
            token: Some("t0k".into()),
        };
        let resolved = args.resolve(home.path()).unwrap();
        assert_eq!(resolved.url, "https://flag.example");
        assert_eq!(resolved.token.as_deref(), Some("t0k"));
    }

    #[test]
    fn nothing_configured_is_an_error() {
        let home = TempDir::new().unwrap();
        let args = ServerArgs {
            server: None,
            token: None,
        };
        let err = args.resolve(home.path()).unwrap_err();
        assert!(err.to_string().contains("no server configured"));
    }
}
