//! Docker availability probe and compose flavor detection

use super::command::{self, CommandSpec};
use crate::error::{DeployError, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Default Docker CLI binary
pub const DEFAULT_DOCKER_BIN: &str = "docker";

/// Standalone compose binary
pub const STANDALONE_COMPOSE_BIN: &str = "docker-compose";

/// How Docker Compose is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ComposeFlavor {
    /// `docker compose` (CLI plugin, Compose v2)
    Plugin,
    /// `docker-compose` (standalone binary)
    Standalone,
}

impl ComposeFlavor {
    /// Base command for this flavor, before any compose arguments.
    ///
    /// `docker_bin` is only used by the plugin, `standalone_bin` only by
    /// the standalone flavor.
    pub fn base_command(self, docker_bin: &str, standalone_bin: &str) -> CommandSpec {
        match self {
            ComposeFlavor::Plugin => CommandSpec::new(docker_bin).arg("compose"),
            ComposeFlavor::Standalone => CommandSpec::new(standalone_bin),
        }
    }
}

impl fmt::Display for ComposeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeFlavor::Plugin => write!(f, "docker compose"),
            ComposeFlavor::Standalone => write!(f, "docker-compose"),
        }
    }
}

/// Probes the local Docker installation
#[derive(Debug, Clone)]
pub struct DockerProbe {
    docker_bin: String,
    standalone_bin: String,
}

impl Default for DockerProbe {
    fn default() -> Self {
        Self::new(DEFAULT_DOCKER_BIN)
    }
}

impl DockerProbe {
    /// Create a probe for the given Docker CLI binary
    pub fn new(docker_bin: &str) -> Self {
        Self {
            docker_bin: docker_bin.to_string(),
            standalone_bin: STANDALONE_COMPOSE_BIN.to_string(),
        }
    }

    /// Use a different standalone compose binary
    pub fn with_standalone_bin(mut self, standalone_bin: &str) -> Self {
        self.standalone_bin = standalone_bin.to_string();
        self
    }

    /// Check that the Docker CLI is installed and the daemon answers.
    pub async fn check_available(&self) -> Result<()> {
        let version = command::capture(&CommandSpec::new(&self.docker_bin).arg("--version"))
            .await
            .ok_or_else(|| {
                DeployError::DockerUnavailable(format!(
                    "`{} --version` did not run. Install Docker (https://docs.docker.com/get-docker/) \
                     and make sure `{}` is on PATH.",
                    self.docker_bin, self.docker_bin
                ))
            })?;

        let version = parse_version(&version);
        tracing::debug!(version = ?version, "Docker CLI found");

        command::capture(&CommandSpec::new(&self.docker_bin).arg("info"))
            .await
            .ok_or_else(|| {
                DeployError::DockerUnavailable(format!(
                    "`{} info` failed. Start the Docker daemon, and check that the current user \
                     may access the Docker socket (e.g. membership of the `docker` group).",
                    self.docker_bin
                ))
            })?;

        tracing::info!("Docker daemon is reachable");
        Ok(())
    }

    /// Detect how compose should be invoked, preferring the CLI plugin.
    pub async fn detect_compose(&self) -> Result<ComposeFlavor> {
        for flavor in [ComposeFlavor::Plugin, ComposeFlavor::Standalone] {
            let base = flavor.base_command(&self.docker_bin, &self.standalone_bin);
            let probe = match flavor {
                ComposeFlavor::Plugin => base.arg("version"),
                ComposeFlavor::Standalone => base.arg("--version"),
            };

            if let Some(output) = command::capture(&probe).await {
                let version = parse_version(&output);
                tracing::info!(
                    flavor = %flavor,
                    version = version.as_deref().unwrap_or("unknown"),
                    "Using Docker Compose"
                );
                return Ok(flavor);
            }
        }

        Err(DeployError::DockerUnavailable(format!(
            "no Docker Compose implementation found; install the compose plugin \
             (`{} compose`) or the standalone `{}` binary",
            self.docker_bin, self.standalone_bin
        )))
    }
}

/// Extract a semantic version from tool version output.
///
/// Handles both `Docker Compose version v2.24.5` and
/// `docker-compose version 1.29.2, build 5becea4c`.
pub fn parse_version(output: &str) -> Option<String> {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    let re = VERSION.get_or_init(|| {
        Regex::new(r"v?(\d+\.\d+\.\d+(?:[-+][0-9A-Za-z.-]+)?)").expect("version pattern is valid")
    });

    re.captures(output).map(|caps| caps[1].to_string())
}
