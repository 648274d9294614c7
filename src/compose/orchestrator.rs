//! Docker Compose redeploy orchestrator

use crate::docker::command::{self, CommandSpec};
use crate::docker::probe::{ComposeFlavor, DEFAULT_DOCKER_BIN, STANDALONE_COMPOSE_BIN};
use crate::error::Result;
use std::fmt;
use std::path::{Path, PathBuf};

/// One stage of a clean redeploy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    /// Stop and remove the running stack
    Down,
    /// Refresh service images
    Pull,
    /// Start the stack detached
    Up,
}

impl DeployStep {
    /// Compose arguments for this step
    pub fn args(self) -> &'static [&'static str] {
        match self {
            DeployStep::Down => &["down"],
            DeployStep::Pull => &["pull"],
            DeployStep::Up => &["up", "-d"],
        }
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployStep::Down => write!(f, "down"),
            DeployStep::Pull => write!(f, "pull"),
            DeployStep::Up => write!(f, "up"),
        }
    }
}

/// Compose orchestrator
///
/// Drives the compose CLI against a single compose file.
pub struct ComposeOrchestrator {
    /// How compose is invoked
    flavor: ComposeFlavor,
    /// Docker CLI binary used by the plugin flavor
    docker_bin: String,
    /// Compose binary used by the standalone flavor
    standalone_bin: String,
    /// Compose file passed with `-f`
    compose_file: PathBuf,
    /// Project working directory
    working_dir: PathBuf,
}

impl ComposeOrchestrator {
    /// Create a new orchestrator
    pub fn new(flavor: ComposeFlavor, compose_file: &Path, working_dir: &Path) -> Self {
        Self {
            flavor,
            docker_bin: DEFAULT_DOCKER_BIN.to_string(),
            standalone_bin: STANDALONE_COMPOSE_BIN.to_string(),
            compose_file: compose_file.to_path_buf(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Use a different Docker CLI binary
    pub fn with_docker_bin(mut self, docker_bin: &str) -> Self {
        self.docker_bin = docker_bin.to_string();
        self
    }

    /// Use a different standalone compose binary
    pub fn with_standalone_bin(mut self, standalone_bin: &str) -> Self {
        self.standalone_bin = standalone_bin.to_string();
        self
    }

    /// Steps of a clean redeploy, in order
    pub fn plan(skip_pull: bool) -> Vec<DeployStep> {
        let mut steps = vec![DeployStep::Down];
        if !skip_pull {
            steps.push(DeployStep::Pull);
        }
        steps.push(DeployStep::Up);
        steps
    }

    /// Command line for a step
    pub fn command(&self, step: DeployStep) -> CommandSpec {
        self.flavor
            .base_command(&self.docker_bin, &self.standalone_bin)
            .arg("-f")
            .arg(self.compose_file.to_string_lossy())
            .args(step.args().iter().copied())
            .current_dir(&self.working_dir)
    }

    /// Run a single step
    pub async fn run_step(&self, step: DeployStep) -> Result<()> {
        tracing::info!(step = %step, file = %self.compose_file.display(), "Compose step");
        command::run(&self.command(step)).await
    }

    /// Bring the stack down, refresh images, and bring it back up.
    ///
    /// Steps run one after another; the first failure aborts the rest.
    pub async fn redeploy(&self, skip_pull: bool) -> Result<()> {
        tracing::info!(flavor = %self.flavor, "Redeploying stack");

        for step in Self::plan(skip_pull) {
            self.run_step(step).await?;
        }

        tracing::info!("Stack is up");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan() {
        assert_eq!(
            ComposeOrchestrator::plan(false),
            vec![DeployStep::Down, DeployStep::Pull, DeployStep::Up]
        );
        assert_eq!(
            ComposeOrchestrator::plan(true),
            vec![DeployStep::Down, DeployStep::Up]
        );
    }

    #[test]
    fn test_plugin_command() {
        let orchestrator = ComposeOrchestrator::new(
            ComposeFlavor::Plugin,
            Path::new("/srv/app/docker-compose.traefik.yml"),
            Path::new("/srv/app"),
        );

        let cmd = orchestrator.command(DeployStep::Up);
        assert_eq!(
            cmd.to_string(),
            "docker compose -f /srv/app/docker-compose.traefik.yml up -d"
        );
        assert_eq!(cmd.current_dir.as_deref(), Some(Path::new("/srv/app")));
    }

    #[test]
    fn test_standalone_command() {
        let orchestrator = ComposeOrchestrator::new(
            ComposeFlavor::Standalone,
            Path::new("stack.yml"),
            Path::new("."),
        );

        assert_eq!(
            orchestrator.command(DeployStep::Down).to_string(),
            "docker-compose -f stack.yml down"
        );

        let orchestrator = orchestrator
            .with_docker_bin("/usr/bin/docker")
            .with_standalone_bin("/opt/compose/docker-compose");
        assert_eq!(
            orchestrator.command(DeployStep::Pull).to_string(),
            "/opt/compose/docker-compose -f stack.yml pull"
        );
    }

    #[cfg(unix)]
    mod fake_docker {
        use super::*;
        use crate::error::DeployError;
        use std::os::unix::fs::PermissionsExt;

        /// Writes a fake `docker` that records its arguments and fails on `fail_on`.
        fn fake_docker(dir: &Path, fail_on: &str) -> PathBuf {
            let bin = dir.join("docker");
            let script = format!(
                "#!/bin/sh\necho \"$@\" >> \"{log}\"\nfor a in \"$@\"; do\n  if [ \"$a\" = \"{fail}\" ]; then echo \"$a failed\" >&2; exit 17; fi\ndone\nexit 0\n",
                log = dir.join("calls.log").display(),
                fail = fail_on,
            );
            std::fs::write(&bin, script).unwrap();
            std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
            bin
        }

        fn calls(dir: &Path) -> Vec<String> {
            std::fs::read_to_string(dir.join("calls.log"))
                .unwrap_or_default()
                .lines()
                .map(|l| l.to_string())
                .collect()
        }

        #[tokio::test]
        async fn test_redeploy_runs_steps_in_order() {
            let dir = tempfile::tempdir().unwrap();
            let bin = fake_docker(dir.path(), "never");
            let orchestrator =
                ComposeOrchestrator::new(ComposeFlavor::Plugin, Path::new("out.yml"), dir.path())
                    .with_docker_bin(bin.to_str().unwrap());

            orchestrator.redeploy(false).await.unwrap();

            assert_eq!(
                calls(dir.path()),
                vec![
                    "compose -f out.yml down",
                    "compose -f out.yml pull",
                    "compose -f out.yml up -d",
                ]
            );
        }

        #[tokio::test]
        async fn test_redeploy_stops_at_failure() {
            let dir = tempfile::tempdir().unwrap();
            let bin = fake_docker(dir.path(), "pull");
            let orchestrator =
                ComposeOrchestrator::new(ComposeFlavor::Plugin, Path::new("out.yml"), dir.path())
                    .with_docker_bin(bin.to_str().unwrap());

            let err = orchestrator.redeploy(false).await.unwrap_err();

            match err {
                DeployError::ExternalCommandFailed { status, output, .. } => {
                    assert_eq!(status, "exit code 17");
                    assert_eq!(output, "pull failed");
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(
                calls(dir.path()),
                vec!["compose -f out.yml down", "compose -f out.yml pull"]
            );
        }
    }
}
