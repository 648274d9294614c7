//! Run configuration

use crate::compose::parser::DEFAULT_OUTPUT_FILE;
use crate::docker::probe::{ComposeFlavor, DEFAULT_DOCKER_BIN, STANDALONE_COMPOSE_BIN};
use crate::error::{DeployError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Settings for one redeploy run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory holding the compose file; compose runs here
    pub working_dir: PathBuf,
    /// Explicit input file, relative to `working_dir` unless absolute
    pub compose_file: Option<PathBuf>,
    /// Output file, relative to `working_dir` unless absolute
    pub output: PathBuf,
    /// Compose flavor, detected when unset
    pub flavor: Option<ComposeFlavor>,
    /// Docker CLI binary, used for checks and the plugin flavor
    pub docker_bin: String,
    /// Compose binary for the standalone flavor
    pub standalone_bin: String,
    /// Write the routed file but do not touch Docker
    pub dry_run: bool,
    /// Skip `pull` during the redeploy
    pub skip_pull: bool,
}

impl RunConfig {
    /// Defaults for a run in `working_dir`
    pub fn new(working_dir: &Path) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
            compose_file: None,
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            flavor: None,
            docker_bin: DEFAULT_DOCKER_BIN.to_string(),
            standalone_bin: STANDALONE_COMPOSE_BIN.to_string(),
            dry_run: false,
            skip_pull: false,
        }
    }

    /// Copy of this config with `working_dir` made absolute.
    ///
    /// Compose runs inside `working_dir`, so every path handed to it must
    /// not depend on the caller's current directory.
    pub fn resolved(&self) -> Result<Self> {
        let working_dir = std::fs::canonicalize(&self.working_dir).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DeployError::FileNotFound(vec![self.working_dir.clone()]),
            _ => DeployError::Io(e),
        })?;

        Ok(Self {
            working_dir,
            ..self.clone()
        })
    }

    /// Resolved path of the output file
    pub fn output_path(&self) -> PathBuf {
        if self.output.is_absolute() {
            self.output.clone()
        } else {
            self.working_dir.join(&self.output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let mut config = RunConfig::new(Path::new("/srv/app"));
        assert_eq!(
            config.output_path(),
            PathBuf::from("/srv/app/docker-compose.traefik.yml")
        );

        config.output = PathBuf::from("/tmp/routed.yml");
        assert_eq!(config.output_path(), PathBuf::from("/tmp/routed.yml"));
    }

    #[test]
    fn test_resolved_makes_working_dir_absolute() {
        let dir = tempfile::tempdir_in(".").unwrap();
        // The directory sits directly in the current directory.
        let relative = Path::new(dir.path().file_name().unwrap());

        let config = RunConfig::new(relative).resolved().unwrap();

        assert!(config.working_dir.is_absolute());
        assert_eq!(config.working_dir, std::fs::canonicalize(dir.path()).unwrap());
        assert!(config.output_path().is_absolute());
    }

    #[test]
    fn test_resolved_missing_dir() {
        let config = RunConfig::new(Path::new("no-such-project-dir-4821"));

        match config.resolved() {
            Err(DeployError::FileNotFound(tried)) => {
                assert_eq!(tried, vec![PathBuf::from("no-such-project-dir-4821")]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
