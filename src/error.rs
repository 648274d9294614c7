//! Error types for redeploy

use std::path::PathBuf;
use thiserror::Error;

/// Result type for redeploy operations
pub type Result<T> = std::result::Result<T, DeployError>;

/// Redeploy error types
///
/// Every variant is terminal for a run; nothing is retried.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Missing required parameter(s): {}", .0.join(", "))]
    MissingParameter(Vec<String>),

    #[error("Invalid DEPLOYMENT_PORT '{0}': expected an integer between 1 and 65535")]
    InvalidPort(String),

    #[error("Compose file not found (tried: {})", display_paths(.0))]
    FileNotFound(Vec<PathBuf>),

    #[error("Compose file has no services to route")]
    NoServices,

    #[error("Compose file parse error: {0}")]
    ComposeParse(String),

    #[error("Docker unavailable: {0}")]
    DockerUnavailable(String),

    #[error("Command `{command}` failed ({status}):\n{output}")]
    ExternalCommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_lists_every_key() {
        let err = DeployError::MissingParameter(vec![
            "DEPLOYMENT_NAME".to_string(),
            "DEPLOYMENT_DOMAIN".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Missing required parameter(s): DEPLOYMENT_NAME, DEPLOYMENT_DOMAIN"
        );
    }

    #[test]
    fn test_file_not_found_lists_candidates() {
        let err = DeployError::FileNotFound(vec![
            PathBuf::from("docker-compose.yml"),
            PathBuf::from("docker-compose.yaml"),
        ]);
        assert!(err.to_string().contains("docker-compose.yml, docker-compose.yaml"));
    }
}
