//! Docker Compose file loading and writing

use crate::error::{DeployError, Result};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Default compose file names, tried in order
pub const DEFAULT_COMPOSE_FILES: &[&str] = &["docker-compose.yml", "docker-compose.yaml"];

/// File the routed document is written to
pub const DEFAULT_OUTPUT_FILE: &str = "docker-compose.traefik.yml";

/// Compose file parser
pub struct ComposeParser;

impl ComposeParser {
    /// Find compose file in directory
    pub fn find_compose_file(dir: &Path) -> Option<PathBuf> {
        DEFAULT_COMPOSE_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Locate the input file, either the explicit one or the first default
    /// name present in `dir`.
    pub fn locate(dir: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                dir.join(path)
            };
            return if path.is_file() {
                Ok(path)
            } else {
                Err(DeployError::FileNotFound(vec![path]))
            };
        }

        Self::find_compose_file(dir).ok_or_else(|| {
            DeployError::FileNotFound(
                DEFAULT_COMPOSE_FILES.iter().map(|name| dir.join(name)).collect(),
            )
        })
    }

    /// Parse compose file from path
    pub fn parse_file(path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployError::ComposeParse(format!("Failed to read {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "Loaded compose file");

        Self::parse_str(&content)
    }

    /// Parse compose document from string
    pub fn parse_str(content: &str) -> Result<Value> {
        serde_yaml::from_str(content)
            .map_err(|e| DeployError::ComposeParse(format!("Failed to parse YAML: {}", e)))
    }

    /// Serialize a document to YAML.
    ///
    /// Keys keep their insertion order and collections are emitted in block
    /// style.
    pub fn serialize(doc: &Value) -> Result<String> {
        Ok(serde_yaml::to_string(doc)?)
    }

    /// Write a document to `path`.
    ///
    /// The YAML is written to a sibling temporary file first and renamed
    /// into place, so `path` is either untouched or complete.
    pub fn write_file(path: &Path, doc: &Value) -> Result<()> {
        let content = Self::serialize(doc)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_OUTPUT_FILE.to_string());
        let tmp = path.with_file_name(format!(".{}.tmp", file_name));

        std::fs::write(&tmp, content)?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::info!(path = %path.display(), "Wrote routed compose file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_find_prefers_yml() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("docker-compose.yaml"), "services: {}\n").unwrap();
        std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();

        let found = ComposeParser::find_compose_file(dir.path()).unwrap();
        assert_eq!(found, dir.path().join("docker-compose.yml"));
    }

    #[test]
    fn test_find_falls_back_to_yaml() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("docker-compose.yaml"), "services: {}\n").unwrap();

        let found = ComposeParser::locate(dir.path(), None).unwrap();
        assert_eq!(found, dir.path().join("docker-compose.yaml"));
    }

    #[test]
    fn test_locate_missing() {
        let dir = tempdir().unwrap();

        match ComposeParser::locate(dir.path(), None) {
            Err(DeployError::FileNotFound(tried)) => {
                assert_eq!(
                    tried,
                    vec![
                        dir.path().join("docker-compose.yml"),
                        dir.path().join("docker-compose.yaml"),
                    ]
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_locate_explicit_relative() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("stack.yml"), "services: {}\n").unwrap();

        let found = ComposeParser::locate(dir.path(), Some(Path::new("stack.yml"))).unwrap();
        assert_eq!(found, dir.path().join("stack.yml"));

        let missing = ComposeParser::locate(dir.path(), Some(Path::new("nope.yml")));
        assert!(matches!(missing, Err(DeployError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = ComposeParser::parse_str("services: [unclosed");
        assert!(matches!(result, Err(DeployError::ComposeParse(_))));
    }

    #[test]
    fn test_write_keeps_order_and_block_style() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_OUTPUT_FILE);
        let doc = ComposeParser::parse_str(
            r#"
services:
  zeta:
    image: z
    labels: ["a=1", "b=2"]
  alpha:
    image: a
"#,
        )
        .unwrap();

        ComposeParser::write_file(&path, &doc).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();

        assert!(written.find("zeta").unwrap() < written.find("alpha").unwrap());
        assert!(written.contains("  zeta:\n    image: z\n"));
        assert!(!written.contains('['));
        assert!(!dir.path().join(format!(".{}.tmp", DEFAULT_OUTPUT_FILE)).exists());
        assert_eq!(ComposeParser::parse_file(&path).unwrap(), doc);
    }
}
