//! Configuration loading.
//!
//! The core only needs a `fetch(location)` capability; `FileConfigSource`
//! provides it from local disk. Other stores plug in through `ConfigSource`.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::schema::Configuration;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Document encodings understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML, everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Parse and validate a configuration document.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<Configuration, ConfigError> {
    let config: Configuration = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a JSON or TOML file.
pub fn load_config(path: &Path) -> Result<Configuration, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, ConfigFormat::from_path(path))
}

/// Supplies a fresh configuration for each invocation.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch the document stored at `location`.
    async fn fetch(&self, location: &str) -> Result<Configuration, ConfigError>;
}

/// Reads configuration documents from a directory on disk.
///
/// `location` is resolved relative to `root`, mirroring a bucket/key pair.
#[derive(Debug, Clone, Default)]
pub struct FileConfigSource {
    root: Option<PathBuf>,
}

impl FileConfigSource {
    /// Resolve locations relative to the working directory.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Resolve locations relative to `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Read the document at `path` as given, without going through a
    /// string location.
    pub async fn fetch_path(&self, path: &Path) -> Result<Configuration, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config = parse_config(&content, ConfigFormat::from_path(path))?;
        tracing::debug!(
            path = %path.display(),
            groups = config.groups.len(),
            "Configuration fetched"
        );
        Ok(config)
    }

    fn resolve(&self, location: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(location),
            None => PathBuf::from(location),
        }
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn fetch(&self, location: &str) -> Result<Configuration, ConfigError> {
        self.fetch_path(&self.resolve(location)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JSON_DOC: &str = r#"{
        "groups": {
            "east": {
                "devices": [{"fw1": {"addresses": [{"test": "tcp_ping", "ip": "10.0.0.1", "port": 22}]}}]
            }
        }
    }"#;

    const TOML_DOC: &str = r#"
        [probe]
        timeout-secs = 5

        [groups.east]
        failover-mode = "all"

        [[groups.east.devices]]
        [groups.east.devices.fw1]
        addresses = [{ test = "http_ping", url = "http://10.0.0.1/" }]
    "#;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a/config.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("config.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Json);
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(JSON_DOC.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.groups["east"].devices[0].name, "fw1");
    }

    #[test]
    fn test_parse_toml_document() {
        let config = parse_config(TOML_DOC, ConfigFormat::Toml).unwrap();
        assert_eq!(config.probe.timeout_secs, 5);
        let east = &config.groups["east"];
        assert_eq!(east.devices[0].name, "fw1");
        assert_eq!(east.devices[0].addresses[0].url.as_deref(), Some("http://10.0.0.1/"));
    }

    #[test]
    fn test_validation_errors_surface() {
        let doc = r#"{"groups": {"east": {"peer-group": "west"}}}"#;
        let err = parse_config(doc, ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("unknown peer group 'west'"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_fetch_path_keeps_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OsStr::from_bytes(b"ha-\xff.json"));
        fs::write(&path, JSON_DOC).unwrap();

        let config = FileConfigSource::new().fetch_path(&path).await.unwrap();
        assert_eq!(config.groups["east"].devices[0].name, "fw1");

        let lossy = path.to_string_lossy().into_owned();
        assert!(FileConfigSource::new().fetch(&lossy).await.is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/cloud-ha.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[tokio::test]
    async fn test_file_source_resolves_against_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), JSON_DOC).unwrap();

        let source = FileConfigSource::with_root(dir.path());
        let config = source.fetch("config.json").await.unwrap();
        assert!(config.groups.contains_key("east"));

        assert!(source.fetch("missing.json").await.is_err());
    }
}
