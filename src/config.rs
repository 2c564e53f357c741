// src/config.rs

//! Session and repository configuration
//!
//! Every recognized option is an explicit field with a default; unknown
//! keys are rejected when a configuration is deserialized.

use crate::backend::BackendKind;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

/// Configuration for one package-manager session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Package-manager family
    #[serde(default)]
    pub backend: BackendKind,

    /// Target architecture (host architecture if omitted)
    #[serde(default)]
    pub target_arch: Option<String>,

    /// Root of the filesystem being populated
    pub install_root: PathBuf,

    /// Directory holding downloaded packages and session scratch files
    pub cache_dir: PathBuf,

    /// Fail the run when the executor reports a non-zero result
    #[serde(default)]
    pub strict_mode: bool,

    /// Optional ceiling on the total installed size in bytes
    #[serde(default)]
    pub install_size_limit: Option<u64>,
}

impl SessionConfig {
    pub fn new(install_root: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::default(),
            target_arch: None,
            install_root: install_root.into(),
            cache_dir: cache_dir.into(),
            strict_mode: false,
            install_size_limit: None,
        }
    }

    /// Load a session configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a session configuration from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Configuration(format!("Invalid session configuration: {}", e)))
    }
}

/// Definition of one repository as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Repository identifier
    pub name: String,

    /// Base URL template (`$basearch`/`$arch` allowed)
    #[serde(default)]
    pub baseurl: Option<String>,

    /// Mirror list URL template
    #[serde(default)]
    pub mirrorlist: Option<String>,

    /// Explicit proxy URL; the environment is consulted when absent
    #[serde(default)]
    pub proxy: Option<String>,

    #[serde(default)]
    pub proxy_username: Option<String>,

    #[serde(default)]
    pub proxy_password: Option<String>,

    /// Only packages matching one of these globs are indexed
    #[serde(default)]
    pub includepkgs: Vec<String>,

    /// Packages matching any of these globs are never indexed
    #[serde(default)]
    pub excludepkgs: Vec<String>,

    /// Verify the server's TLS certificate
    #[serde(default = "default_true")]
    pub ssl_verify: bool,

    /// Never reuse cached package files from this repository
    #[serde(default)]
    pub nocache: bool,

    /// Relative cost; cheaper repositories win ties
    #[serde(default)]
    pub cost: Option<u32>,

    /// Priority; lower values win ties
    #[serde(default)]
    pub priority: Option<u32>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            baseurl: None,
            mirrorlist: None,
            proxy: None,
            proxy_username: None,
            proxy_password: None,
            includepkgs: Vec::new(),
            excludepkgs: Vec::new(),
            ssl_verify: true,
            nocache: false,
            cost: None,
            priority: None,
            enabled: true,
        }
    }
}

impl RepositoryConfig {
    /// Repository with a base URL and default options
    pub fn with_baseurl(name: impl Into<String>, baseurl: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            baseurl: Some(baseurl.into()),
            ..Default::default()
        }
    }

    /// Repository with a mirror list and default options
    pub fn with_mirrorlist(name: impl Into<String>, mirrorlist: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mirrorlist: Some(mirrorlist.into()),
            ..Default::default()
        }
    }

    /// Parse a repository definition from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            Error::Configuration(format!("Invalid repository configuration: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::from_json(
            r#"{"install_root": "/mnt/image", "cache_dir": "/var/tmp/cache"}"#,
        )
        .unwrap();

        assert_eq!(config.backend, BackendKind::RpmMd);
        assert_eq!(config.install_root, PathBuf::from("/mnt/image"));
        assert!(!config.strict_mode);
        assert!(config.install_size_limit.is_none());
        assert!(config.target_arch.is_none());
    }

    #[test]
    fn test_session_config_rejects_unknown_keys() {
        let result = SessionConfig::from_json(
            r#"{"install_root": "/mnt", "cache_dir": "/tmp", "debuginfo": true}"#,
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_repository_config_defaults() {
        let repo = RepositoryConfig::from_json(
            r#"{"name": "os", "baseurl": "http://example.com/$basearch/"}"#,
        )
        .unwrap();

        assert!(repo.ssl_verify);
        assert!(repo.enabled);
        assert!(!repo.nocache);
        assert!(repo.includepkgs.is_empty());
        assert_eq!(repo, RepositoryConfig::with_baseurl("os", "http://example.com/$basearch/"));
    }

    #[test]
    fn test_repository_config_struct_update_defaults() {
        let repo = RepositoryConfig {
            name: "x".to_string(),
            baseurl: Some("https://example.com/x/".to_string()),
            ..Default::default()
        };
        assert!(repo.ssl_verify);
        assert!(repo.enabled);

        let parsed = RepositoryConfig::from_json(r#"{"name": "x"}"#).unwrap();
        assert_eq!(parsed, RepositoryConfig {
            name: "x".to_string(),
            ..Default::default()
        });
    }

    #[test]
    fn test_repository_config_rejects_unknown_keys() {
        let result = RepositoryConfig::from_json(
            r#"{"name": "os", "baseurl": "http://x/", "gpgkey": "file:///key"}"#,
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_session_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{"backend": "yum", "install_root": "/mnt", "cache_dir": "/tmp/c",
                "strict_mode": true, "install_size_limit": 1048576, "target_arch": "armv7hl"}"#,
        )
        .unwrap();

        let config = SessionConfig::from_file(&path).unwrap();
        assert!(config.strict_mode);
        assert_eq!(config.install_size_limit, Some(1_048_576));
        assert_eq!(config.target_arch.as_deref(), Some("armv7hl"));
    }
}
