// src/backend/mod.rs

//! Package-manager backends
//!
//! A backend is one package-manager family behind the [`PackageManager`]
//! interface. The family is chosen by [`SessionConfig::backend`] and
//! instantiated through [`create`].

mod rpmmd;

pub use rpmmd::RpmMdBackend;

use crate::cache::{CapacityProbe, FsCapacityProbe};
use crate::config::{RepositoryConfig, SessionConfig};
use crate::db::models::PackageKey;
use crate::error::{Error, Lookup, Result};
use crate::progress::{LogObserver, RunObserver};
use crate::repository::{Fetcher, HttpFetcher};
use crate::selector::GroupMode;
use crate::transaction::{Executor, PassthroughResolver, Resolver, RunReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported package-manager families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// rpm-md repositories installed with rpm
    #[default]
    #[serde(rename = "rpm-md", alias = "yum")]
    RpmMd,
}

impl BackendKind {
    pub fn as_str(&self) -> &str {
        match self {
            BackendKind::RpmMd => "rpm-md",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "rpm-md" | "rpmmd" | "yum" => Ok(BackendKind::RpmMd),
            _ => Err(Error::Configuration(format!("Unknown backend: {}", s))),
        }
    }
}

/// Remote location of an available package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUrl {
    pub url: String,
    /// URL scheme → proxy, when a proxy applies
    pub proxies: Option<BTreeMap<String, String>>,
}

/// External collaborators of a session
pub struct Collaborators {
    pub fetcher: Box<dyn Fetcher>,
    pub resolver: Box<dyn Resolver>,
    pub executor: Box<dyn Executor>,
    pub probe: Box<dyn CapacityProbe>,
    pub observer: Box<dyn RunObserver>,
}

impl Collaborators {
    /// Default collaborators around the given executor
    ///
    /// Downloads over HTTP, accepts the selection unchanged, probes the
    /// cache filesystem and logs run events.
    pub fn new(executor: Box<dyn Executor>) -> Self {
        Self {
            fetcher: Box::new(HttpFetcher::default()),
            resolver: Box::new(PassthroughResolver),
            executor,
            probe: Box::new(FsCapacityProbe),
            observer: Box::new(LogObserver::new()),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_resolver(mut self, resolver: Box<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_probe(mut self, probe: Box<dyn CapacityProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// One package-manager session
///
/// Selection calls return [`Lookup::NotFound`] for patterns that match
/// nothing; `Err` always means the session cannot continue.
pub trait PackageManager {
    /// Backend family of this session
    fn kind(&self) -> BackendKind;

    /// Register a repository
    fn add_repository(&mut self, config: &RepositoryConfig) -> Result<()>;

    /// Fetch metadata of every enabled repository into the package index
    fn load_metadata(&mut self) -> Result<usize>;

    fn select_package(&mut self, pattern: &str) -> Result<Lookup<Vec<PackageKey>>>;

    fn deselect_package(&mut self, pattern: &str) -> Result<Lookup<Vec<PackageKey>>>;

    fn select_group(&mut self, group: &str, mode: GroupMode) -> Result<Lookup<Vec<PackageKey>>>;

    /// Require `name` to be part of the final transaction
    fn check_package(&mut self, name: &str);

    /// Add a package file from local disk
    fn install_local(&mut self, path: &Path) -> Result<PackageKey>;

    /// Whether a selected package ships `path`
    fn install_has_file(&self, path: &str) -> bool;

    /// Build, download, order and execute the transaction
    fn run_install(&mut self) -> Result<RunReport>;

    /// Package key → file manifest of installed packages
    fn all_content(&self) -> &BTreeMap<String, Vec<String>>;

    /// License → package keys of installed packages
    fn packages_license(&self) -> &BTreeMap<String, Vec<String>>;

    /// Package key → VCS reference of installed packages
    fn vcs_info(&self) -> &BTreeMap<String, Option<String>>;

    /// File manifest of an installed package, by name
    fn file_list(&self, name: &str) -> Option<Vec<String>>;

    /// Download URL (and proxy) of the best available package `name`
    fn package_url(&self, name: &str) -> Result<Option<PackageUrl>>;

    /// Release temporary files and metadata directories
    fn close(&mut self);
}

/// Create the session for `config.backend`
pub fn create(config: SessionConfig, collaborators: Collaborators) -> Result<Box<dyn PackageManager>> {
    match config.backend {
        BackendKind::RpmMd => Ok(Box::new(RpmMdBackend::new(config, collaborators)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("yum".parse::<BackendKind>().unwrap(), BackendKind::RpmMd);
        assert_eq!("RPM-MD".parse::<BackendKind>().unwrap(), BackendKind::RpmMd);
        assert!(matches!(
            "zypp".parse::<BackendKind>(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_backend_kind_serde_names() {
        let kind: BackendKind = serde_json::from_str("\"yum\"").unwrap();
        assert_eq!(kind, BackendKind::RpmMd);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"rpm-md\"");
    }
}
