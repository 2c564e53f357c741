// src/repository/mod.rs

//! Repository registry and metadata loading
//!
//! This module provides functionality for:
//! - Registering repositories from explicit configuration
//! - Arch-variable substitution in base URL and mirror list templates
//! - Proxy and TLS policy carried on every fetch
//! - Loading rpm-md metadata into the package index

pub mod fetch;
pub mod parsers;
pub mod proxy;

pub use fetch::{ByteRange, FetchRequest, Fetcher, HttpFetcher};
pub use proxy::ProxySettings;

use crate::arch::ArchInfo;
use crate::config::RepositoryConfig;
use crate::db::PackageIndex;
use crate::db::models::CandidatePackage;
use crate::error::{Error, Result};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Cost of a repository that does not set one
pub const DEFAULT_COST: u32 = 1000;

/// Priority of a repository that does not set one
pub const DEFAULT_PRIORITY: u32 = 99;

/// A registered repository
#[derive(Debug)]
pub struct Repository {
    pub id: String,
    /// Base URLs after arch substitution
    pub baseurls: Vec<String>,
    /// Mirror list URL after arch substitution
    pub mirrorlist: Option<String>,
    pub proxy: Option<String>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
    pub includepkgs: Vec<String>,
    pub excludepkgs: Vec<String>,
    pub ssl_verify: bool,
    pub nocache: bool,
    pub cost: u32,
    pub priority: u32,
    pub enabled: bool,
    pub cache_dir: PathBuf,
    /// Downloaded package files of this repository
    pub packages_dir: PathBuf,
    pub persist_dir: PathBuf,
    /// Time of the last metadata load (RFC 3339)
    pub last_sync: Option<String>,
    arch: ArchInfo,
    metadata_dir: Option<TempDir>,
}

impl Repository {
    /// Create a repository from its configuration
    ///
    /// Fails with a configuration error when neither a base URL nor a
    /// mirror list is given.
    pub fn new(
        config: &RepositoryConfig,
        arch: &ArchInfo,
        cache_dir: &Path,
        persist_dir: &Path,
    ) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(Error::Configuration(
                "Repository name must not be empty".to_string(),
            ));
        }

        let baseurl = config.baseurl.as_deref().filter(|u| !u.trim().is_empty());
        let mirrorlist = config.mirrorlist.as_deref().filter(|u| !u.trim().is_empty());
        if baseurl.is_none() && mirrorlist.is_none() {
            return Err(Error::Configuration(format!(
                "Repository '{}' needs a baseurl or a mirrorlist",
                config.name
            )));
        }

        let packages_dir = cache_dir.join("packages").join(&config.name);
        fs::create_dir_all(&packages_dir)?;

        Ok(Self {
            id: config.name.clone(),
            baseurls: baseurl.map(|u| arch.substitute(u)).into_iter().collect(),
            mirrorlist: mirrorlist.map(|u| arch.substitute(u)),
            proxy: config.proxy.clone(),
            proxy_username: config.proxy_username.clone(),
            proxy_password: config.proxy_password.clone(),
            includepkgs: config.includepkgs.clone(),
            excludepkgs: config.excludepkgs.clone(),
            ssl_verify: config.ssl_verify,
            nocache: config.nocache,
            cost: config.cost.unwrap_or(DEFAULT_COST),
            priority: config.priority.unwrap_or(DEFAULT_PRIORITY),
            enabled: config.enabled,
            cache_dir: cache_dir.to_path_buf(),
            packages_dir,
            persist_dir: persist_dir.to_path_buf(),
            last_sync: None,
            arch: arch.clone(),
            metadata_dir: None,
        })
    }

    /// First base URL, once known
    pub fn base_url(&self) -> Option<&str> {
        self.baseurls.first().map(String::as_str)
    }

    /// Proxy for a fetch of `url`: the explicit proxy, else the environment
    pub fn proxy_settings(&self, url: &str) -> Option<ProxySettings> {
        match &self.proxy {
            Some(explicit) => Some(ProxySettings {
                url: explicit.clone(),
                username: self.proxy_username.clone(),
                password: self.proxy_password.clone(),
            }),
            None => proxy::proxy_for(url).map(ProxySettings::new),
        }
    }

    /// Fetch request for `url` carrying this repository's proxy and TLS policy
    pub fn fetch_request(&self, url: &str, dest: impl Into<PathBuf>) -> FetchRequest {
        FetchRequest::new(url, dest)
            .with_proxy(self.proxy_settings(url))
            .with_verify_tls(self.ssl_verify)
    }

    /// Remote URL of a repository-relative location
    pub fn package_url(&self, location: &str) -> Option<String> {
        self.base_url().map(|base| join_url(base, location))
    }

    /// Local cache path for a package of this repository
    pub fn package_path(&self, pkg: &CandidatePackage) -> PathBuf {
        let file_name = Path::new(&pkg.location)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{}.rpm", pkg.key())));
        self.packages_dir.join(file_name)
    }

    /// Whether a package passes the include/exclude filters
    pub fn accepts(&self, pkg: &CandidatePackage) -> bool {
        let names = [
            pkg.name.clone(),
            format!("{}.{}", pkg.name, pkg.arch),
            pkg.key().to_string(),
        ];
        let matches = |patterns: &[String]| {
            patterns.iter().any(|p| match Pattern::new(p) {
                Ok(pattern) => names.iter().any(|n| pattern.matches(n)),
                Err(_) => names.iter().any(|n| n == p),
            })
        };

        if !self.includepkgs.is_empty() && !matches(&self.includepkgs) {
            return false;
        }
        !matches(&self.excludepkgs)
    }

    fn metadata_dir(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.metadata_dir {
            return Ok(dir.path().to_path_buf());
        }
        let dir = tempfile::Builder::new()
            .prefix(&format!("repodata-{}-", self.id))
            .tempdir_in(&self.cache_dir)?;
        let path = dir.path().to_path_buf();
        self.metadata_dir = Some(dir);
        Ok(path)
    }

    /// Fill `baseurls` from the mirror list when no base URL was configured
    fn resolve_mirrorlist(&mut self, fetcher: &dyn Fetcher) -> Result<()> {
        if !self.baseurls.is_empty() {
            return Ok(());
        }
        let Some(mirrorlist) = self.mirrorlist.clone() else {
            return Ok(());
        };

        let dest = self.metadata_dir()?.join("mirrorlist");
        let path = fetcher.fetch(&self.fetch_request(&mirrorlist, dest))?;
        let content = fs::read_to_string(&path)?;

        let mirror = content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .ok_or_else(|| {
                Error::Repo(format!("{}: mirror list {} is empty", self.id, mirrorlist))
            })?;

        debug!("Repository {} using mirror {}", self.id, mirror);
        self.baseurls = vec![self.arch.substitute(mirror)];
        Ok(())
    }

    /// Fetch one metadata file into the metadata directory and decode it
    fn fetch_metadata(&mut self, fetcher: &dyn Fetcher, location: &str) -> Result<String> {
        let base = self
            .base_url()
            .ok_or_else(|| Error::Repo(format!("{}: no base URL", self.id)))?
            .to_string();
        let file_name = Path::new(location)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("metadata.xml"));
        let dest = self.metadata_dir()?.join(file_name);

        let url = join_url(&base, location);
        let path = fetcher.fetch(&self.fetch_request(&url, dest))?;
        let bytes = fs::read(&path)?;
        parsers::decompress(&bytes, location)
    }

    /// Load this repository's metadata into `index`
    ///
    /// Returns the number of packages indexed. Any fetch or parse failure
    /// is a repository error.
    pub fn load_metadata(&mut self, fetcher: &dyn Fetcher, index: &mut PackageIndex) -> Result<usize> {
        self.load_metadata_inner(fetcher, index).map_err(|e| match e {
            Error::Repo(msg) => Error::Repo(msg),
            other => Error::Repo(format!("{}: {}", self.id, other)),
        })
    }

    fn load_metadata_inner(
        &mut self,
        fetcher: &dyn Fetcher,
        index: &mut PackageIndex,
    ) -> Result<usize> {
        info!("Loading metadata for repository {}", self.id);
        self.resolve_mirrorlist(fetcher)?;

        let repomd = parsers::repomd::parse_repomd(
            &self.fetch_metadata(fetcher, "repodata/repomd.xml")?,
        )?;

        let primary = repomd
            .primary()
            .ok_or_else(|| Error::ParseError("repomd.xml lists no primary data".to_string()))?
            .location
            .clone();
        let mut packages = parsers::repomd::parse_primary(
            &self.fetch_metadata(fetcher, &primary)?,
            &self.id,
        )?;

        let total = packages.len();
        packages.retain(|pkg| self.accepts(pkg));
        if packages.len() < total {
            debug!(
                "Repository {}: {} packages filtered by include/exclude",
                self.id,
                total - packages.len()
            );
        }
        let count = index.insert_packages(&mut packages)?;

        if let Some(group) = repomd.group().map(|r| r.location.clone()) {
            let groups = parsers::comps::parse_comps(
                &self.fetch_metadata(fetcher, &group)?,
                &self.id,
            )?;
            for group in &groups {
                index.insert_group(group)?;
            }
            debug!("Repository {}: {} groups", self.id, groups.len());
        }

        self.last_sync = Some(chrono::Utc::now().to_rfc3339());
        info!("Indexed {} packages from repository {}", count, self.id);
        Ok(count)
    }

    /// Release the temporary metadata directory
    ///
    /// Errors are logged and otherwise ignored.
    pub fn close(&mut self) {
        if let Some(dir) = self.metadata_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                debug!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

/// Join a base URL and a relative path with exactly one `/`
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// All repositories registered in one session
#[derive(Debug)]
pub struct RepositoryRegistry {
    arch: ArchInfo,
    cache_dir: PathBuf,
    persist_dir: PathBuf,
    repos: Vec<Repository>,
}

impl RepositoryRegistry {
    pub fn new(arch: ArchInfo, cache_dir: impl Into<PathBuf>, persist_dir: impl Into<PathBuf>) -> Self {
        Self {
            arch,
            cache_dir: cache_dir.into(),
            persist_dir: persist_dir.into(),
            repos: Vec::new(),
        }
    }

    pub fn arch(&self) -> &ArchInfo {
        &self.arch
    }

    /// Register a repository
    pub fn add_repository(&mut self, config: &RepositoryConfig) -> Result<&Repository> {
        if self.get(&config.name).is_some() {
            return Err(Error::Configuration(format!(
                "Repository '{}' is already registered",
                config.name
            )));
        }

        let repo = Repository::new(config, &self.arch, &self.cache_dir, &self.persist_dir)?;
        info!(
            "Added repository: {} ({})",
            repo.id,
            repo.base_url().or(repo.mirrorlist.as_deref()).unwrap_or_default()
        );
        self.repos.push(repo);
        Ok(&self.repos[self.repos.len() - 1])
    }

    pub fn get(&self, id: &str) -> Option<&Repository> {
        self.repos.iter().find(|r| r.id == id)
    }

    pub fn repositories(&self) -> impl Iterator<Item = &Repository> {
        self.repos.iter()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Repository> {
        self.repos.iter().filter(|r| r.enabled)
    }

    /// Load metadata of every enabled repository, in registration order
    pub fn load_metadata(&mut self, fetcher: &dyn Fetcher, index: &mut PackageIndex) -> Result<usize> {
        let mut total = 0;
        for repo in self.repos.iter_mut().filter(|r| r.enabled) {
            total += repo.load_metadata(fetcher, index)?;
        }
        if total == 0 {
            warn!("No packages available from enabled repositories");
        }
        Ok(total)
    }

    /// Tear down every repository
    pub fn close(&mut self) {
        for repo in &mut self.repos {
            repo.close();
        }
    }
}
