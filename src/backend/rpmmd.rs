// src/backend/rpmmd.rs

//! rpm-md backend session

use super::{BackendKind, Collaborators, PackageManager, PackageUrl};
use crate::arch::ArchInfo;
use crate::cache::{self, SpaceAccountant};
use crate::config::{RepositoryConfig, SessionConfig};
use crate::db::PackageIndex;
use crate::db::models::PackageKey;
use crate::error::{Error, Lookup, Result};
use crate::repository::{RepositoryRegistry, proxy};
use crate::selector::{GroupMode, LOCAL_REPO_ID, Sack, Selector};
use crate::transaction::{
    self, ExecutionContext, LockCleanup, RunReport, TransactionReport, cleanup_rpmdb_locks,
};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Package-manager state kept inside the install root
const PERSIST_DIR: &str = "var/lib/imgpkg";

const CAUTION: &str = "Caution, do NOT interrupt the installation, else the cleanup cannot finish.";

/// Render the transient package-manager configuration
fn render_config(install_root: &Path, cache_dir: &Path, persist_dir: &Path) -> String {
    format!(
        "[main]\n\
         installroot={}\n\
         cachedir={}\n\
         persistdir={}\n\
         plugins=0\n\
         reposdir=\n\
         sslverify=1\n",
        install_root.display(),
        cache_dir.display(),
        persist_dir.display()
    )
}

/// Session over rpm-md repositories
pub struct RpmMdBackend {
    config: SessionConfig,
    repos: RepositoryRegistry,
    index: PackageIndex,
    selector: Selector,
    collaborators: Collaborators,
    /// Transient configuration file, removed on close
    conf_file: Option<NamedTempFile>,
    report: TransactionReport,
}

impl RpmMdBackend {
    /// Set up a session: cache directory, transient configuration, empty
    /// package index
    pub fn new(config: SessionConfig, collaborators: Collaborators) -> Result<Self> {
        fs::create_dir_all(&config.cache_dir)?;

        let arch = ArchInfo::for_target(config.target_arch.as_deref());
        let persist_dir = config.install_root.join(PERSIST_DIR);
        info!(
            "Setting up {} session for {} in {}",
            BackendKind::RpmMd,
            arch.canon_arch(),
            config.install_root.display()
        );

        let mut conf_file = tempfile::Builder::new()
            .prefix("pkgmgr.conf-")
            .tempfile_in(&config.cache_dir)?;
        conf_file.write_all(
            render_config(&config.install_root, &config.cache_dir, &persist_dir).as_bytes(),
        )?;
        conf_file.flush()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(conf_file.path(), fs::Permissions::from_mode(0o644))?;
        }
        debug!("Wrote session configuration {}", conf_file.path().display());

        cleanup_rpmdb_locks(&config.install_root);

        Ok(Self {
            repos: RepositoryRegistry::new(arch, &config.cache_dir, persist_dir),
            index: PackageIndex::in_memory()?,
            selector: Selector::new(),
            collaborators,
            conf_file: Some(conf_file),
            report: TransactionReport::new(),
            config,
        })
    }

    /// Path of the transient configuration file while the session is open
    pub fn config_path(&self) -> Option<&Path> {
        self.conf_file.as_ref().map(NamedTempFile::path)
    }

    pub fn repositories(&self) -> &RepositoryRegistry {
        &self.repos
    }

    pub fn index(&self) -> &PackageIndex {
        &self.index
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    fn sack(&self) -> Sack<'_> {
        Sack::new(&self.index, &self.repos)
    }

    fn install(&mut self, conf_path: PathBuf) -> Result<RunReport> {
        let pulled = self.selector.transaction_mut().apply_conditionals();
        if !pulled.is_empty() {
            debug!("{} conditional packages selected", pulled.len());
        }

        let members = transaction::build(
            self.collaborators.resolver.as_ref(),
            self.selector.transaction(),
            &self.index,
        )?;
        self.selector
            .verify_checklist(members.iter().map(|m| m.package.name.as_str()))?;

        let packages: Vec<_> = members.iter().map(|m| m.package.clone()).collect();
        let accountant = SpaceAccountant::new(
            self.collaborators.probe.as_ref(),
            &self.config.cache_dir,
            self.config.install_size_limit,
        );
        let mut plan = accountant.account(&packages, &self.repos, self.collaborators.observer.as_mut())?;
        cache::download_missing(
            &mut plan,
            &self.repos,
            self.collaborators.fetcher.as_ref(),
            self.collaborators.observer.as_mut(),
        )?;

        let unmet = transaction::check_dependencies(&members);
        let ordered = transaction::order(members)?;

        let files: BTreeMap<PackageKey, PathBuf> = plan
            .entries
            .iter()
            .map(|e| (e.key(), e.path.clone()))
            .collect();
        let context = ExecutionContext::new(&self.config.install_root, conf_path).with_package_files(files);

        self.collaborators.observer.warning(CAUTION);
        let execution = self.collaborators.executor.execute(
            &context,
            &ordered,
            self.collaborators.observer.as_mut(),
        )?;
        self.report.record(&ordered, &execution);

        let failed: Vec<PackageKey> = execution
            .outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.key.clone())
            .collect();

        if execution.return_code != 0 {
            let message = format!(
                "{} of {} packages failed (return code {})",
                failed.len(),
                ordered.len(),
                execution.return_code
            );
            if self.config.strict_mode {
                return Err(Error::Install(message));
            }
            warn!("Installation finished with errors: {}", message);
        }

        Ok(RunReport {
            cache: plan.summary,
            installed: ordered.keys(),
            failed,
            unmet_dependencies: unmet.iter().map(ToString::to_string).collect(),
            return_code: execution.return_code,
        })
    }
}

impl PackageManager for RpmMdBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::RpmMd
    }

    fn add_repository(&mut self, config: &RepositoryConfig) -> Result<()> {
        self.repos.add_repository(config)?;
        Ok(())
    }

    fn load_metadata(&mut self) -> Result<usize> {
        self.repos
            .load_metadata(self.collaborators.fetcher.as_ref(), &mut self.index)
    }

    fn select_package(&mut self, pattern: &str) -> Result<Lookup<Vec<PackageKey>>> {
        let sack = Sack::new(&self.index, &self.repos);
        self.selector.select_package(sack, pattern)
    }

    fn deselect_package(&mut self, pattern: &str) -> Result<Lookup<Vec<PackageKey>>> {
        let sack = Sack::new(&self.index, &self.repos);
        self.selector.deselect_package(sack, pattern)
    }

    fn select_group(&mut self, group: &str, mode: GroupMode) -> Result<Lookup<Vec<PackageKey>>> {
        let sack = Sack::new(&self.index, &self.repos);
        self.selector.select_group(sack, group, mode)
    }

    fn check_package(&mut self, name: &str) {
        self.selector.check_package(name);
    }

    fn install_local(&mut self, path: &Path) -> Result<PackageKey> {
        self.selector.install_local(&mut self.index, &self.repos, path)
    }

    fn install_has_file(&self, path: &str) -> bool {
        self.selector.install_has_file(path)
    }

    fn run_install(&mut self) -> Result<RunReport> {
        let conf_path = self
            .config_path()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::InitError("Session is already closed".to_string()))?;

        let _cleanup = LockCleanup::new(&self.config.install_root);
        self.install(conf_path)
    }

    fn all_content(&self) -> &BTreeMap<String, Vec<String>> {
        self.report.content()
    }

    fn packages_license(&self) -> &BTreeMap<String, Vec<String>> {
        self.report.licenses()
    }

    fn vcs_info(&self) -> &BTreeMap<String, Option<String>> {
        self.report.vcs()
    }

    fn file_list(&self, name: &str) -> Option<Vec<String>> {
        if name.is_empty() {
            return None;
        }
        self.report.file_list(name).map(<[String]>::to_vec)
    }

    fn package_url(&self, name: &str) -> Result<Option<PackageUrl>> {
        let Some(pkg) = self
            .sack()
            .best_candidates(name)?
            .into_iter()
            .find(|p| p.name == name && p.repo_id != LOCAL_REPO_ID)
        else {
            return Ok(None);
        };

        let Some(repo) = self.repos.get(&pkg.repo_id) else {
            return Ok(None);
        };
        let Some(url) = repo.package_url(&pkg.location) else {
            return Ok(None);
        };

        let proxies = repo.proxy_settings(&url).map(|settings| {
            BTreeMap::from([(proxy::url_scheme(&url).to_string(), settings.url)])
        });
        Ok(Some(PackageUrl { url, proxies }))
    }

    fn close(&mut self) {
        self.repos.close();
        if let Some(conf) = self.conf_file.take() {
            let path = conf.path().to_path_buf();
            if let Err(e) = conf.close() {
                debug!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

impl Drop for RpmMdBackend {
    fn drop(&mut self) {
        self.close();
    }
}
