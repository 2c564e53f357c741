// src/transaction/executor.rs

//! Executor interface and package database lock cleanup

use super::order::OrderedTransaction;
use crate::db::models::PackageKey;
use crate::error::Result;
use crate::progress::RunObserver;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Everything an executor needs besides the transaction itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Root of the filesystem being populated
    pub root: PathBuf,
    /// Transient package-manager configuration of this session
    pub config_path: PathBuf,
    /// Variables to set for package scriptlets
    pub env: Vec<(String, String)>,
    /// Verified local file of every transaction member
    pub package_files: BTreeMap<PackageKey, PathBuf>,
}

impl ExecutionContext {
    pub fn new(root: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config_path: config_path.into(),
            env: vec![
                ("HOME".to_string(), "/".to_string()),
                ("LD_PRELOAD".to_string(), String::new()),
            ],
            package_files: BTreeMap::new(),
        }
    }

    pub fn with_package_files(mut self, files: BTreeMap<PackageKey, PathBuf>) -> Self {
        self.package_files = files;
        self
    }

    pub fn package_file(&self, key: &PackageKey) -> Option<&Path> {
        self.package_files.get(key).map(PathBuf::as_path)
    }
}

/// Result of applying one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutcome {
    pub key: PackageKey,
    pub success: bool,
    pub message: Option<String>,
}

impl PackageOutcome {
    pub fn installed(key: PackageKey) -> Self {
        Self {
            key,
            success: true,
            message: None,
        }
    }

    pub fn failed(key: PackageKey, message: impl Into<String>) -> Self {
        Self {
            key,
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Per-package outcomes plus the aggregate result code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub outcomes: Vec<PackageOutcome>,
    /// Zero when every package was applied
    pub return_code: i32,
}

/// Applies an ordered transaction to the target root
///
/// Implementations report progress through
/// [`RunObserver::install_progress`]. A package that fails to apply is a
/// failed outcome with a non-zero `return_code`, not an `Err`.
pub trait Executor {
    fn execute(
        &self,
        context: &ExecutionContext,
        transaction: &OrderedTransaction,
        observer: &mut dyn RunObserver,
    ) -> Result<ExecutionReport>;
}

/// Remove stale Berkeley DB environment files under `<root>/var/lib/rpm`
///
/// Returns the number of files removed. Failures are logged, never raised.
pub fn cleanup_rpmdb_locks(root: &Path) -> usize {
    let pattern = root.join("var/lib/rpm/__db*");
    let entries = match glob::glob(&pattern.to_string_lossy()) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Invalid rpmdb lock pattern {}: {}", pattern.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for path in entries.flatten() {
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed stale rpmdb file {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
    removed
}

/// Runs [`cleanup_rpmdb_locks`] when dropped
///
/// Held across execution so the cleanup also happens when the run fails.
#[derive(Debug)]
pub struct LockCleanup {
    root: PathBuf,
}

impl LockCleanup {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Drop for LockCleanup {
    fn drop(&mut self) {
        cleanup_rpmdb_locks(&self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_locks(root: &Path) -> PathBuf {
        let rpmdb = root.join("var/lib/rpm");
        fs::create_dir_all(&rpmdb).unwrap();
        fs::write(rpmdb.join("__db.001"), b"").unwrap();
        fs::write(rpmdb.join("__db.002"), b"").unwrap();
        fs::write(rpmdb.join("Packages"), b"keep").unwrap();
        rpmdb
    }

    #[test]
    fn test_cleanup_removes_only_db_environment() {
        let dir = tempfile::tempdir().unwrap();
        let rpmdb = seed_locks(dir.path());

        assert_eq!(cleanup_rpmdb_locks(dir.path()), 2);
        assert!(!rpmdb.join("__db.001").exists());
        assert!(rpmdb.join("Packages").exists());
        assert_eq!(cleanup_rpmdb_locks(dir.path()), 0);
    }

    #[test]
    fn test_guard_cleans_up_on_error_path() {
        let dir = tempfile::tempdir().unwrap();
        let rpmdb = seed_locks(dir.path());

        let run = || -> Result<()> {
            let _guard = LockCleanup::new(dir.path());
            Err(crate::Error::Install("scriptlet failed".to_string()))
        };
        assert!(run().is_err());
        assert!(!rpmdb.join("__db.002").exists());
    }

    #[test]
    fn test_context_environment() {
        let ctx = ExecutionContext::new("/mnt/root", "/var/cache/pkgmgr.conf-x");
        assert!(ctx.env.contains(&("HOME".to_string(), "/".to_string())));
        assert!(ctx.env.contains(&("LD_PRELOAD".to_string(), String::new())));
    }
}
