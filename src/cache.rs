// src/cache.rs

//! Package cache and space accounting
//!
//! Runs once per transaction, after the package set is final and before
//! any network use:
//! - scans the cache, trusting a cached file only after verification
//! - gates the run on download space (cache filesystem) and install space
//! - reports the cache summary to the run observer
//!
//! Missing packages are then fetched by [`download_missing`].

use crate::db::models::{CandidatePackage, ChecksumType, PackageKey};
use crate::error::{Error, Result, SpaceKind};
use crate::progress::{CacheSummary, RunObserver};
use crate::repository::{Fetcher, RepositoryRegistry};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Filesystem capacity probe: path → available bytes
pub trait CapacityProbe {
    fn available_bytes(&self, path: &Path) -> Result<u64>;
}

/// Capacity probe backed by the filesystem's free-space statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCapacityProbe;

impl CapacityProbe for FsCapacityProbe {
    fn available_bytes(&self, path: &Path) -> Result<u64> {
        Ok(fs2::available_space(path)?)
    }
}

/// Result of checking a package file against its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid,
    SizeMismatch { expected: u64, actual: u64 },
    ChecksumMismatch { expected: String, actual: String },
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid)
    }
}

fn hex_digest<D: Digest + io::Write>(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = D::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

/// Verify a package file's size and checksum
pub fn verify_package(path: &Path, pkg: &CandidatePackage) -> Result<Verification> {
    debug!("Verifying {}", path.display());

    let actual_size = fs::metadata(path)?.len();
    if pkg.package_size > 0 && actual_size != pkg.package_size {
        return Ok(Verification::SizeMismatch {
            expected: pkg.package_size,
            actual: actual_size,
        });
    }

    let actual = match pkg.checksum_type {
        ChecksumType::Sha256 => hex_digest::<Sha256>(path)?,
        ChecksumType::Sha512 => hex_digest::<Sha512>(path)?,
        ChecksumType::Sha1 => hex_digest::<Sha1>(path)?,
        ChecksumType::Md5 => hex_digest::<Md5>(path)?,
    };

    if actual.eq_ignore_ascii_case(&pkg.checksum) {
        Ok(Verification::Valid)
    } else {
        Ok(Verification::ChecksumMismatch {
            expected: pkg.checksum.clone(),
            actual,
        })
    }
}

/// One package of the download set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub package: CandidatePackage,
    /// Where the package file is (or will be) on local disk
    pub path: PathBuf,
    /// The file at `path` is present and verified
    pub cached: bool,
}

impl CacheEntry {
    pub fn key(&self) -> PackageKey {
        self.package.key()
    }
}

/// Byte totals and limits of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpaceBudget {
    /// Free bytes on the cache filesystem
    pub download_available: u64,
    /// Optional ceiling on installed bytes
    pub install_limit: Option<u64>,
    /// Bytes still to be downloaded
    pub download_bytes: u64,
    /// Installed size of the whole transaction
    pub install_bytes: u64,
}

/// Outcome of the cache scan
#[derive(Debug, Clone, Default)]
pub struct CachePlan {
    pub entries: Vec<CacheEntry>,
    pub summary: CacheSummary,
    pub budget: SpaceBudget,
}

impl CachePlan {
    /// Entries that must be fetched
    pub fn missing(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter().filter(|e| !e.cached)
    }
}

/// Cache and space accountant
pub struct SpaceAccountant<'a> {
    probe: &'a dyn CapacityProbe,
    cache_dir: &'a Path,
    install_limit: Option<u64>,
}

impl<'a> SpaceAccountant<'a> {
    pub fn new(probe: &'a dyn CapacityProbe, cache_dir: &'a Path, install_limit: Option<u64>) -> Self {
        Self {
            probe,
            cache_dir,
            install_limit,
        }
    }

    /// Scan the cache for `packages` and check both space budgets
    ///
    /// Fails with [`Error::InsufficientSpace`] before anything is fetched.
    pub fn account(
        &self,
        packages: &[CandidatePackage],
        repos: &RepositoryRegistry,
        observer: &mut dyn RunObserver,
    ) -> Result<CachePlan> {
        info!("Checking packages cached ...");

        let mut entries = Vec::with_capacity(packages.len());
        for pkg in packages {
            entries.push(self.scan(pkg, repos, observer)?);
        }

        let mut budget = SpaceBudget {
            install_limit: self.install_limit,
            ..Default::default()
        };
        for entry in &entries {
            budget.install_bytes += entry.package.install_size();
            if !entry.cached {
                budget.download_bytes += entry.package.package_size;
            }
        }

        budget.download_available = self.probe.available_bytes(self.cache_dir)?;
        if budget.download_bytes > budget.download_available {
            return Err(Error::InsufficientSpace {
                kind: SpaceKind::Download,
                needed: budget.download_bytes,
                available: budget.download_available,
            });
        }

        if let Some(limit) = budget.install_limit
            && budget.install_bytes > limit
        {
            return Err(Error::InsufficientSpace {
                kind: SpaceKind::Install,
                needed: budget.install_bytes,
                available: limit,
            });
        }

        let cached = entries.iter().filter(|e| e.cached).count();
        let summary = CacheSummary {
            total: entries.len(),
            cached,
            missing: entries.len() - cached,
        };
        observer.cache_summary(summary);

        Ok(CachePlan {
            entries,
            summary,
            budget,
        })
    }

    fn scan(
        &self,
        pkg: &CandidatePackage,
        repos: &RepositoryRegistry,
        observer: &mut dyn RunObserver,
    ) -> Result<CacheEntry> {
        if let Some(local) = &pkg.local_path {
            return Ok(CacheEntry {
                package: pkg.clone(),
                path: local.clone(),
                cached: true,
            });
        }

        let repo = repos.get(&pkg.repo_id).ok_or_else(|| {
            Error::Repo(format!("{}: unknown repository for {}", pkg.repo_id, pkg.key()))
        })?;
        let path = repo.package_path(pkg);

        if repo.nocache && path.exists() {
            debug!("Removing {} (repository {} is nocache)", path.display(), repo.id);
            fs::remove_file(&path)?;
        }

        let cached = path.exists()
            && match verify_package(&path, pkg)? {
                Verification::Valid => true,
                failed => {
                    let message = format!(
                        "Cached package {} failed verification ({:?}), downloading again",
                        pkg.key(),
                        failed
                    );
                    warn!("{}", message);
                    observer.warning(&message);
                    false
                }
            };

        Ok(CacheEntry {
            package: pkg.clone(),
            path,
            cached,
        })
    }
}

/// Fetch every missing entry of `plan`, verifying each download
///
/// Fetches run one at a time. A downloaded file failing verification is
/// removed and the run fails.
pub fn download_missing(
    plan: &mut CachePlan,
    repos: &RepositoryRegistry,
    fetcher: &dyn Fetcher,
    observer: &mut dyn RunObserver,
) -> Result<()> {
    let total = plan.summary.missing;
    let mut done = 0;

    for entry in plan.entries.iter_mut().filter(|e| !e.cached) {
        let key = entry.key();
        let repo = repos.get(&entry.package.repo_id).ok_or_else(|| {
            Error::Repo(format!("{}: unknown repository for {}", entry.package.repo_id, key))
        })?;
        let url = repo.package_url(&entry.package.location).ok_or_else(|| {
            Error::Repo(format!("{}: no base URL to download {}", repo.id, key))
        })?;

        fetcher
            .fetch(&repo.fetch_request(&url, entry.path.clone()))
            .map_err(|e| match e {
                Error::Repo(msg) => Error::Repo(msg),
                other => Error::Repo(format!("{}: {}", repo.id, other)),
            })?;

        match verify_package(&entry.path, &entry.package)? {
            Verification::Valid => {}
            Verification::ChecksumMismatch { expected, actual } => {
                let _ = fs::remove_file(&entry.path);
                return Err(Error::ChecksumMismatch { expected, actual });
            }
            Verification::SizeMismatch { expected, actual } => {
                let _ = fs::remove_file(&entry.path);
                return Err(Error::Download(format!(
                    "{}: expected {} bytes, got {}",
                    key, expected, actual
                )));
            }
        }

        entry.cached = true;
        done += 1;
        observer.download_progress(done, total, &key);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ArchInfo;
    use crate::config::RepositoryConfig;
    use crate::progress::SilentObserver;
    use crate::repository::FetchRequest;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct FixedProbe(u64);

    impl CapacityProbe for FixedProbe {
        fn available_bytes(&self, _path: &Path) -> Result<u64> {
            Ok(self.0)
        }
    }

    /// Writes `body` for every request
    struct BodyFetcher {
        body: Vec<u8>,
        calls: RefCell<usize>,
    }

    impl Fetcher for BodyFetcher {
        fn fetch(&self, request: &FetchRequest) -> Result<PathBuf> {
            *self.calls.borrow_mut() += 1;
            fs::write(&request.dest, &self.body)?;
            Ok(request.dest.clone())
        }
    }

    fn sha256_hex(data: &[u8]) -> String {
        format!("{:x}", Sha256::digest(data))
    }

    fn setup(nocache: bool) -> (TempDir, RepositoryRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let mut repos =
            RepositoryRegistry::new(ArchInfo::new("x86_64"), dir.path(), dir.path().join("p"));
        let mut config = RepositoryConfig::with_baseurl("base", "https://example.com/os/");
        config.nocache = nocache;
        repos.add_repository(&config).unwrap();
        (dir, repos)
    }

    fn package(name: &str, body: &[u8]) -> CandidatePackage {
        let key = PackageKey::new(name, "x86_64", "1.0", "1");
        CandidatePackage::new(
            "base",
            &key,
            sha256_hex(body),
            body.len() as u64,
            format!("Packages/{}.rpm", key),
        )
    }

    #[test]
    fn test_verify_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.rpm");
        fs::write(&path, b"payload").unwrap();

        let pkg = package("a", b"payload");
        assert!(verify_package(&path, &pkg).unwrap().is_valid());

        let wrong = package("a", b"PAYLOAD");
        assert!(matches!(
            verify_package(&path, &wrong).unwrap(),
            Verification::ChecksumMismatch { .. }
        ));

        let mut short = package("a", b"payload");
        short.package_size = 3;
        assert!(matches!(
            verify_package(&path, &short).unwrap(),
            Verification::SizeMismatch { expected: 3, actual: 7 }
        ));

    }

    #[test]
    fn test_verify_legacy_checksums() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.rpm");
        fs::write(&path, b"payload").unwrap();

        let mut sha1 = package("a", b"payload");
        sha1.checksum_type = ChecksumType::Sha1;
        sha1.checksum = format!("{:x}", Sha1::digest(b"payload"));
        assert!(verify_package(&path, &sha1).unwrap().is_valid());

        let mut md5 = package("a", b"payload");
        md5.checksum_type = ChecksumType::Md5;
        md5.checksum = format!("{:x}", Md5::digest(b"payload"));
        assert!(verify_package(&path, &md5).unwrap().is_valid());

        md5.checksum = format!("{:x}", Md5::digest(b"PAYLOAD"));
        assert!(matches!(
            verify_package(&path, &md5).unwrap(),
            Verification::ChecksumMismatch { .. }
        ));
    }

    #[test]
    fn test_sha1_cache_entry_is_reused() {
        let (dir, repos) = setup(false);
        let body = b"legacy payload".to_vec();
        let mut pkg = package("zlib", &body);
        pkg.checksum_type = ChecksumType::Sha1;
        pkg.checksum = format!("{:x}", Sha1::digest(&body));
        let fetcher = BodyFetcher {
            body: body.clone(),
            calls: RefCell::new(0),
        };
        let probe = FixedProbe(1 << 30);
        let accountant = SpaceAccountant::new(&probe, dir.path(), None);

        let mut plan = accountant
            .account(std::slice::from_ref(&pkg), &repos, &mut SilentObserver)
            .unwrap();
        download_missing(&mut plan, &repos, &fetcher, &mut SilentObserver).unwrap();

        let plan = accountant
            .account(std::slice::from_ref(&pkg), &repos, &mut SilentObserver)
            .unwrap();
        assert_eq!(plan.summary.cached, 1);
        assert_eq!(*fetcher.calls.borrow(), 1);
    }

    #[test]
    fn test_download_space_gate() {
        let (dir, repos) = setup(false);
        let mut foo = package("foo", b"");
        foo.package_size = 100;

        let probe = FixedProbe(50);
        let accountant = SpaceAccountant::new(&probe, dir.path(), None);
        let err = accountant
            .account(&[foo], &repos, &mut SilentObserver)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientSpace {
                kind: SpaceKind::Download,
                needed: 100,
                available: 50
            }
        ));
    }

    #[test]
    fn test_install_space_gate_uses_installed_size() {
        let (dir, repos) = setup(false);
        let mut a = package("a", b"aaaa");
        a.installed_size = Some(600);
        let b = package("b", b"bbbb");

        let probe = FixedProbe(u64::MAX);
        let accountant = SpaceAccountant::new(&probe, dir.path(), Some(500));
        let err = accountant
            .account(&[a, b], &repos, &mut SilentObserver)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientSpace {
                kind: SpaceKind::Install,
                needed: 604,
                available: 500
            }
        ));
    }

    #[test]
    fn test_caching_is_idempotent() {
        let (dir, repos) = setup(false);
        let body = b"rpm payload".to_vec();
        let pkg = package("bash", &body);
        let fetcher = BodyFetcher {
            body: body.clone(),
            calls: RefCell::new(0),
        };
        let probe = FixedProbe(1 << 30);
        let accountant = SpaceAccountant::new(&probe, dir.path(), None);

        let mut plan = accountant
            .account(std::slice::from_ref(&pkg), &repos, &mut SilentObserver)
            .unwrap();
        assert_eq!(plan.summary.missing, 1);
        download_missing(&mut plan, &repos, &fetcher, &mut SilentObserver).unwrap();
        assert_eq!(*fetcher.calls.borrow(), 1);

        let mut plan = accountant
            .account(std::slice::from_ref(&pkg), &repos, &mut SilentObserver)
            .unwrap();
        assert_eq!(plan.summary.cached, 1);
        assert_eq!(plan.budget.download_bytes, 0);
        download_missing(&mut plan, &repos, &fetcher, &mut SilentObserver).unwrap();
        assert_eq!(*fetcher.calls.borrow(), 1);
    }

    #[test]
    fn test_corrupt_cache_entry_is_downloaded_again() {
        let (dir, repos) = setup(false);
        let pkg = package("bash", b"good");
        let repo = repos.get("base").unwrap();
        fs::write(repo.package_path(&pkg), b"bad!").unwrap();

        let probe = FixedProbe(1 << 30);
        let accountant = SpaceAccountant::new(&probe, dir.path(), None);
        let plan = accountant
            .account(&[pkg], &repos, &mut SilentObserver)
            .unwrap();
        assert_eq!(plan.summary.cached, 0);
        assert_eq!(plan.missing().count(), 1);
    }

    #[test]
    fn test_nocache_removes_cached_file() {
        let (dir, repos) = setup(true);
        let pkg = package("bash", b"good");
        let path = repos.get("base").unwrap().package_path(&pkg);
        fs::write(&path, b"good").unwrap();

        let probe = FixedProbe(1 << 30);
        let accountant = SpaceAccountant::new(&probe, dir.path(), None);
        let plan = accountant
            .account(&[pkg], &repos, &mut SilentObserver)
            .unwrap();
        assert!(!path.exists());
        assert_eq!(plan.summary.missing, 1);
    }

    #[test]
    fn test_checksum_mismatch_after_download_removes_file() {
        let (dir, repos) = setup(false);
        let pkg = package("bash", b"expected");
        let fetcher = BodyFetcher {
            body: b"tampered".to_vec(),
            calls: RefCell::new(0),
        };
        let probe = FixedProbe(1 << 30);
        let accountant = SpaceAccountant::new(&probe, dir.path(), None);
        let mut plan = accountant
            .account(&[pkg], &repos, &mut SilentObserver)
            .unwrap();

        let err = download_missing(&mut plan, &repos, &fetcher, &mut SilentObserver).unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
        assert!(!plan.entries[0].path.exists());
    }
}
