// src/packages/rpm.rs

//! RPM package header reader

use crate::db::models::{Capability, CandidatePackage, ChecksumType, PackageKey, Requirement};
use crate::error::{Error, Result};
use crate::packages::traits::{PackageFile, PackageFormat};
use crate::version::{Comparison, Evr};
use rpm::{DependencyFlags, Package};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// RPM package representation
#[derive(Debug, Clone)]
pub struct RpmPackage {
    path: PathBuf,
    name: String,
    epoch: u32,
    version: String,
    release: String,
    arch: String,
    summary: Option<String>,
    license: Option<String>,
    checksum: String,
    package_size: u64,
    files: Vec<PackageFile>,
    requires: Vec<Requirement>,
    provides: Vec<Capability>,
}

impl RpmPackage {
    /// Extract file list from RPM package
    fn extract_files(pkg: &Package) -> Vec<PackageFile> {
        let mut files = Vec::new();

        if let Ok(file_entries) = pkg.metadata.get_file_entries() {
            for entry in file_entries {
                files.push(PackageFile {
                    path: entry.path.to_string_lossy().to_string(),
                    size: entry.size as u64,
                });
            }
        }

        files
    }

    /// Extract requirements, marking those needed before install scriptlets
    fn extract_requires(pkg: &Package) -> Vec<Requirement> {
        let pre_flags =
            DependencyFlags::PREREQ | DependencyFlags::SCRIPT_PRE | DependencyFlags::PRETRANS;

        pkg.metadata
            .get_requires()
            .map(|requires| {
                requires
                    .into_iter()
                    .map(|dep| Requirement {
                        pre: dep.flags.intersects(pre_flags),
                        capability: capability(dep.name, dep.flags, &dep.version),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn extract_provides(pkg: &Package) -> Vec<Capability> {
        pkg.metadata
            .get_provides()
            .map(|provides| {
                provides
                    .into_iter()
                    .map(|dep| capability(dep.name, dep.flags, &dep.version))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// SHA-256 of the whole package file
    fn file_checksum(path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Local path the package was read from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Map RPM sense flags onto a comparison
fn comparison(flags: DependencyFlags) -> Option<Comparison> {
    comparison_from_sense(
        flags.contains(DependencyFlags::LESS),
        flags.contains(DependencyFlags::GREATER),
        flags.contains(DependencyFlags::EQUAL),
    )
}

fn comparison_from_sense(less: bool, greater: bool, equal: bool) -> Option<Comparison> {
    match (less, greater, equal) {
        (true, false, true) => Some(Comparison::Le),
        (true, false, false) => Some(Comparison::Lt),
        (false, true, true) => Some(Comparison::Ge),
        (false, true, false) => Some(Comparison::Gt),
        (false, false, true) => Some(Comparison::Eq),
        _ => None,
    }
}

fn header(field: &str, value: std::result::Result<&str, rpm::Error>) -> Result<String> {
    value
        .map(str::to_string)
        .map_err(|e| Error::ParseError(format!("Failed to get package {}: {}", field, e)))
}

fn capability(name: String, flags: DependencyFlags, version: &str) -> Capability {
    match comparison(flags) {
        Some(cmp) if !version.is_empty() => Capability::versioned(name, cmp, Evr::parse(version)),
        _ => Capability::named(name),
    }
}

impl PackageFormat for RpmPackage {
    fn parse(path: &Path) -> Result<Self> {
        debug!("Parsing RPM package: {}", path.display());

        let file = File::open(path)
            .map_err(|e| Error::ParseError(format!("Failed to open RPM file: {}", e)))?;
        let package_size = file.metadata()?.len();

        let mut buf_reader = BufReader::new(file);

        let pkg = Package::parse(&mut buf_reader)
            .map_err(|e| Error::ParseError(format!("Failed to parse RPM: {}", e)))?;

        let name = header("name", pkg.metadata.get_name())?;
        let version = header("version", pkg.metadata.get_version())?;
        let release = header("release", pkg.metadata.get_release())?;
        // Source packages carry no arch tag
        let arch = pkg
            .metadata
            .get_arch()
            .map(str::to_string)
            .unwrap_or_else(|_| "noarch".to_string());
        let epoch = pkg.metadata.get_epoch().unwrap_or(0);
        let summary = pkg.metadata.get_summary().ok().map(str::to_string);
        let license = pkg.metadata.get_license().ok().map(str::to_string);

        let files = Self::extract_files(&pkg);
        let requires = Self::extract_requires(&pkg);
        let provides = Self::extract_provides(&pkg);
        let checksum = Self::file_checksum(path)?;

        debug!(
            "Parsed RPM: {}-{}-{}.{} ({} files, {} requires)",
            name,
            version,
            release,
            arch,
            files.len(),
            requires.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            name,
            epoch,
            version,
            release,
            arch,
            summary,
            license,
            checksum,
            package_size,
            files,
            requires,
            provides,
        })
    }

    fn key(&self) -> PackageKey {
        PackageKey::new(&self.name, &self.arch, &self.version, &self.release)
    }

    fn epoch(&self) -> u32 {
        self.epoch
    }

    fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }

    fn files(&self) -> &[PackageFile] {
        &self.files
    }

    fn requires(&self) -> &[Requirement] {
        &self.requires
    }

    fn provides(&self) -> &[Capability] {
        &self.provides
    }

    fn to_candidate(&self, repo_id: &str) -> CandidatePackage {
        let location = self
            .path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.rpm", self.key()));

        let mut pkg = CandidatePackage::new(
            repo_id,
            &self.key(),
            &self.checksum,
            self.package_size,
            location,
        );
        pkg.epoch = self.epoch;
        pkg.checksum_type = ChecksumType::Sha256;
        pkg.installed_size = Some(self.installed_size());
        pkg.summary = self.summary.clone();
        pkg.license = self.license.clone();
        pkg.local_path = Some(self.path.clone());
        pkg.files = self.files.iter().map(|f| f.path.clone()).collect();
        pkg.requires = self.requires.clone();
        pkg.provides = self.provides.clone();
        pkg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RpmPackage {
        RpmPackage {
            path: PathBuf::from("/srv/local/hello-2.12-1.x86_64.rpm"),
            name: "hello".to_string(),
            epoch: 1,
            version: "2.12".to_string(),
            release: "1".to_string(),
            arch: "x86_64".to_string(),
            summary: Some("Prints a familiar greeting".to_string()),
            license: Some("GPL-3.0-or-later".to_string()),
            checksum: "0123abcd".to_string(),
            package_size: 4096,
            files: vec![
                PackageFile {
                    path: "/usr/bin/hello".to_string(),
                    size: 30_000,
                },
                PackageFile {
                    path: "/usr/share/doc/hello/README".to_string(),
                    size: 2_000,
                },
            ],
            requires: vec![Requirement::pre(Capability::named("/bin/sh"))],
            provides: vec![Capability::named("hello")],
        }
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = RpmPackage::parse(Path::new("/nonexistent/file.rpm"));
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[test]
    fn test_parse_non_rpm_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.rpm");
        std::fs::write(&path, b"definitely not an rpm").unwrap();
        assert!(RpmPackage::parse(&path).is_err());
    }

    #[test]
    fn test_sense_flags_to_comparison() {
        assert_eq!(comparison_from_sense(true, false, true), Some(Comparison::Le));
        assert_eq!(comparison_from_sense(false, true, false), Some(Comparison::Gt));
        assert_eq!(comparison_from_sense(false, false, true), Some(Comparison::Eq));
        assert_eq!(comparison_from_sense(false, false, false), None);
    }

    #[test]
    fn test_to_candidate() {
        let rpm = sample();
        let pkg = rpm.to_candidate("@commandline");

        assert_eq!(pkg.repo_id, "@commandline");
        assert_eq!(pkg.key().to_string(), "hello-2.12-1.x86_64");
        assert_eq!(pkg.epoch, 1);
        assert_eq!(pkg.location, "hello-2.12-1.x86_64.rpm");
        assert_eq!(pkg.package_size, 4096);
        assert_eq!(pkg.installed_size, Some(32_000));
        assert_eq!(pkg.local_path.as_deref(), Some(rpm.path()));
        assert_eq!(pkg.files.len(), 2);
        assert!(pkg.requires[0].pre);
    }
}
