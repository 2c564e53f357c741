// src/db/models.rs

//! Data models for the package index
//!
//! This module defines the package and group records stored in the index
//! and provides methods for inserting and querying them.

use crate::error::Result;
use crate::version::{Comparison, Evr};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Identity of a package within one transaction
///
/// The string form `name-version-release.arch` is relied upon by callers
/// (license and content reports) and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageKey {
    pub name: String,
    pub arch: String,
    pub version: String,
    pub release: String,
}

impl PackageKey {
    pub fn new(
        name: impl Into<String>,
        arch: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arch: arch.into(),
            version: version.into(),
            release: release.into(),
        }
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}.{}",
            self.name, self.version, self.release, self.arch
        )
    }
}

/// Checksum algorithm declared by repository metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumType {
    Sha256,
    Sha512,
    Sha1,
    Md5,
}

impl ChecksumType {
    pub fn as_str(&self) -> &str {
        match self {
            ChecksumType::Sha256 => "sha256",
            ChecksumType::Sha512 => "sha512",
            ChecksumType::Sha1 => "sha1",
            ChecksumType::Md5 => "md5",
        }
    }
}

impl FromStr for ChecksumType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(ChecksumType::Sha256),
            "sha512" => Ok(ChecksumType::Sha512),
            "sha1" | "sha" => Ok(ChecksumType::Sha1),
            "md5" => Ok(ChecksumType::Md5),
            _ => Err(format!("Invalid checksum type: {}", s)),
        }
    }
}

/// A versioned capability reference (requires or provides entry)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub name: String,
    pub flags: Option<Comparison>,
    pub evr: Option<Evr>,
}

impl Capability {
    /// Unversioned capability
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: None,
            evr: None,
        }
    }

    pub fn versioned(name: impl Into<String>, flags: Comparison, evr: Evr) -> Self {
        Self {
            name: name.into(),
            flags: Some(flags),
            evr: Some(evr),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.flags, &self.evr) {
            (Some(flags), Some(evr)) => {
                let op = match flags {
                    Comparison::Lt => "<",
                    Comparison::Le => "<=",
                    Comparison::Eq => "=",
                    Comparison::Ge => ">=",
                    Comparison::Gt => ">",
                };
                write!(f, "{} {} {}", self.name, op, evr)
            }
            _ => write!(f, "{}", self.name),
        }
    }
}

/// A requirement of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub capability: Capability,
    /// Must be satisfied before this package's install scriptlets run
    pub pre: bool,
}

impl Requirement {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            pre: false,
        }
    }

    pub fn pre(capability: Capability) -> Self {
        Self {
            capability,
            pre: true,
        }
    }

    /// rpmlib() requirements are satisfied by the package manager itself
    pub fn is_rpmlib(&self) -> bool {
        self.capability.name.starts_with("rpmlib(")
    }
}

/// A package available for installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePackage {
    pub id: Option<i64>,
    pub repo_id: String,
    pub name: String,
    pub epoch: u32,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub summary: Option<String>,
    pub license: Option<String>,
    pub vcs: Option<String>,
    pub checksum: String,
    pub checksum_type: ChecksumType,
    /// Declared download size in bytes
    pub package_size: u64,
    /// Declared installed size in bytes, when the metadata carries one
    pub installed_size: Option<u64>,
    /// Path relative to the repository base URL
    pub location: String,
    /// Set for packages supplied as local files
    pub local_path: Option<PathBuf>,
    pub files: Vec<String>,
    pub requires: Vec<Requirement>,
    pub provides: Vec<Capability>,
}

impl CandidatePackage {
    /// Create a package record with the mandatory metadata
    pub fn new(
        repo_id: impl Into<String>,
        key: &PackageKey,
        checksum: impl Into<String>,
        package_size: u64,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            repo_id: repo_id.into(),
            name: key.name.clone(),
            epoch: 0,
            version: key.version.clone(),
            release: key.release.clone(),
            arch: key.arch.clone(),
            summary: None,
            license: None,
            vcs: None,
            checksum: checksum.into(),
            checksum_type: ChecksumType::Sha256,
            package_size,
            installed_size: None,
            location: location.into(),
            local_path: None,
            files: Vec::new(),
            requires: Vec::new(),
            provides: Vec::new(),
        }
    }

    pub fn key(&self) -> PackageKey {
        PackageKey::new(&self.name, &self.arch, &self.version, &self.release)
    }

    pub fn evr(&self) -> Evr {
        Evr::new(self.epoch, &self.version, &self.release)
    }

    /// Installed size, falling back to the download size
    pub fn install_size(&self) -> u64 {
        self.installed_size.unwrap_or(self.package_size)
    }

    /// Whether this package supplies `capability` (by name or provides)
    pub fn provides_capability(&self, capability: &Capability) -> bool {
        if capability.name.starts_with('/') {
            return self.files.iter().any(|f| f == &capability.name);
        }

        let wanted = match (&capability.flags, &capability.evr) {
            (Some(flags), Some(evr)) => Some((flags, evr)),
            _ => None,
        };

        if self.name == capability.name {
            match wanted {
                None => return true,
                Some((flags, evr)) if flags.satisfied_by(&self.evr(), evr) => return true,
                _ => {}
            }
        }

        self.provides.iter().any(|p| {
            if p.name != capability.name {
                return false;
            }
            match (wanted, &p.evr) {
                (None, _) => true,
                // An unversioned provide satisfies any versioned requirement
                (Some(_), None) => true,
                (Some((flags, evr)), Some(have)) => flags.satisfied_by(have, evr),
            }
        })
    }

    /// Insert this package (with files and capabilities) into the index
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO packages
             (repo_id, name, epoch, version, release, arch, summary, license, vcs, checksum,
              checksum_type, package_size, installed_size, location, local_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                &self.repo_id,
                &self.name,
                self.epoch,
                &self.version,
                &self.release,
                &self.arch,
                &self.summary,
                &self.license,
                &self.vcs,
                &self.checksum,
                self.checksum_type.as_str(),
                self.package_size as i64,
                self.installed_size.map(|s| s as i64),
                &self.location,
                self.local_path.as_ref().map(|p| p.to_string_lossy().to_string()),
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);

        let mut file_stmt =
            conn.prepare_cached("INSERT INTO package_files (package_id, path) VALUES (?1, ?2)")?;
        for path in &self.files {
            file_stmt.execute(params![id, path])?;
        }

        let mut req_stmt = conn.prepare_cached(
            "INSERT INTO package_requires (package_id, name, flags, epoch, version, release, pre)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for req in &self.requires {
            let cap = &req.capability;
            req_stmt.execute(params![
                id,
                &cap.name,
                cap.flags.map(|f| f.as_flags()),
                cap.evr.as_ref().map(|e| e.epoch),
                cap.evr.as_ref().map(|e| e.version.as_str()),
                cap.evr.as_ref().map(|e| e.release.as_str()),
                req.pre as i32,
            ])?;
        }

        let mut prov_stmt = conn.prepare_cached(
            "INSERT INTO package_provides (package_id, name, flags, epoch, version, release)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for cap in &self.provides {
            prov_stmt.execute(params![
                id,
                &cap.name,
                cap.flags.map(|f| f.as_flags()),
                cap.evr.as_ref().map(|e| e.epoch),
                cap.evr.as_ref().map(|e| e.version.as_str()),
                cap.evr.as_ref().map(|e| e.release.as_str()),
            ])?;
        }

        Ok(id)
    }

    /// Find a package by ID
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let sql = format!("SELECT {} FROM packages WHERE id = ?1", PACKAGE_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let pkg = stmt.query_row([id], Self::from_row).optional()?;

        match pkg {
            Some(pkg) => Ok(Some(Self::load_details(conn, pkg)?)),
            None => Ok(None),
        }
    }

    /// Find packages by exact name and architecture
    pub fn find_by_name_arch(conn: &Connection, name: &str, arch: &str) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {} FROM packages WHERE name = ?1 AND arch = ?2 ORDER BY id",
            PACKAGE_COLUMNS
        );
        Self::query_all(conn, &sql, params![name, arch])
    }

    /// Find packages by exact name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {} FROM packages WHERE name = ?1 ORDER BY id",
            PACKAGE_COLUMNS
        );
        Self::query_all(conn, &sql, params![name])
    }

    /// Find packages matching a name pattern
    ///
    /// The pattern is matched (exactly, or as a glob) against `name`,
    /// `name.arch`, `name-ver`, `name-ver-rel`, `name-ver-rel.arch` and
    /// `name-epoch:ver-rel.arch`.
    pub fn search(conn: &Connection, pattern: &str) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {} FROM packages
             WHERE name GLOB ?1
                OR (name || '.' || arch) GLOB ?1
                OR (name || '-' || version) GLOB ?1
                OR (name || '-' || version || '-' || release) GLOB ?1
                OR (name || '-' || version || '-' || release || '.' || arch) GLOB ?1
                OR (name || '-' || epoch || ':' || version || '-' || release || '.' || arch) GLOB ?1
             ORDER BY name, arch, id",
            PACKAGE_COLUMNS
        );
        Self::query_all(conn, &sql, params![pattern])
    }

    /// Find packages whose file manifest contains `path`
    pub fn find_by_file(conn: &Connection, path: &str) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {} FROM packages
             WHERE id IN (SELECT package_id FROM package_files WHERE path = ?1)
             ORDER BY id",
            PACKAGE_COLUMNS
        );
        Self::query_all(conn, &sql, params![path])
    }

    /// Count all indexed packages
    pub fn count(conn: &Connection) -> Result<usize> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM packages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_all(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(sql)?;
        let packages = stmt
            .query_map(params, Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        packages
            .into_iter()
            .map(|pkg| Self::load_details(conn, pkg))
            .collect()
    }

    /// Populate files, requires and provides for a package row
    fn load_details(conn: &Connection, mut pkg: Self) -> Result<Self> {
        let Some(id) = pkg.id else {
            return Ok(pkg);
        };

        let mut stmt =
            conn.prepare_cached("SELECT path FROM package_files WHERE package_id = ?1 ORDER BY rowid")?;
        pkg.files = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        let mut stmt = conn.prepare_cached(
            "SELECT name, flags, epoch, version, release, pre FROM package_requires
             WHERE package_id = ?1 ORDER BY rowid",
        )?;
        pkg.requires = stmt
            .query_map([id], |row| {
                let capability = capability_from_row(row)?;
                let pre: i32 = row.get(5)?;
                Ok(Requirement {
                    capability,
                    pre: pre != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare_cached(
            "SELECT name, flags, epoch, version, release FROM package_provides
             WHERE package_id = ?1 ORDER BY rowid",
        )?;
        pkg.provides = stmt
            .query_map([id], capability_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(pkg)
    }

    /// Convert a database row to a CandidatePackage (without details)
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let checksum_type: String = row.get(11)?;
        let checksum_type = checksum_type.parse::<ChecksumType>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                11,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?;
        let package_size: i64 = row.get(12)?;
        let installed_size: Option<i64> = row.get(13)?;
        let local_path: Option<String> = row.get(15)?;

        Ok(Self {
            id: Some(row.get(0)?),
            repo_id: row.get(1)?,
            name: row.get(2)?,
            epoch: row.get(3)?,
            version: row.get(4)?,
            release: row.get(5)?,
            arch: row.get(6)?,
            summary: row.get(7)?,
            license: row.get(8)?,
            vcs: row.get(9)?,
            checksum: row.get(10)?,
            checksum_type,
            package_size: package_size.max(0) as u64,
            installed_size: installed_size.map(|s| s.max(0) as u64),
            location: row.get(14)?,
            local_path: local_path.map(PathBuf::from),
            files: Vec::new(),
            requires: Vec::new(),
            provides: Vec::new(),
        })
    }
}

const PACKAGE_COLUMNS: &str = "id, repo_id, name, epoch, version, release, arch, summary, license, vcs, \
     checksum, checksum_type, package_size, installed_size, location, local_path";

fn capability_from_row(row: &Row) -> rusqlite::Result<Capability> {
    let name: String = row.get(0)?;
    let flags: Option<String> = row.get(1)?;
    let epoch: Option<u32> = row.get(2)?;
    let version: Option<String> = row.get(3)?;
    let release: Option<String> = row.get(4)?;

    let flags = flags.as_deref().and_then(Comparison::from_flags);
    let evr = version.map(|v| Evr::new(epoch.unwrap_or(0), v, release.unwrap_or_default()));

    Ok(Capability { name, flags, evr })
}

/// How a package belongs to a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupPackageKind {
    Mandatory,
    Default,
    Optional,
    Conditional,
}

impl GroupPackageKind {
    pub fn as_str(&self) -> &str {
        match self {
            GroupPackageKind::Mandatory => "mandatory",
            GroupPackageKind::Default => "default",
            GroupPackageKind::Optional => "optional",
            GroupPackageKind::Conditional => "conditional",
        }
    }
}

impl FromStr for GroupPackageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mandatory" => Ok(GroupPackageKind::Mandatory),
            "default" => Ok(GroupPackageKind::Default),
            "optional" => Ok(GroupPackageKind::Optional),
            "conditional" => Ok(GroupPackageKind::Conditional),
            _ => Err(format!("Invalid group package kind: {}", s)),
        }
    }
}

/// A package group (comps)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub group_id: String,
    pub name: String,
    pub description: Option<String>,
    pub repo_id: String,
    pub mandatory_packages: Vec<String>,
    pub default_packages: Vec<String>,
    pub optional_packages: Vec<String>,
    /// (package, required package) pairs: the package is wanted only when
    /// the required package is part of the transaction
    pub conditional_packages: Vec<(String, String)>,
}

impl Group {
    pub fn new(group_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Insert this group into the index, replacing a same-id definition
    pub fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute("DELETE FROM group_packages WHERE group_id = ?1", [&self.group_id])?;
        conn.execute("DELETE FROM groups WHERE group_id = ?1", [&self.group_id])?;
        conn.execute(
            "INSERT INTO groups (group_id, name, description, repo_id) VALUES (?1, ?2, ?3, ?4)",
            params![&self.group_id, &self.name, &self.description, &self.repo_id],
        )?;

        let mut stmt = conn.prepare_cached(
            "INSERT INTO group_packages (group_id, package_name, kind, requires)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let plain = [
            (&self.mandatory_packages, GroupPackageKind::Mandatory),
            (&self.default_packages, GroupPackageKind::Default),
            (&self.optional_packages, GroupPackageKind::Optional),
        ];
        for (names, kind) in plain {
            for name in names {
                stmt.execute(params![&self.group_id, name, kind.as_str(), None::<String>])?;
            }
        }
        for (name, requires) in &self.conditional_packages {
            stmt.execute(params![
                &self.group_id,
                name,
                GroupPackageKind::Conditional.as_str(),
                requires
            ])?;
        }

        Ok(())
    }

    /// Find a group by id, falling back to its display name
    pub fn find(conn: &Connection, id_or_name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT group_id, name, description, repo_id FROM groups
             WHERE group_id = ?1 OR name = ?1
             ORDER BY (group_id = ?1) DESC LIMIT 1",
        )?;
        let group = stmt
            .query_row([id_or_name], |row| {
                Ok(Self {
                    group_id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    repo_id: row.get(3)?,
                    ..Default::default()
                })
            })
            .optional()?;

        let Some(mut group) = group else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT package_name, kind, requires FROM group_packages
             WHERE group_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([&group.group_id], |row| {
                let name: String = row.get(0)?;
                let kind: String = row.get(1)?;
                let requires: Option<String> = row.get(2)?;
                Ok((name, kind, requires))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (name, kind, requires) in rows {
            match kind.parse::<GroupPackageKind>() {
                Ok(GroupPackageKind::Mandatory) => group.mandatory_packages.push(name),
                Ok(GroupPackageKind::Default) => group.default_packages.push(name),
                Ok(GroupPackageKind::Optional) => group.optional_packages.push(name),
                Ok(GroupPackageKind::Conditional) => group
                    .conditional_packages
                    .push((name, requires.unwrap_or_default())),
                Err(_) => {}
            }
        }

        Ok(Some(group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        schema::migrate(&conn).unwrap();
        conn
    }

    fn sample_package(name: &str, arch: &str, version: &str) -> CandidatePackage {
        let key = PackageKey::new(name, arch, version, "1.fc43");
        let mut pkg = CandidatePackage::new(
            "fedora",
            &key,
            "abc123",
            1024,
            format!("Packages/{}.rpm", key),
        );
        pkg.license = Some("MIT".to_string());
        pkg.files = vec![format!("/usr/bin/{}", name)];
        pkg.requires = vec![
            Requirement::new(Capability::versioned(
                "glibc",
                Comparison::Ge,
                Evr::parse("2.34"),
            )),
            Requirement::pre(Capability::named("/bin/sh")),
        ];
        pkg.provides = vec![Capability::named(format!("{}-bin", name))];
        pkg
    }

    #[test]
    fn test_package_key_format() {
        let key = PackageKey::new("foo", "x86_64", "1.0", "1");
        assert_eq!(key.to_string(), "foo-1.0-1.x86_64");
    }

    #[test]
    fn test_insert_and_find_package() {
        let conn = create_test_db();
        let mut pkg = sample_package("bash", "x86_64", "5.2");
        let id = pkg.insert(&conn).unwrap();

        let found = CandidatePackage::find_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(found.key(), pkg.key());
        assert_eq!(found.license.as_deref(), Some("MIT"));
        assert_eq!(found.files, vec!["/usr/bin/bash".to_string()]);
        assert_eq!(found.requires.len(), 2);
        assert!(found.requires[1].pre);
        assert_eq!(found.requires[0].capability.to_string(), "glibc >= 2.34");
        assert_eq!(found.provides[0].name, "bash-bin");
    }

    #[test]
    fn test_search_patterns() {
        let conn = create_test_db();
        sample_package("bash", "x86_64", "5.2").insert(&conn).unwrap();
        sample_package("bash-completion", "noarch", "2.11").insert(&conn).unwrap();
        sample_package("zsh", "x86_64", "5.9").insert(&conn).unwrap();

        assert_eq!(CandidatePackage::search(&conn, "bash").unwrap().len(), 1);
        assert_eq!(CandidatePackage::search(&conn, "bash*").unwrap().len(), 2);
        assert_eq!(CandidatePackage::search(&conn, "bash.x86_64").unwrap().len(), 1);
        assert_eq!(CandidatePackage::search(&conn, "zsh-5.9").unwrap().len(), 1);
        assert_eq!(
            CandidatePackage::search(&conn, "zsh-5.9-1.fc43.x86_64").unwrap().len(),
            1
        );
        assert!(CandidatePackage::search(&conn, "fish").unwrap().is_empty());
    }

    #[test]
    fn test_find_by_file() {
        let conn = create_test_db();
        sample_package("bash", "x86_64", "5.2").insert(&conn).unwrap();

        let found = CandidatePackage::find_by_file(&conn, "/usr/bin/bash").unwrap();
        assert_eq!(found.len(), 1);
        assert!(CandidatePackage::find_by_file(&conn, "/usr/bin/zsh").unwrap().is_empty());
    }

    #[test]
    fn test_install_size_falls_back_to_download_size() {
        let mut pkg = sample_package("bash", "x86_64", "5.2");
        assert_eq!(pkg.install_size(), 1024);
        pkg.installed_size = Some(4096);
        assert_eq!(pkg.install_size(), 4096);
    }

    #[test]
    fn test_provides_capability() {
        let pkg = sample_package("glibc", "x86_64", "2.38");
        assert!(pkg.provides_capability(&Capability::named("glibc")));
        assert!(pkg.provides_capability(&Capability::versioned(
            "glibc",
            Comparison::Ge,
            Evr::parse("2.34")
        )));
        assert!(!pkg.provides_capability(&Capability::versioned(
            "glibc",
            Comparison::Ge,
            Evr::parse("2.40")
        )));
        assert!(pkg.provides_capability(&Capability::named("glibc-bin")));
        assert!(pkg.provides_capability(&Capability::named("/usr/bin/glibc")));
        assert!(!pkg.provides_capability(&Capability::named("/usr/bin/other")));
    }

    #[test]
    fn test_group_roundtrip_through_index() {
        let conn = create_test_db();
        let mut group = Group::new("core", "Core");
        group.repo_id = "fedora".to_string();
        group.mandatory_packages = vec!["bash".to_string()];
        group.default_packages = vec!["vim-minimal".to_string(), "less".to_string()];
        group.optional_packages = vec!["zsh".to_string()];
        group.conditional_packages = vec![("bash-completion".to_string(), "bash".to_string())];
        group.insert(&conn).unwrap();

        let by_id = Group::find(&conn, "core").unwrap().unwrap();
        assert_eq!(by_id, group);

        let by_name = Group::find(&conn, "Core").unwrap().unwrap();
        assert_eq!(by_name.group_id, "core");

        assert!(Group::find(&conn, "missing").unwrap().is_none());
    }
}
