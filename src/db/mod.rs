// src/db/mod.rs

//! Package index
//!
//! The set of packages and groups offered by the session's repositories is
//! kept in SQLite. The index is transient: it lives in memory by default and
//! is rebuilt from repository metadata every session.

pub mod models;
pub mod schema;

use crate::error::{Error, Result};
use models::{CandidatePackage, Group};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use tracing::debug;

/// Open a fresh in-memory index with the schema applied
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Open (or create) an on-disk index at `db_path` with the schema applied
pub fn init(db_path: &Path) -> Result<Connection> {
    debug!("Initializing package index at: {}", db_path.display());

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::InitError(format!("Failed to create index directory: {}", e))
        })?;
    }

    let conn = Connection::open(db_path)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Run `f` inside a database transaction, committing on success
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    let result = f(&tx)?;
    tx.commit()?;
    Ok(result)
}

/// Query and load access to the available-package index
pub struct PackageIndex {
    conn: Connection,
}

impl PackageIndex {
    /// Create an empty in-memory index
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: open_in_memory()?,
        })
    }

    /// Use an existing, migrated connection
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert a batch of packages atomically
    pub fn insert_packages(&mut self, packages: &mut [CandidatePackage]) -> Result<usize> {
        transaction(&mut self.conn, |tx| {
            for pkg in packages.iter_mut() {
                pkg.insert(tx)?;
            }
            Ok(packages.len())
        })
    }

    /// Insert a single package, returning its index ID
    pub fn insert_package(&mut self, package: &mut CandidatePackage) -> Result<i64> {
        package.insert(&self.conn)
    }

    pub fn insert_group(&mut self, group: &Group) -> Result<()> {
        transaction(&mut self.conn, |tx| group.insert(tx))
    }

    /// Packages matching a name / glob pattern
    pub fn search(&self, pattern: &str) -> Result<Vec<CandidatePackage>> {
        CandidatePackage::search(&self.conn, pattern)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Vec<CandidatePackage>> {
        CandidatePackage::find_by_name(&self.conn, name)
    }

    pub fn find_by_name_arch(&self, name: &str, arch: &str) -> Result<Vec<CandidatePackage>> {
        CandidatePackage::find_by_name_arch(&self.conn, name, arch)
    }

    /// Packages whose manifest contains `path`
    pub fn what_provides_file(&self, path: &str) -> Result<Vec<CandidatePackage>> {
        CandidatePackage::find_by_file(&self.conn, path)
    }

    pub fn find_group(&self, id_or_name: &str) -> Result<Option<Group>> {
        Group::find(&self.conn, id_or_name)
    }

    pub fn package_count(&self) -> Result<usize> {
        CandidatePackage::count(&self.conn)
    }
}
