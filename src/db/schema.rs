// src/db/schema.rs

//! Package index schema and migrations
//!
//! The index holds every package and group advertised by the session's
//! repositories. It is rebuilt from repository metadata on each session.

use crate::error::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Apply all pending migrations to bring the index up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    debug!("Current index schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        debug!("Applying index migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!("Package index schema at version {}", SCHEMA_VERSION);
    Ok(())
}

fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(Error::InitError(format!(
            "Unknown index migration version: {}",
            version
        ))),
    }
}

/// Initial schema - Version 1
///
/// - packages: one row per (repository, name, epoch, version, release, arch)
/// - package_files: file manifest per package
/// - package_requires / package_provides: capability metadata
/// - groups / group_packages: comps group definitions
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE packages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            repo_id TEXT NOT NULL,
            name TEXT NOT NULL,
            epoch INTEGER NOT NULL DEFAULT 0,
            version TEXT NOT NULL,
            release TEXT NOT NULL,
            arch TEXT NOT NULL,
            summary TEXT,
            license TEXT,
            vcs TEXT,
            checksum TEXT NOT NULL,
            checksum_type TEXT NOT NULL,
            package_size INTEGER NOT NULL,
            installed_size INTEGER,
            location TEXT NOT NULL,
            local_path TEXT,
            UNIQUE(repo_id, name, epoch, version, release, arch)
        );

        CREATE INDEX idx_packages_name ON packages(name);
        CREATE INDEX idx_packages_repo ON packages(repo_id);

        CREATE TABLE package_files (
            package_id INTEGER NOT NULL,
            path TEXT NOT NULL,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_package_files_path ON package_files(path);
        CREATE INDEX idx_package_files_package ON package_files(package_id);

        CREATE TABLE package_requires (
            package_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            flags TEXT,
            epoch INTEGER,
            version TEXT,
            release TEXT,
            pre INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_package_requires_package ON package_requires(package_id);

        CREATE TABLE package_provides (
            package_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            flags TEXT,
            epoch INTEGER,
            version TEXT,
            release TEXT,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_package_provides_package ON package_provides(package_id);
        CREATE INDEX idx_package_provides_name ON package_provides(name);

        CREATE TABLE groups (
            group_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            repo_id TEXT NOT NULL
        );

        CREATE TABLE group_packages (
            group_id TEXT NOT NULL,
            package_name TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('mandatory', 'default', 'optional', 'conditional')),
            requires TEXT,
            FOREIGN KEY (group_id) REFERENCES groups(group_id) ON DELETE CASCADE
        );

        CREATE INDEX idx_group_packages_group ON group_packages(group_id);
        ",
    )?;

    debug!("Index schema version 1 created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('packages', 'package_files', 'package_requires', 'package_provides',
                  'groups', 'group_packages')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 6);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
