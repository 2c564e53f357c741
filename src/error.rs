// src/error.rs

use std::fmt;
use thiserror::Error;

/// Which space budget was exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceKind {
    /// Cache filesystem space for package downloads
    Download,
    /// Install capacity of the target image
    Install,
}

impl fmt::Display for SpaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpaceKind::Download => write!(f, "downloading"),
            SpaceKind::Install => write!(f, "installing"),
        }
    }
}

/// Core error types for imgpkg
///
/// Every variant is fatal for the run that raised it. Recoverable
/// conditions such as an unmatched package pattern are reported through
/// [`Lookup::NotFound`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Database-related errors (package index)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid session or repository configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or metadata failure while talking to a repository
    #[error("Unable to download from repo: {0}")]
    Repo(String),

    /// A download or install space budget was exceeded
    #[error("Not enough space for {kind}: {needed} bytes needed, {available} bytes available")]
    InsufficientSpace {
        kind: SpaceKind,
        needed: u64,
        available: u64,
    },

    /// The resolver could not build a transaction; diagnostics kept verbatim
    #[error("Failed to build transaction: {}", .0.join("\n"))]
    Resolution(Vec<String>),

    /// No deterministic install order could be produced
    #[error("Ordering packages for installation failed: {0}")]
    Ordering(String),

    /// The executor reported a non-zero aggregate result
    #[error("Failed to install some packages: {0}")]
    Install(String),

    /// Packages registered as required are absent from the transaction
    #[error("Packages absent in image: {}", .0.join(","))]
    RequiredPackageMissing(Vec<String>),

    /// Download errors
    #[error("Download error: {0}")]
    Download(String),

    /// Checksum verification failed for a downloaded package
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Metadata or package header parse errors
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Lookup of a named entity failed
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Session initialization error
    #[error("Failed to initialize: {0}")]
    InitError(String),
}

/// Result type alias using imgpkg's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a lookup-style operation that may legitimately find nothing
///
/// `NotFound` carries a human-readable message for the caller to display;
/// it never unwinds a run. Fatal failures are returned as `Err(Error)`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Lookup<T> {
    Found(T),
    NotFound(String),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Message attached to a `NotFound` outcome
    pub fn message(&self) -> Option<&str> {
        match self {
            Lookup::Found(_) => None,
            Lookup::NotFound(msg) => Some(msg),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound(_) => None,
        }
    }
}
