// src/packages/traits.rs

//! Common traits for local package file readers

use crate::db::models::{Capability, CandidatePackage, PackageKey, Requirement};
use crate::error::Result;
use std::path::Path;

/// Metadata about a file within a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    pub path: String,
    pub size: u64,
}

/// Common interface for package files read from local disk
pub trait PackageFormat {
    /// Parse the header of the package file at `path`
    fn parse(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Identity of the package
    fn key(&self) -> PackageKey;

    fn epoch(&self) -> u32;

    fn license(&self) -> Option<&str>;

    /// Get the list of files in the package
    fn files(&self) -> &[PackageFile];

    fn requires(&self) -> &[Requirement];

    fn provides(&self) -> &[Capability];

    /// Sum of the sizes of every file in the package
    fn installed_size(&self) -> u64 {
        self.files().iter().map(|f| f.size).sum()
    }

    /// Convert this package to an index record offered by `repo_id`
    fn to_candidate(&self, repo_id: &str) -> CandidatePackage;
}
