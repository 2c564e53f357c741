// src/packages/mod.rs

//! Local package files
//!
//! Packages supplied as files on disk (rather than from a repository) are
//! read here. Each format implements the `PackageFormat` trait.

pub mod rpm;
pub mod traits;

pub use traits::PackageFormat;
