// src/lib.rs

//! imgpkg - package transaction core for OS image assembly
//!
//! Given a requested set of packages and groups, imgpkg manages a local
//! package cache, accounts for disk space before any network use, stages an
//! install transaction, executes it against a target root and records
//! per-package provenance (license, file manifest).
//!
//! # Architecture
//!
//! - Repository registry: repository definitions, proxy and TLS policy
//! - Package selector: selection state for packages and groups
//! - Cache & space accountant: cache validity and space gating
//! - Transaction builder & executor: resolve, order, execute, report
//!
//! Dependency resolution, package payload execution and network transfer
//! are collaborators behind the [`transaction::Resolver`],
//! [`transaction::Executor`] and [`repository::Fetcher`] traits.

pub mod arch;
pub mod backend;
pub mod cache;
pub mod config;
pub mod db;
mod error;
pub mod packages;
pub mod progress;
pub mod repository;
pub mod selector;
pub mod transaction;
pub mod version;

pub use error::{Error, Lookup, Result, SpaceKind};
