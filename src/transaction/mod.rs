// src/transaction/mod.rs

//! Transaction building, ordering and execution
//!
//! A run turns the selection into a single-use transaction:
//! 1. [`build`] hands the selection to a [`Resolver`]
//! 2. [`check_dependencies`] reports unmet requirements (advisory)
//! 3. [`order`] sorts members so dependencies come first
//! 4. an [`Executor`] applies the ordered transaction to the target root
//! 5. [`TransactionReport`] records license and content of what was installed

mod executor;
mod order;
mod report;

pub use executor::{
    ExecutionContext, ExecutionReport, Executor, LockCleanup, PackageOutcome, cleanup_rpmdb_locks,
};
pub use order::{OrderedTransaction, UnmetDependency, check_dependencies, order};
pub use report::{RunReport, TransactionReport};

use crate::db::PackageIndex;
use crate::error::{Error, Result};
use crate::selector::{LOCAL_REPO_ID, TransactionMember, TransactionSet};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Input handed to a resolver
pub struct ResolveRequest<'a> {
    /// Selected packages and conditional bookkeeping
    pub selection: &'a TransactionSet,
    /// Every available package
    pub index: &'a PackageIndex,
}

/// Outcome of dependency resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The complete member list of the transaction
    Resolved(Vec<TransactionMember>),
    /// Resolver diagnostics, one line per entry
    Failed(Vec<String>),
}

/// Dependency resolver: selection → complete transaction | diagnostics
///
/// `Err` is reserved for repository or index failures; an unsatisfiable
/// selection is `Ok(Resolution::Failed)`.
pub trait Resolver {
    fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Resolution>;
}

/// Resolver that accepts the selection as-is
///
/// Suited to fully enumerated package lists. Fails when a selected
/// repository package is no longer in the index.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughResolver;

impl Resolver for PassthroughResolver {
    fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Resolution> {
        let mut diagnostics = Vec::new();
        let mut members = Vec::with_capacity(request.selection.len());

        for member in request.selection.members() {
            let pkg = &member.package;
            let available = pkg.repo_id == LOCAL_REPO_ID
                || request
                    .index
                    .find_by_name_arch(&pkg.name, &pkg.arch)?
                    .iter()
                    .any(|p| p.repo_id == pkg.repo_id && p.key() == pkg.key());

            if available {
                members.push(member.clone());
            } else {
                diagnostics.push(format!("Package {} is not available", pkg.key()));
            }
        }

        if diagnostics.is_empty() {
            Ok(Resolution::Resolved(members))
        } else {
            Ok(Resolution::Failed(diagnostics))
        }
    }
}

/// Resolve the selection into the transaction's member list
///
/// Resolver diagnostics are kept verbatim in [`Error::Resolution`]. The
/// returned members are unique by package key.
pub fn build(
    resolver: &dyn Resolver,
    selection: &TransactionSet,
    index: &PackageIndex,
) -> Result<Vec<TransactionMember>> {
    info!("Building transaction for {} selected packages", selection.len());

    let request = ResolveRequest { selection, index };
    match resolver.resolve(&request)? {
        Resolution::Failed(diagnostics) => Err(Error::Resolution(diagnostics)),
        Resolution::Resolved(members) => {
            let mut unique = BTreeMap::new();
            for member in members {
                let key = member.key();
                if unique.insert(key.clone(), member).is_some() {
                    debug!("Resolver returned {} more than once", key);
                }
            }
            Ok(unique.into_values().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CandidatePackage, PackageKey};
    use crate::selector::SelectionReason;

    struct FailingResolver;

    impl Resolver for FailingResolver {
        fn resolve(&self, _request: &ResolveRequest<'_>) -> Result<Resolution> {
            Ok(Resolution::Failed(vec![
                "Error: Package: foo-1.0-1.x86_64 (base)".to_string(),
                "           Requires: libbar.so.1".to_string(),
            ]))
        }
    }

    struct DuplicatingResolver;

    impl Resolver for DuplicatingResolver {
        fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Resolution> {
            let mut members: Vec<_> = request.selection.members().cloned().collect();
            members.extend(request.selection.members().cloned());
            Ok(Resolution::Resolved(members))
        }
    }

    fn candidate(name: &str) -> CandidatePackage {
        let key = PackageKey::new(name, "x86_64", "1.0", "1");
        CandidatePackage::new("base", &key, "00", 10, format!("Packages/{}.rpm", key))
    }

    #[test]
    fn test_failed_resolution_keeps_diagnostics() {
        let index = PackageIndex::in_memory().unwrap();
        let set = TransactionSet::new();
        let err = build(&FailingResolver, &set, &index).unwrap_err();
        match err {
            Error::Resolution(lines) => {
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[1], "           Requires: libbar.so.1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_deduplicates_members() {
        let index = PackageIndex::in_memory().unwrap();
        let mut set = TransactionSet::new();
        set.add(TransactionMember::new(candidate("foo"), SelectionReason::User));
        set.add(TransactionMember::new(candidate("bar"), SelectionReason::User));

        let members = build(&DuplicatingResolver, &set, &index).unwrap();
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn test_passthrough_requires_indexed_packages() {
        let mut index = PackageIndex::in_memory().unwrap();
        let mut indexed = candidate("foo");
        index.insert_package(&mut indexed).unwrap();

        let mut set = TransactionSet::new();
        set.add(TransactionMember::new(indexed, SelectionReason::User));
        let members = build(&PassthroughResolver, &set, &index).unwrap();
        assert_eq!(members.len(), 1);

        set.add(TransactionMember::new(candidate("ghost"), SelectionReason::User));
        let err = build(&PassthroughResolver, &set, &index).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to build transaction: Package ghost-1.0-1.x86_64 is not available"
        );
    }
}
