// src/transaction/order.rs

//! Dependency check and install ordering
//!
//! Ordering is a Kahn topological sort over the transaction members with
//! two kinds of edges:
//! - hard: a pre-install requirement (must be installed before the
//!   dependent's scriptlets run)
//! - soft: any other requirement
//!
//! Soft edges inside a dependency loop are dropped at the lowest package
//! key; a loop made only of hard edges cannot be ordered.

use crate::db::models::{Capability, PackageKey};
use crate::error::{Error, Result};
use crate::selector::TransactionMember;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// A requirement no member of the transaction satisfies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmetDependency {
    pub package: PackageKey,
    pub requirement: Capability,
}

impl fmt::Display for UnmetDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requires {}", self.package, self.requirement)
    }
}

/// Report requirements that no transaction member satisfies
///
/// The check is advisory: unmet requirements are logged and returned, the
/// run is not stopped. `rpmlib()` requirements are ignored.
pub fn check_dependencies(members: &[TransactionMember]) -> Vec<UnmetDependency> {
    let mut unmet = Vec::new();

    for member in members {
        for req in &member.package.requires {
            if req.is_rpmlib() {
                continue;
            }
            let satisfied = members
                .iter()
                .any(|m| m.package.provides_capability(&req.capability));
            if !satisfied {
                unmet.push(UnmetDependency {
                    package: member.key(),
                    requirement: req.capability.clone(),
                });
            }
        }
    }

    if !unmet.is_empty() {
        for dep in &unmet {
            debug!("Unmet dependency: {}", dep);
        }
        warn!("Dependency check failed! ({} unmet requirements)", unmet.len());
    }

    unmet
}

/// Transaction members in install order
#[derive(Debug, Clone, Default)]
pub struct OrderedTransaction {
    steps: Vec<TransactionMember>,
}

impl OrderedTransaction {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionMember> {
        self.steps.iter()
    }

    pub fn keys(&self) -> Vec<PackageKey> {
        self.steps.iter().map(TransactionMember::key).collect()
    }

    pub fn get(&self, key: &PackageKey) -> Option<&TransactionMember> {
        self.steps.iter().find(|m| m.key() == *key)
    }
}

/// Order `members` so every package follows the packages it requires
///
/// The result is deterministic: among packages that are ready at the same
/// time, the lowest key goes first.
pub fn order(members: Vec<TransactionMember>) -> Result<OrderedTransaction> {
    // pending[a][b] = a still waits for b; the value is true for hard edges
    let mut pending: BTreeMap<PackageKey, BTreeMap<PackageKey, bool>> = BTreeMap::new();
    let mut dependents: BTreeMap<PackageKey, BTreeSet<PackageKey>> = BTreeMap::new();
    let mut by_key: BTreeMap<PackageKey, TransactionMember> = BTreeMap::new();

    for member in &members {
        let key = member.key();
        let deps = pending.entry(key.clone()).or_default();

        for req in &member.package.requires {
            if req.is_rpmlib() {
                continue;
            }
            for provider in members
                .iter()
                .filter(|p| p.package.provides_capability(&req.capability))
            {
                let provider_key = provider.key();
                if provider_key == key {
                    continue;
                }
                let hard = deps.entry(provider_key.clone()).or_insert(false);
                *hard |= req.pre;
                dependents
                    .entry(provider_key)
                    .or_default()
                    .insert(key.clone());
            }
        }
    }
    for member in members {
        by_key.insert(member.key(), member);
    }

    let mut ready: BTreeSet<PackageKey> = pending
        .iter()
        .filter(|(_, deps)| deps.is_empty())
        .map(|(key, _)| key.clone())
        .collect();
    let mut steps = Vec::with_capacity(by_key.len());

    while steps.len() < by_key.len() {
        let Some(key) = ready.pop_first() else {
            let breakable = pending
                .iter()
                .find(|(_, deps)| deps.values().any(|hard| !*hard))
                .map(|(key, _)| key.clone());

            let Some(key) = breakable else {
                let stuck: Vec<String> = hard_loop(&pending).iter().map(|k| k.to_string()).collect();
                return Err(Error::Ordering(format!(
                    "pre-install requirements form a loop between {}",
                    stuck.join(", ")
                )));
            };

            debug!("Breaking dependency loop at {}", key);
            if let Some(deps) = pending.get_mut(&key) {
                deps.retain(|_, hard| *hard);
                if deps.is_empty() {
                    ready.insert(key);
                }
            }
            continue;
        };

        pending.remove(&key);
        if let Some(waiting) = dependents.get(&key) {
            for dependent in waiting {
                if let Some(deps) = pending.get_mut(dependent) {
                    deps.remove(&key);
                    if deps.is_empty() {
                        ready.insert(dependent.clone());
                    }
                }
            }
        }

        if let Some(member) = by_key.get(&key) {
            steps.push(member.clone());
        }
    }

    debug!("Ordered {} packages", steps.len());
    Ok(OrderedTransaction { steps })
}

/// Packages on a loop of waiting edges
///
/// Peels off packages that wait on nothing left and packages nothing left
/// waits on, until only the loop members remain.
fn hard_loop(pending: &BTreeMap<PackageKey, BTreeMap<PackageKey, bool>>) -> Vec<PackageKey> {
    let mut remaining: BTreeSet<&PackageKey> = pending.keys().collect();
    loop {
        let peeled: Vec<&PackageKey> = remaining
            .iter()
            .copied()
            .filter(|key| {
                let waits = pending[*key].keys().any(|dep| remaining.contains(dep));
                let awaited = remaining
                    .iter()
                    .any(|other| pending[*other].contains_key(*key));
                !waits || !awaited
            })
            .collect();
        if peeled.is_empty() {
            return remaining.into_iter().cloned().collect();
        }
        for key in peeled {
            remaining.remove(key);
        }
    }
}
