// src/transaction/report.rs

//! Outcome metadata of an executed transaction

use super::executor::ExecutionReport;
use super::order::OrderedTransaction;
use crate::db::models::PackageKey;
use crate::progress::CacheSummary;
use std::collections::{BTreeMap, BTreeSet};

/// License string recorded for packages that declare none
pub const UNKNOWN_LICENSE: &str = "Unknown";

/// License, content and VCS maps of successfully installed packages
///
/// Keys are package keys in their `name-version-release.arch` form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionReport {
    licenses: BTreeMap<String, Vec<String>>,
    content: BTreeMap<String, Vec<String>>,
    vcs: BTreeMap<String, Option<String>>,
    /// Package name → key, for lookups by name
    names: BTreeMap<String, String>,
}

impl TransactionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every package the executor applied successfully
    pub fn record(&mut self, transaction: &OrderedTransaction, execution: &ExecutionReport) {
        let succeeded: BTreeSet<&PackageKey> = execution
            .outcomes
            .iter()
            .filter(|o| o.success)
            .map(|o| &o.key)
            .collect();

        for member in transaction.iter() {
            let key = member.key();
            if !succeeded.contains(&key) {
                continue;
            }
            let pkg = &member.package;
            let long_name = key.to_string();

            let license = pkg.license.as_deref().unwrap_or(UNKNOWN_LICENSE);
            let owners = self.licenses.entry(license.to_string()).or_default();
            if !owners.contains(&long_name) {
                owners.push(long_name.clone());
            }

            self.content.insert(long_name.clone(), pkg.files.clone());
            self.vcs.insert(long_name.clone(), pkg.vcs.clone());
            self.names.insert(pkg.name.clone(), long_name);
        }
    }

    /// License → package keys
    pub fn licenses(&self) -> &BTreeMap<String, Vec<String>> {
        &self.licenses
    }

    /// Package key → file manifest
    pub fn content(&self) -> &BTreeMap<String, Vec<String>> {
        &self.content
    }

    /// Package key → VCS reference
    pub fn vcs(&self) -> &BTreeMap<String, Option<String>> {
        &self.vcs
    }

    /// File manifest of an installed package, by name
    pub fn file_list(&self, name: &str) -> Option<&[String]> {
        self.names
            .get(name)
            .and_then(|key| self.content.get(key))
            .map(Vec::as_slice)
    }
}

/// Summary returned by a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub cache: CacheSummary,
    /// Packages in install order
    pub installed: Vec<PackageKey>,
    /// Packages the executor failed to apply
    pub failed: Vec<PackageKey>,
    /// Requirements the advisory dependency check found unmet
    pub unmet_dependencies: Vec<String>,
    /// Aggregate executor result code
    pub return_code: i32,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.return_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CandidatePackage;
    use crate::selector::{SelectionReason, TransactionMember};
    use crate::transaction::{PackageOutcome, order};

    fn member(name: &str, license: Option<&str>) -> TransactionMember {
        let key = PackageKey::new(name, "x86_64", "1.0", "1");
        let mut pkg = CandidatePackage::new("base", &key, "00", 1, format!("{}.rpm", name));
        pkg.license = license.map(str::to_string);
        pkg.vcs = Some(format!("git://example.com/{}#abc", name));
        pkg.files = vec![format!("/usr/bin/{}", name)];
        TransactionMember::new(pkg, SelectionReason::User)
    }

    #[test]
    fn test_only_successful_packages_are_recorded() {
        let tx = order(vec![
            member("bash", Some("GPLv3+")),
            member("zsh", Some("MIT")),
            member("sed", Some("GPLv3+")),
            member("motd", None),
        ])
        .unwrap();
        let execution = ExecutionReport {
            outcomes: vec![
                PackageOutcome::installed(PackageKey::new("bash", "x86_64", "1.0", "1")),
                PackageOutcome::installed(PackageKey::new("sed", "x86_64", "1.0", "1")),
                PackageOutcome::installed(PackageKey::new("motd", "x86_64", "1.0", "1")),
                PackageOutcome::failed(PackageKey::new("zsh", "x86_64", "1.0", "1"), "cpio"),
            ],
            return_code: 1,
        };

        let mut report = TransactionReport::new();
        report.record(&tx, &execution);

        assert_eq!(
            report.licenses()["GPLv3+"],
            vec!["bash-1.0-1.x86_64", "sed-1.0-1.x86_64"]
        );
        assert!(!report.licenses().contains_key("MIT"));
        assert_eq!(report.licenses()[UNKNOWN_LICENSE], vec!["motd-1.0-1.x86_64"]);
        assert_eq!(report.content().len(), 3);
        assert_eq!(
            report.file_list("sed"),
            Some(&["/usr/bin/sed".to_string()][..])
        );
        assert_eq!(report.file_list("zsh"), None);
        assert_eq!(
            report.vcs()["bash-1.0-1.x86_64"].as_deref(),
            Some("git://example.com/bash#abc")
        );
    }
}
