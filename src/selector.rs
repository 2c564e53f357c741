// src/selector.rs

//! Package selection state
//!
//! This module handles what the caller asked for: individual packages,
//! package groups, local package files and the "must be present"
//! checklist. Selection is only ever changed through the select/deselect
//! operations here; resolution never rewrites it.

use crate::db::PackageIndex;
use crate::db::models::{CandidatePackage, Group, PackageKey};
use crate::error::{Error, Lookup, Result};
use crate::packages::PackageFormat;
use crate::packages::rpm::RpmPackage;
use crate::repository::{DEFAULT_COST, DEFAULT_PRIORITY, RepositoryRegistry};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Repository id given to packages installed from local files
pub const LOCAL_REPO_ID: &str = "@commandline";

/// How group members are selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupMode {
    /// Mandatory and default members
    #[default]
    Default,
    /// Mandatory members only: defaults are selected, then deselected again
    Required,
    /// Mandatory, default and optional members
    All,
}

/// Install state of a transaction member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberState {
    Install,
    Update,
}

/// Why a package is part of the transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionReason {
    /// Selected by pattern
    User,
    /// Member of the named group
    Group(String),
    /// Pulled in because the named package is part of the transaction
    Conditional(String),
    /// Supplied as a local file
    Local,
    /// Added by the resolver
    Dependency,
}

/// One package of the transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionMember {
    pub package: CandidatePackage,
    pub state: MemberState,
    pub reason: SelectionReason,
}

impl TransactionMember {
    pub fn new(package: CandidatePackage, reason: SelectionReason) -> Self {
        Self {
            package,
            state: MemberState::Install,
            reason,
        }
    }

    pub fn key(&self) -> PackageKey {
        self.package.key()
    }
}

/// Selected packages plus conditional bookkeeping
///
/// `conditionals` maps the name of a required package to the packages
/// that are wanted whenever it is part of the transaction.
#[derive(Debug, Clone, Default)]
pub struct TransactionSet {
    members: BTreeMap<PackageKey, TransactionMember>,
    conditionals: BTreeMap<String, BTreeMap<PackageKey, CandidatePackage>>,
}

impl TransactionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> impl Iterator<Item = &TransactionMember> {
        self.members.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PackageKey> {
        self.members.keys()
    }

    pub fn get(&self, key: &PackageKey) -> Option<&TransactionMember> {
        self.members.get(key)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.members.keys().any(|k| k.name == name)
    }

    /// Add a member, replacing any member with the same name and arch
    pub fn add(&mut self, member: TransactionMember) -> PackageKey {
        let key = member.key();
        let replaced: Vec<PackageKey> = self
            .members
            .keys()
            .filter(|k| k.name == key.name && k.arch == key.arch && **k != key)
            .cloned()
            .collect();
        for old in replaced {
            debug!("Replacing {} with {}", old, key);
            self.members.remove(&old);
        }
        self.members.entry(key.clone()).or_insert(member);
        key
    }

    /// Remove a member from the selection and from every conditional set
    pub fn remove(&mut self, key: &PackageKey) -> Option<TransactionMember> {
        self.purge_conditional(key);
        self.members.remove(key)
    }

    /// Drop `key` from every conditional set, returning whether any held it
    pub fn purge_conditional(&mut self, key: &PackageKey) -> bool {
        let mut purged = false;
        for pkgs in self.conditionals.values_mut() {
            purged |= pkgs.remove(key).is_some();
        }
        purged
    }

    /// Record that `package` is wanted whenever `requires` is installed
    pub fn add_conditional(&mut self, requires: &str, package: CandidatePackage) {
        self.conditionals
            .entry(requires.to_string())
            .or_default()
            .insert(package.key(), package);
    }

    /// Conditional bookkeeping: required package name → wanted packages
    pub fn conditionals(&self) -> &BTreeMap<String, BTreeMap<PackageKey, CandidatePackage>> {
        &self.conditionals
    }

    /// Packages conditionally wanted by `requires`
    pub fn conditional_keys(&self, requires: &str) -> Vec<PackageKey> {
        self.conditionals
            .get(requires)
            .map(|pkgs| pkgs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Select conditional packages whose required package is a member
    ///
    /// Repeats until no more packages are added. Returns the added keys.
    pub fn apply_conditionals(&mut self) -> Vec<PackageKey> {
        let mut added = Vec::new();
        loop {
            let pending: Vec<(String, CandidatePackage)> = self
                .conditionals
                .iter()
                .filter(|(requires, _)| self.contains_name(requires))
                .flat_map(|(requires, pkgs)| {
                    pkgs.values()
                        .filter(|pkg| !self.members.contains_key(&pkg.key()))
                        .map(|pkg| (requires.clone(), pkg.clone()))
                })
                .collect();

            if pending.is_empty() {
                return added;
            }
            for (requires, pkg) in pending {
                added.push(self.add(TransactionMember::new(
                    pkg,
                    SelectionReason::Conditional(requires),
                )));
            }
        }
    }
}

/// Read access to the available packages and their repositories
#[derive(Clone, Copy)]
pub struct Sack<'a> {
    pub index: &'a PackageIndex,
    pub repos: &'a RepositoryRegistry,
}

impl<'a> Sack<'a> {
    pub fn new(index: &'a PackageIndex, repos: &'a RepositoryRegistry) -> Self {
        Self { index, repos }
    }

    fn repo_rank(&self, repo_id: &str) -> (u32, u32) {
        self.repos
            .get(repo_id)
            .map(|r| (r.priority, r.cost))
            .unwrap_or((DEFAULT_PRIORITY, DEFAULT_COST))
    }

    /// Order two candidates of the same name, best first
    fn compare(&self, a: &CandidatePackage, b: &CandidatePackage) -> Ordering {
        let arch = self.repos.arch();
        b.evr()
            .cmp(&a.evr())
            .then_with(|| self.repo_rank(&a.repo_id).cmp(&self.repo_rank(&b.repo_id)))
            .then_with(|| arch.preference(&a.arch).cmp(&arch.preference(&b.arch)))
    }

    /// Best installable candidate per package name matching `pattern`
    pub fn best_candidates(&self, pattern: &str) -> Result<Vec<CandidatePackage>> {
        let arch = self.repos.arch();
        let mut by_name: BTreeMap<String, Vec<CandidatePackage>> = BTreeMap::new();

        for pkg in self.index.search(pattern)? {
            if pkg.repo_id != LOCAL_REPO_ID
                && let Some(repo) = self.repos.get(&pkg.repo_id)
                && !repo.enabled
            {
                continue;
            }
            if !arch.is_compatible(&pkg.arch) {
                debug!("Skipping {} with incompatible arch", pkg.key());
                continue;
            }
            by_name.entry(pkg.name.clone()).or_default().push(pkg);
        }

        Ok(by_name
            .into_values()
            .filter_map(|mut candidates| {
                candidates.sort_by(|a, b| self.compare(a, b));
                candidates.into_iter().next()
            })
            .collect())
    }
}

/// Selection state for one session
#[derive(Debug, Default)]
pub struct Selector {
    set: TransactionSet,
    checklist: Vec<String>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction(&self) -> &TransactionSet {
        &self.set
    }

    pub fn transaction_mut(&mut self) -> &mut TransactionSet {
        &mut self.set
    }

    /// Select the best package for every name matching `pattern`
    pub fn select_package(&mut self, sack: Sack<'_>, pattern: &str) -> Result<Lookup<Vec<PackageKey>>> {
        self.select_with_reason(sack, pattern, SelectionReason::User)
    }

    fn select_with_reason(
        &mut self,
        sack: Sack<'_>,
        pattern: &str,
        reason: SelectionReason,
    ) -> Result<Lookup<Vec<PackageKey>>> {
        let candidates = sack.best_candidates(pattern)?;
        if candidates.is_empty() {
            debug!("No package matches '{}'", pattern);
            return Ok(Lookup::NotFound(
                "No package(s) available to install".to_string(),
            ));
        }

        let keys = candidates
            .into_iter()
            .map(|pkg| {
                debug!("Selected {} from {}", pkg.key(), pkg.repo_id);
                self.set.add(TransactionMember::new(pkg, reason.clone()))
            })
            .collect();
        Ok(Lookup::Found(keys))
    }

    /// Remove every member matching `pattern`
    ///
    /// Members matching the exact `name.arch` are removed first; otherwise
    /// the pattern is searched in the package index and every match is
    /// dropped from the selection and from the conditional sets, whether
    /// or not it is selected yet. Removing nothing is reported, not an
    /// error.
    pub fn deselect_package(&mut self, sack: Sack<'_>, pattern: &str) -> Result<Lookup<Vec<PackageKey>>> {
        let mut removed: Vec<PackageKey> = match pattern.rsplit_once('.') {
            Some((name, arch)) => self
                .set
                .keys()
                .filter(|k| k.name == name && k.arch == arch)
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        if removed.is_empty() {
            let found: BTreeSet<PackageKey> = sack
                .index
                .search(pattern)?
                .into_iter()
                .map(|pkg| pkg.key())
                .collect();
            for key in found {
                let member = self.set.get(&key).is_some();
                if self.set.purge_conditional(&key) || member {
                    removed.push(key);
                }
            }
        }

        if removed.is_empty() {
            let message = format!("No such package {} to remove", pattern);
            warn!("{}", message);
            return Ok(Lookup::NotFound(message));
        }

        for key in &removed {
            debug!("Deselected {}", key);
            self.set.remove(key);
        }
        Ok(Lookup::Found(removed))
    }

    /// Select the members of a group
    pub fn select_group(
        &mut self,
        sack: Sack<'_>,
        group: &str,
        mode: GroupMode,
    ) -> Result<Lookup<Vec<PackageKey>>> {
        let Some(group) = sack.index.find_group(group)? else {
            return Ok(Lookup::NotFound(format!("No such group {}", group)));
        };
        info!("Selecting group {} ({:?})", group.group_id, mode);

        let reason = SelectionReason::Group(group.group_id.clone());
        let mut selected = Vec::new();

        for name in group
            .mandatory_packages
            .iter()
            .chain(group.default_packages.iter())
        {
            self.select_member(sack, &group, name, &reason, &mut selected)?;
        }

        for (name, requires) in &group.conditional_packages {
            for pkg in sack.best_candidates(name)? {
                if self.set.contains_name(requires) {
                    selected.push(self.set.add(TransactionMember::new(
                        pkg.clone(),
                        SelectionReason::Conditional(requires.clone()),
                    )));
                }
                self.set.add_conditional(requires, pkg);
            }
        }

        match mode {
            GroupMode::Default => {}
            GroupMode::Required => {
                for name in &group.default_packages {
                    if let Lookup::Found(keys) = self.deselect_package(sack, name)? {
                        selected.retain(|k| !keys.contains(k));
                    }
                }
            }
            GroupMode::All => {
                for name in &group.optional_packages {
                    self.select_member(sack, &group, name, &reason, &mut selected)?;
                }
            }
        }

        Ok(Lookup::Found(selected))
    }

    fn select_member(
        &mut self,
        sack: Sack<'_>,
        group: &Group,
        name: &str,
        reason: &SelectionReason,
        selected: &mut Vec<PackageKey>,
    ) -> Result<()> {
        match self.select_with_reason(sack, name, reason.clone())? {
            Lookup::Found(keys) => selected.extend(keys),
            Lookup::NotFound(_) => {
                debug!("Group {} member {} is not available", group.group_id, name);
            }
        }
        Ok(())
    }

    /// Register a package name that must be part of the final download set
    pub fn check_package(&mut self, name: &str) {
        if !self.checklist.iter().any(|n| n == name) {
            self.checklist.push(name.to_string());
        }
    }

    pub fn checklist(&self) -> &[String] {
        &self.checklist
    }

    /// Fail with every checklist name that is absent from `names`
    ///
    /// Missing names are reported in registration order.
    pub fn verify_checklist<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> Result<()> {
        let mut remaining = self.checklist.clone();
        for name in names {
            remaining.retain(|n| n != name);
            if remaining.is_empty() {
                return Ok(());
            }
        }
        if remaining.is_empty() {
            Ok(())
        } else {
            Err(Error::RequiredPackageMissing(remaining))
        }
    }

    /// Add a package file from local disk to the transaction
    ///
    /// Any selected package of the same name is deselected first. The file
    /// itself serves as the cached package.
    pub fn install_local(
        &mut self,
        index: &mut PackageIndex,
        repos: &RepositoryRegistry,
        path: &Path,
    ) -> Result<PackageKey> {
        let rpm = RpmPackage::parse(path)?;
        let mut pkg = rpm.to_candidate(LOCAL_REPO_ID);
        let key = pkg.key();

        let _ = self.deselect_package(Sack::new(index, repos), &key.name)?;

        let already_indexed = index
            .find_by_name_arch(&key.name, &key.arch)?
            .iter()
            .any(|p| p.repo_id == LOCAL_REPO_ID && p.key() == key);
        if !already_indexed {
            index.insert_package(&mut pkg)?;
        }

        info!("Adding local package {}", key);
        Ok(self
            .set
            .add(TransactionMember::new(pkg, SelectionReason::Local)))
    }

    /// Whether a member of the transaction ships `path`
    pub fn install_has_file(&self, path: &str) -> bool {
        self.set
            .members()
            .filter(|m| matches!(m.state, MemberState::Install | MemberState::Update))
            .any(|m| m.package.files.iter().any(|f| f == path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ArchInfo;
    use crate::config::RepositoryConfig;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        index: PackageIndex,
        repos: RepositoryRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut repos =
                RepositoryRegistry::new(ArchInfo::new("x86_64"), dir.path(), dir.path().join("p"));
            repos
                .add_repository(&RepositoryConfig::with_baseurl("base", "https://example.com/base/"))
                .unwrap();
            let mut updates = RepositoryConfig::with_baseurl("updates", "https://example.com/up/");
            updates.priority = Some(10);
            repos.add_repository(&updates).unwrap();

            Self {
                _dir: dir,
                index: PackageIndex::in_memory().unwrap(),
                repos,
            }
        }

        fn add(&mut self, repo: &str, name: &str, arch: &str, version: &str) {
            let key = PackageKey::new(name, arch, version, "1");
            let mut pkg = CandidatePackage::new(repo, &key, "sum", 10, format!("{}.rpm", key));
            pkg.files = vec![format!("/usr/bin/{}", name)];
            self.index.insert_package(&mut pkg).unwrap();
        }

        fn sack(&self) -> Sack<'_> {
            Sack::new(&self.index, &self.repos)
        }
    }

    fn selected_names(selector: &Selector) -> Vec<String> {
        selector
            .transaction()
            .keys()
            .map(|k| format!("{}.{}", k.name, k.arch))
            .collect()
    }

    #[test]
    fn test_select_picks_highest_version() {
        let mut fx = Fixture::new();
        fx.add("base", "bash", "x86_64", "5.1");
        fx.add("base", "bash", "x86_64", "5.2");
        fx.add("base", "bash", "i686", "5.2");

        let mut selector = Selector::new();
        let keys = selector.select_package(fx.sack(), "bash").unwrap().found().unwrap();
        // Same version: the native arch is preferred
        assert_eq!(keys, vec![PackageKey::new("bash", "x86_64", "5.2", "1")]);

        let mut selector = Selector::new();
        let keys = selector
            .select_package(fx.sack(), "bash.i686")
            .unwrap()
            .found()
            .unwrap();
        assert_eq!(keys, vec![PackageKey::new("bash", "i686", "5.2", "1")]);
    }

    #[test]
    fn test_priority_breaks_version_ties() {
        let mut fx = Fixture::new();
        fx.add("base", "zlib", "x86_64", "1.3");
        fx.add("updates", "zlib", "x86_64", "1.3");

        let mut selector = Selector::new();
        selector.select_package(fx.sack(), "zlib").unwrap().found().unwrap();
        let member = selector.transaction().members().next().unwrap();
        assert_eq!(member.package.repo_id, "updates");
    }

    #[test]
    fn test_incompatible_arch_is_not_selected() {
        let mut fx = Fixture::new();
        fx.add("base", "firmware", "aarch64", "1.0");

        let mut selector = Selector::new();
        let result = selector.select_package(fx.sack(), "firmware").unwrap();
        assert_eq!(result.message(), Some("No package(s) available to install"));
        assert!(selector.transaction().is_empty());
    }

    #[test]
    fn test_glob_selects_one_per_name() {
        let mut fx = Fixture::new();
        fx.add("base", "python3", "x86_64", "3.12");
        fx.add("base", "python3-libs", "x86_64", "3.12");
        fx.add("base", "python3-libs", "x86_64", "3.11");

        let mut selector = Selector::new();
        let keys = selector.select_package(fx.sack(), "python3*").unwrap().found().unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_deselect_is_idempotent() {
        let mut fx = Fixture::new();
        fx.add("base", "vim", "x86_64", "9.1");

        let mut selector = Selector::new();
        let _ = selector.select_package(fx.sack(), "vim").unwrap();

        let first = selector.deselect_package(fx.sack(), "vim.x86_64").unwrap();
        assert!(first.is_found());
        assert!(selector.transaction().is_empty());

        let second = selector.deselect_package(fx.sack(), "vim.x86_64").unwrap();
        assert_eq!(second.message(), Some("No such package vim.x86_64 to remove"));
        assert!(selector.transaction().is_empty());
    }

    #[test]
    fn test_deselect_falls_back_to_index_search() {
        let mut fx = Fixture::new();
        fx.add("base", "kernel", "x86_64", "6.8");
        fx.add("base", "kernel-core", "x86_64", "6.8");

        let mut selector = Selector::new();
        let _ = selector.select_package(fx.sack(), "kernel*").unwrap();
        assert_eq!(selector.transaction().len(), 2);

        let removed = selector.deselect_package(fx.sack(), "kernel-c*").unwrap();
        assert_eq!(removed.found().unwrap().len(), 1);
        assert_eq!(selected_names(&selector), vec!["kernel.x86_64"]);
    }

    #[test]
    fn test_checklist_reports_missing_in_registration_order() {
        let mut selector = Selector::new();
        selector.check_package("kernel");
        selector.check_package("bash");
        selector.check_package("grub2");
        selector.check_package("kernel");

        assert!(selector.verify_checklist(["bash", "kernel", "grub2"]).is_ok());

        match selector.verify_checklist(["bash"]) {
            Err(Error::RequiredPackageMissing(names)) => {
                assert_eq!(names, vec!["kernel", "grub2"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_install_has_file() {
        let mut fx = Fixture::new();
        fx.add("base", "coreutils", "x86_64", "9.4");

        let mut selector = Selector::new();
        assert!(!selector.install_has_file("/usr/bin/coreutils"));
        let _ = selector.select_package(fx.sack(), "coreutils").unwrap();
        assert!(selector.install_has_file("/usr/bin/coreutils"));
        assert!(!selector.install_has_file("/usr/bin/ls"));
    }

    #[test]
    fn test_unknown_group_is_not_found() {
        let fx = Fixture::new();
        let mut selector = Selector::new();
        let result = selector
            .select_group(fx.sack(), "nonexistent", GroupMode::All)
            .unwrap();
        assert!(!result.is_found());
    }

    #[test]
    fn test_group_modes() {
        let mut fx = Fixture::new();
        for name in ["m1", "d1", "d2", "o1"] {
            fx.add("base", name, "noarch", "1.0");
        }
        let mut group = Group::new("g", "G");
        group.repo_id = "base".to_string();
        group.mandatory_packages = vec!["m1".to_string()];
        group.default_packages = vec!["d1".to_string(), "d2".to_string()];
        group.optional_packages = vec!["o1".to_string(), "missing".to_string()];
        fx.index.insert_group(&group).unwrap();

        let mut selector = Selector::new();
        let _ = selector.select_group(fx.sack(), "g", GroupMode::Default).unwrap();
        assert_eq!(
            selected_names(&selector),
            vec!["d1.noarch", "d2.noarch", "m1.noarch"]
        );

        let mut selector = Selector::new();
        let keys = selector
            .select_group(fx.sack(), "g", GroupMode::Required)
            .unwrap()
            .found()
            .unwrap();
        assert_eq!(selected_names(&selector), vec!["m1.noarch"]);
        assert_eq!(keys.len(), 1);

        let mut selector = Selector::new();
        let _ = selector.select_group(fx.sack(), "g", GroupMode::All).unwrap();
        assert_eq!(selector.transaction().len(), 4);
    }

    #[test]
    fn test_conditionals_survive_partial_deselect() {
        let mut fx = Fixture::new();
        for name in ["dep", "p1", "p2"] {
            fx.add("base", name, "noarch", "1.0");
        }
        let mut group = Group::new("extras", "Extras");
        group.mandatory_packages = vec!["dep".to_string()];
        group.conditional_packages = vec![
            ("p1".to_string(), "dep".to_string()),
            ("p2".to_string(), "dep".to_string()),
        ];
        fx.index.insert_group(&group).unwrap();

        let mut selector = Selector::new();
        let _ = selector
            .select_group(fx.sack(), "extras", GroupMode::Default)
            .unwrap();
        assert_eq!(selector.transaction().len(), 3);

        let _ = selector.deselect_package(fx.sack(), "p1.noarch").unwrap();
        let refs = selector.transaction().conditional_keys("dep");
        assert_eq!(refs, vec![PackageKey::new("p2", "noarch", "1.0", "1")]);
        assert!(selector.transaction().contains_name("dep"));

        // Applying conditionals must not bring p1 back
        let added = selector.transaction_mut().apply_conditionals();
        assert!(added.is_empty());
        assert!(!selector.transaction().contains_name("p1"));
    }

    #[test]
    fn test_conditional_applied_once_trigger_selected() {
        let mut fx = Fixture::new();
        fx.add("base", "bash", "x86_64", "5.2");
        fx.add("base", "bash-completion", "noarch", "2.11");
        let mut group = Group::new("shell", "Shell");
        group.conditional_packages = vec![("bash-completion".to_string(), "bash".to_string())];
        fx.index.insert_group(&group).unwrap();

        let mut selector = Selector::new();
        let _ = selector
            .select_group(fx.sack(), "shell", GroupMode::Default)
            .unwrap();
        assert!(selector.transaction().is_empty());

        let _ = selector.select_package(fx.sack(), "bash").unwrap();
        let added = selector.transaction_mut().apply_conditionals();
        assert_eq!(added.len(), 1);
        assert!(selector.transaction().contains_name("bash-completion"));
    }

    #[test]
    fn test_deselect_drops_pending_conditional() {
        let mut fx = Fixture::new();
        fx.add("base", "p1", "x86_64", "1.0");
        fx.add("base", "dep", "x86_64", "1.0");
        let mut group = Group::new("tools", "Tools");
        group.conditional_packages = vec![("dep".to_string(), "p1".to_string())];
        fx.index.insert_group(&group).unwrap();

        let mut selector = Selector::new();
        let _ = selector
            .select_group(fx.sack(), "tools", GroupMode::Default)
            .unwrap();
        assert_eq!(selector.transaction().conditional_keys("p1").len(), 1);

        let removed = selector.deselect_package(fx.sack(), "dep").unwrap();
        assert_eq!(
            removed.found().unwrap(),
            vec![PackageKey::new("dep", "x86_64", "1.0", "1")]
        );
        assert!(selector.transaction().conditional_keys("p1").is_empty());

        let _ = selector.select_package(fx.sack(), "p1").unwrap();
        let added = selector.transaction_mut().apply_conditionals();
        assert!(added.is_empty());
        assert_eq!(selected_names(&selector), vec!["p1.x86_64"]);

        let again = selector.deselect_package(fx.sack(), "dep").unwrap();
        assert!(!again.is_found());
    }
}
