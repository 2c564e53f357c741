// src/arch.rs

//! Architecture table and URL template substitution
//!
//! Maps a canonical architecture to its base architecture (the value of
//! `$basearch` in repository URLs) and to the list of architectures whose
//! packages can be installed on it.

use std::env;

/// Canonical arch → (base arch, compatible arches in preference order)
///
/// `noarch` is implicitly compatible with everything and is not listed.
const ARCH_TABLE: &[(&str, &str, &[&str])] = &[
    ("x86_64", "x86_64", &["x86_64", "athlon", "i686", "i586", "i486", "i386"]),
    ("athlon", "i386", &["athlon", "i686", "i586", "i486", "i386"]),
    ("i686", "i386", &["i686", "i586", "i486", "i386"]),
    ("i586", "i386", &["i586", "i486", "i386"]),
    ("i486", "i386", &["i486", "i386"]),
    ("i386", "i386", &["i386"]),
    ("aarch64", "aarch64", &["aarch64"]),
    ("armv7tnhl", "armhfp", &["armv7tnhl", "armv7thl", "armv7nhl", "armv7hl"]),
    ("armv7thl", "armhfp", &["armv7thl", "armv7hl"]),
    ("armv7nhl", "armhfp", &["armv7nhl", "armv7hl"]),
    ("armv7hl", "armhfp", &["armv7hl"]),
    ("armv7l", "arm", &["armv7l", "armv6l", "armv5tejl", "armv5tel"]),
    ("armv6l", "arm", &["armv6l", "armv5tejl", "armv5tel"]),
    ("ppc64le", "ppc64le", &["ppc64le"]),
    ("s390x", "s390x", &["s390x"]),
    ("riscv64", "riscv64", &["riscv64"]),
];

/// Architecture settings for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchInfo {
    canon: String,
}

impl ArchInfo {
    /// Use the given target architecture
    pub fn new(canon: impl Into<String>) -> Self {
        Self {
            canon: canon.into(),
        }
    }

    /// Use the target architecture if given, else the host architecture
    pub fn for_target(target: Option<&str>) -> Self {
        match target {
            Some(arch) => Self::new(arch),
            None => Self::new(env::consts::ARCH),
        }
    }

    /// Canonical architecture (`$arch`)
    pub fn canon_arch(&self) -> &str {
        &self.canon
    }

    /// Base architecture (`$basearch`)
    ///
    /// Unknown architectures are their own base.
    pub fn base_arch(&self) -> &str {
        match ARCH_TABLE.iter().find(|(canon, _, _)| *canon == self.canon) {
            Some(&(_, base, _)) => base,
            None => self.canon.as_str(),
        }
    }

    /// Whether packages built for `pkg_arch` can be installed on this target
    pub fn is_compatible(&self, pkg_arch: &str) -> bool {
        pkg_arch == "noarch" || self.preference(pkg_arch).is_some()
    }

    /// Rank of `pkg_arch` among compatible arches (0 is best)
    ///
    /// `noarch` ranks after every arch-specific build.
    pub fn preference(&self, pkg_arch: &str) -> Option<usize> {
        if pkg_arch == self.canon {
            return Some(0);
        }
        match ARCH_TABLE.iter().find(|(canon, _, _)| *canon == self.canon) {
            Some((_, _, compat)) => compat
                .iter()
                .position(|a| *a == pkg_arch)
                .or_else(|| (pkg_arch == "noarch").then_some(compat.len())),
            None => (pkg_arch == "noarch").then_some(1),
        }
    }

    /// Substitute `$basearch` and `$arch` in a repository URL template
    pub fn substitute(&self, template: &str) -> String {
        template
            .replace("$basearch", self.base_arch())
            .replace("$arch", self.canon_arch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_arch_lookup() {
        assert_eq!(ArchInfo::new("x86_64").base_arch(), "x86_64");
        assert_eq!(ArchInfo::new("i686").base_arch(), "i386");
        assert_eq!(ArchInfo::new("armv7tnhl").base_arch(), "armhfp");
        assert_eq!(ArchInfo::new("mips").base_arch(), "mips");
    }

    #[test]
    fn test_substitute_basearch_before_arch() {
        let arch = ArchInfo::new("i686");
        assert_eq!(
            arch.substitute("http://mirror/$basearch/os/$arch/"),
            "http://mirror/i386/os/i686/"
        );
    }

    #[test]
    fn test_compatibility() {
        let arch = ArchInfo::new("x86_64");
        assert!(arch.is_compatible("x86_64"));
        assert!(arch.is_compatible("i686"));
        assert!(arch.is_compatible("noarch"));
        assert!(!arch.is_compatible("aarch64"));

        let arm = ArchInfo::new("armv7thl");
        assert!(arm.is_compatible("armv7hl"));
        assert!(!arm.is_compatible("armv7nhl"));
    }

    #[test]
    fn test_preference_orders_native_first() {
        let arch = ArchInfo::new("x86_64");
        assert!(arch.preference("x86_64") < arch.preference("i686"));
        assert!(arch.preference("i686") < arch.preference("noarch"));
        assert_eq!(arch.preference("ppc64le"), None);
    }
}
