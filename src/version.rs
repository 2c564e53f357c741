// src/version.rs

//! RPM version comparison
//!
//! Implements the rpmvercmp segment comparison used to pick the newest
//! candidate among packages of the same name, and to evaluate versioned
//! requirements during the advisory dependency check.

use std::cmp::Ordering;
use std::fmt;

/// An epoch:version-release triple
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Evr {
    pub epoch: u32,
    pub version: String,
    pub release: String,
}

impl Evr {
    pub fn new(epoch: u32, version: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release: release.into(),
        }
    }

    /// Parse `[epoch:]version[-release]`
    ///
    /// A missing or unparsable epoch is treated as 0, a missing release as
    /// the empty string (which compares equal to any release when matching
    /// requirements).
    pub fn parse(s: &str) -> Self {
        let (epoch, rest) = match s.split_once(':') {
            Some((e, r)) => (e.parse().unwrap_or(0), r),
            None => (0, s),
        };
        let (version, release) = match rest.rsplit_once('-') {
            Some((v, r)) => (v, r),
            None => (rest, ""),
        };
        Self::new(epoch, version, release)
    }
}

impl fmt::Display for Evr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if !self.release.is_empty() {
            write!(f, "-{}", self.release)?;
        }
        Ok(())
    }
}

impl Ord for Evr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| rpmvercmp(&self.version, &other.version))
            .then_with(|| rpmvercmp(&self.release, &other.release))
    }
}

impl PartialOrd for Evr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two version strings segment by segment, the way rpm does
///
/// Strings are split into alternating runs of digits and letters; other
/// characters only separate segments. Numeric segments compare numerically
/// and always sort newer than alphabetic ones. A `~` sorts before anything,
/// including the end of the string.
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let mut one = a.as_bytes();
    let mut two = b.as_bytes();

    loop {
        // Skip separators, but stop at tildes
        while let Some((&c, rest)) = one.split_first() {
            if c.is_ascii_alphanumeric() || c == b'~' {
                break;
            }
            one = rest;
        }
        while let Some((&c, rest)) = two.split_first() {
            if c.is_ascii_alphanumeric() || c == b'~' {
                break;
            }
            two = rest;
        }

        match (one.first(), two.first()) {
            (Some(b'~'), Some(b'~')) => {
                one = &one[1..];
                two = &two[1..];
                continue;
            }
            (Some(b'~'), _) => return Ordering::Less,
            (_, Some(b'~')) => return Ordering::Greater,
            _ => {}
        }

        if one.is_empty() || two.is_empty() {
            break;
        }

        let numeric = one[0].is_ascii_digit();
        let take = |s: &[u8]| -> usize {
            s.iter()
                .take_while(|c| {
                    if numeric {
                        c.is_ascii_digit()
                    } else {
                        c.is_ascii_alphabetic()
                    }
                })
                .count()
        };

        let len_one = take(one);
        let len_two = take(two);
        let (seg_one, rest_one) = one.split_at(len_one);
        let (seg_two, rest_two) = two.split_at(len_two);

        // Segments of different kinds: numeric is newer
        if seg_two.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            let trim = |s: &[u8]| -> Vec<u8> {
                let start = s.iter().position(|&c| c != b'0').unwrap_or(s.len());
                s[start..].to_vec()
            };
            let n1 = trim(seg_one);
            let n2 = trim(seg_two);
            n1.len().cmp(&n2.len()).then_with(|| n1.cmp(&n2))
        } else {
            seg_one.cmp(seg_two)
        };

        if ord != Ordering::Equal {
            return ord;
        }

        one = rest_one;
        two = rest_two;
    }

    match (one.is_empty(), two.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

/// Comparison flag on a versioned requirement or provide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl Comparison {
    /// Parse the repodata `flags` attribute (`LT`, `LE`, `EQ`, `GE`, `GT`)
    pub fn from_flags(flags: &str) -> Option<Self> {
        match flags {
            "LT" => Some(Self::Lt),
            "LE" => Some(Self::Le),
            "EQ" => Some(Self::Eq),
            "GE" => Some(Self::Ge),
            "GT" => Some(Self::Gt),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> &'static str {
        match self {
            Self::Lt => "LT",
            Self::Le => "LE",
            Self::Eq => "EQ",
            Self::Ge => "GE",
            Self::Gt => "GT",
        }
    }

    /// Whether `candidate` satisfies `candidate <op> wanted`
    ///
    /// An empty release on `wanted` matches any release.
    pub fn satisfied_by(&self, candidate: &Evr, wanted: &Evr) -> bool {
        let ord = if wanted.release.is_empty() {
            candidate
                .epoch
                .cmp(&wanted.epoch)
                .then_with(|| rpmvercmp(&candidate.version, &wanted.version))
        } else {
            candidate.cmp(wanted)
        };
        match self {
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
            Self::Eq => ord == Ordering::Equal,
            Self::Ge => ord != Ordering::Less,
            Self::Gt => ord == Ordering::Greater,
        }
    }
}
