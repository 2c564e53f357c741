// src/repository/parsers/repomd.rs

//! rpm-md metadata parser
//!
//! Parses repomd.xml and primary.xml. Elements are matched on their local
//! name so that both `rpm:entry` and `entry` are recognized.

use super::{MetadataRecord, RepoMd, attr};
use crate::db::models::{Capability, CandidatePackage, ChecksumType, PackageKey, Requirement};
use crate::error::{Error, Result};
use crate::version::{Comparison, Evr};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

/// Parse repomd.xml
pub fn parse_repomd(xml: &str) -> Result<RepoMd> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut repomd = RepoMd::default();
    let mut current: Option<MetadataRecord> = None;
    let mut current_tag = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match tag.as_str() {
                    "data" => {
                        current = attr(&e, b"type").map(|kind| MetadataRecord {
                            kind,
                            location: String::new(),
                            checksum: None,
                            checksum_type: None,
                        });
                    }
                    "checksum" => {
                        if let Some(ref mut record) = current {
                            record.checksum_type = attr(&e, b"type");
                        }
                    }
                    "location" => {
                        if let Some(ref mut record) = current
                            && let Some(href) = attr(&e, b"href")
                        {
                            record.location = href;
                        }
                    }
                    _ => {}
                }
                current_tag = tag;
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"location"
                    && let Some(ref mut record) = current
                    && let Some(href) = attr(&e, b"href")
                {
                    record.location = href;
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_tag.as_str() {
                    "revision" => repomd.revision = Some(text),
                    "checksum" => {
                        if let Some(ref mut record) = current {
                            record.checksum = Some(text);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"data"
                    && let Some(record) = current.take()
                {
                    if record.location.is_empty() {
                        warn!("repomd.xml record '{}' has no location", record.kind);
                    } else {
                        repomd.records.push(record);
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::ParseError(format!(
                    "Failed to parse repomd.xml: {}",
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    debug!("repomd.xml lists {} metadata records", repomd.records.len());
    Ok(repomd)
}

/// Capability list currently being read inside `<format>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Provides,
    Requires,
    Other,
}

/// Parse primary.xml into packages belonging to `repo_id`
///
/// Packages missing mandatory fields are skipped with a warning.
pub fn parse_primary(xml: &str, repo_id: &str) -> Result<Vec<CandidatePackage>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut packages = Vec::new();
    let mut buf = Vec::new();

    let mut current: Option<PackageBuilder> = None;
    let mut current_tag = String::new();
    let mut section = Section::None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if tag == "package" {
                    current = Some(PackageBuilder::default());
                } else if let Some(ref mut pkg) = current {
                    section = pkg.open(&tag, &e, section);
                }
                current_tag = tag;
            }
            Ok(Event::Empty(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if let Some(ref mut pkg) = current {
                    // An empty capability list must not leave the section open
                    let opened = pkg.open(&tag, &e, section);
                    if !matches!(tag.as_str(), "provides" | "requires" | "conflicts" | "obsoletes")
                    {
                        section = opened;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(ref mut pkg) = current {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match current_tag.as_str() {
                        "name" => pkg.name = Some(text),
                        "arch" => pkg.arch = Some(text),
                        "summary" => pkg.summary = Some(text),
                        "checksum" => pkg.checksum = Some(text),
                        "license" => pkg.license = Some(text),
                        "vcs" => pkg.vcs = Some(text),
                        "file" => pkg.files.push(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"package" => {
                        if let Some(builder) = current.take() {
                            match builder.build(repo_id) {
                                Ok(pkg) => packages.push(pkg),
                                Err(e) => warn!("Skipping package in {}: {}", repo_id, e),
                            }
                        }
                    }
                    b"provides" | b"requires" | b"conflicts" | b"obsoletes" => {
                        section = Section::None;
                    }
                    _ => {}
                }
                current_tag.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::ParseError(format!(
                    "Failed to parse primary.xml: {}",
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    debug!("Parsed {} packages from {} primary.xml", packages.len(), repo_id);
    Ok(packages)
}

/// Builder for constructing a CandidatePackage from primary.xml
#[derive(Default)]
struct PackageBuilder {
    name: Option<String>,
    epoch: Option<String>,
    ver: Option<String>,
    rel: Option<String>,
    arch: Option<String>,
    summary: Option<String>,
    license: Option<String>,
    vcs: Option<String>,
    checksum: Option<String>,
    checksum_type: Option<String>,
    size: Option<String>,
    installed_size: Option<String>,
    location: Option<String>,
    files: Vec<String>,
    requires: Vec<Requirement>,
    provides: Vec<Capability>,
}

impl PackageBuilder {
    /// Record the attributes of an opening (or empty) element and return
    /// the capability section that applies after it
    fn open(&mut self, tag: &str, e: &BytesStart, section: Section) -> Section {
        match tag {
            "version" => {
                self.epoch = attr(e, b"epoch");
                self.ver = attr(e, b"ver");
                self.rel = attr(e, b"rel");
            }
            "checksum" => self.checksum_type = attr(e, b"type"),
            "size" => {
                self.size = attr(e, b"package");
                self.installed_size = attr(e, b"installed");
            }
            "location" => self.location = attr(e, b"href"),
            "provides" => return Section::Provides,
            "requires" => return Section::Requires,
            "conflicts" | "obsoletes" => return Section::Other,
            "entry" => match section {
                Section::Provides => {
                    if let Some(cap) = capability_from(e) {
                        self.provides.push(cap);
                    }
                }
                Section::Requires => {
                    if let Some(cap) = capability_from(e) {
                        let pre = attr(e, b"pre").is_some_and(|v| v == "1");
                        self.requires.push(Requirement {
                            capability: cap,
                            pre,
                        });
                    }
                }
                Section::Other | Section::None => {}
            },
            _ => {}
        }
        section
    }

    fn build(self, repo_id: &str) -> Result<CandidatePackage> {
        let name = self
            .name
            .ok_or_else(|| Error::ParseError("Missing package name".to_string()))?;
        let arch = self
            .arch
            .ok_or_else(|| Error::ParseError(format!("Missing arch for {}", name)))?;
        let ver = self
            .ver
            .ok_or_else(|| Error::ParseError(format!("Missing version for {}", name)))?;
        let rel = self.rel.unwrap_or_default();
        let epoch = match self.epoch.as_deref() {
            None | Some("") => 0,
            Some(e) => e
                .parse::<u32>()
                .map_err(|err| Error::ParseError(format!("Invalid epoch '{}': {}", e, err)))?,
        };

        let checksum = self
            .checksum
            .ok_or_else(|| Error::ParseError(format!("Missing checksum for {}", name)))?;
        let checksum_type = self
            .checksum_type
            .as_deref()
            .unwrap_or("sha256")
            .parse::<ChecksumType>()
            .map_err(Error::ParseError)?;

        let size: u64 = self
            .size
            .ok_or_else(|| Error::ParseError(format!("Missing size for {}", name)))?
            .parse()
            .map_err(|e| Error::ParseError(format!("Invalid size: {}", e)))?;
        let installed_size = self.installed_size.and_then(|s| s.parse::<u64>().ok());

        let location = self
            .location
            .ok_or_else(|| Error::ParseError(format!("Missing location for {}", name)))?;

        let key = PackageKey::new(name, arch, ver, rel);
        let mut pkg = CandidatePackage::new(repo_id, &key, checksum, size, location);
        pkg.epoch = epoch;
        pkg.checksum_type = checksum_type;
        pkg.installed_size = installed_size;
        pkg.summary = self.summary;
        pkg.license = self.license;
        pkg.vcs = self.vcs;
        pkg.files = self.files;
        pkg.requires = self.requires;
        pkg.provides = self.provides;
        Ok(pkg)
    }
}

/// Build a capability from an `rpm:entry` element
fn capability_from(e: &BytesStart) -> Option<Capability> {
    let name = attr(e, b"name")?;
    let flags = attr(e, b"flags").and_then(|f| Comparison::from_flags(&f));

    match (flags, attr(e, b"ver")) {
        (Some(flags), Some(ver)) => {
            let epoch = attr(e, b"epoch")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(0);
            let rel = attr(e, b"rel").unwrap_or_default();
            Some(Capability::versioned(name, flags, Evr::new(epoch, ver, rel)))
        }
        _ => Some(Capability::named(name)),
    }
}
