// src/repository/parsers/mod.rs

//! Repository metadata parsers for rpm-md repositories
//!
//! - repomd.xml: index of the metadata files a repository publishes
//! - primary.xml: package list with capabilities and file manifests
//! - comps.xml: package group definitions

pub mod comps;
pub mod repomd;

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use quick_xml::events::BytesStart;
use std::io::Read;
use tracing::debug;

/// One `<data>` entry of repomd.xml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    /// Record type (`primary`, `group`, `group_gz`, ...)
    pub kind: String,
    /// Location relative to the repository base URL
    pub location: String,
    pub checksum: Option<String>,
    pub checksum_type: Option<String>,
}

/// Parsed repomd.xml
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoMd {
    pub revision: Option<String>,
    pub records: Vec<MetadataRecord>,
}

impl RepoMd {
    pub fn record(&self, kind: &str) -> Option<&MetadataRecord> {
        self.records.iter().find(|r| r.kind == kind)
    }

    pub fn primary(&self) -> Option<&MetadataRecord> {
        self.record("primary")
    }

    /// Group metadata, preferring the uncompressed record
    pub fn group(&self) -> Option<&MetadataRecord> {
        self.record("group").or_else(|| self.record("group_gz"))
    }
}

/// Decode a metadata file, choosing the codec from its location suffix
pub fn decompress(bytes: &[u8], location: &str) -> Result<String> {
    let decoded = if location.ends_with(".gz") {
        debug!("Decompressing gzip-compressed {}", location);
        let mut gz = GzDecoder::new(bytes);
        let mut out = Vec::new();
        gz.read_to_end(&mut out)
            .map_err(|e| Error::ParseError(format!("Failed to decompress {}: {}", location, e)))?;
        out
    } else if location.ends_with(".zst") {
        debug!("Decompressing zstd-compressed {}", location);
        zstd::decode_all(bytes)
            .map_err(|e| Error::ParseError(format!("Failed to decompress {}: {}", location, e)))?
    } else if location.ends_with(".xz") || location.ends_with(".bz2") {
        return Err(Error::ParseError(format!(
            "Unsupported metadata compression: {}",
            location
        )));
    } else {
        bytes.to_vec()
    };

    String::from_utf8(decoded)
        .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in {}: {}", location, e)))
}

/// Value of attribute `key` on an element
pub(crate) fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}
