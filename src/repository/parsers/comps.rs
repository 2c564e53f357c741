// src/repository/parsers/comps.rs

//! comps.xml group parser

use super::attr;
use crate::db::models::{Group, GroupPackageKind};
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

/// Parse the `<group>` definitions of a comps document
///
/// Only the untranslated `<name>` and `<description>` are kept. A
/// `packagereq` without a `type` is mandatory.
pub fn parse_comps(xml: &str, repo_id: &str) -> Result<Vec<Group>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut groups = Vec::new();
    let mut buf = Vec::new();

    let mut current: Option<Group> = None;
    let mut current_tag = String::new();
    let mut translated = false;
    let mut req: Option<(GroupPackageKind, Option<String>)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match tag.as_str() {
                    "group" => {
                        current = Some(Group {
                            repo_id: repo_id.to_string(),
                            ..Default::default()
                        });
                    }
                    "name" | "description" => {
                        translated = attr(&e, b"xml:lang").is_some();
                    }
                    "packagereq" => {
                        let kind = attr(&e, b"type")
                            .and_then(|t| t.parse::<GroupPackageKind>().ok())
                            .unwrap_or(GroupPackageKind::Mandatory);
                        req = Some((kind, attr(&e, b"requires")));
                    }
                    _ => {}
                }
                current_tag = tag;
            }
            Ok(Event::Text(e)) => {
                let Some(ref mut group) = current else {
                    buf.clear();
                    continue;
                };
                let text = e.unescape().unwrap_or_default().to_string();
                match current_tag.as_str() {
                    "id" => group.group_id = text,
                    "name" if !translated => group.name = text,
                    "description" if !translated => group.description = Some(text),
                    "packagereq" => {
                        if let Some((kind, requires)) = req.take() {
                            match kind {
                                GroupPackageKind::Mandatory => group.mandatory_packages.push(text),
                                GroupPackageKind::Default => group.default_packages.push(text),
                                GroupPackageKind::Optional => group.optional_packages.push(text),
                                GroupPackageKind::Conditional => match requires {
                                    Some(requires) => {
                                        group.conditional_packages.push((text, requires))
                                    }
                                    None => {
                                        debug!("Conditional {} without requires, skipping", text)
                                    }
                                },
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"group"
                    && let Some(mut group) = current.take()
                {
                    if group.group_id.is_empty() {
                        debug!("Skipping comps group without id");
                    } else {
                        if group.name.is_empty() {
                            group.name = group.group_id.clone();
                        }
                        groups.push(group);
                    }
                }
                current_tag.clear();
                translated = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::ParseError(format!("Failed to parse comps.xml: {}", e)));
            }
            _ => {}
        }
        buf.clear();
    }

    debug!("Parsed {} groups from {} comps", groups.len(), repo_id);
    Ok(groups)
}
