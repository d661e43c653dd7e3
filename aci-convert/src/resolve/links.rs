use std::fs;
use std::path::Path;

use mit_tree::{DecodeError, MitNode};
use thiserror::Error;

use crate::model::FabricLink;

const FABRIC_LINK_CLASS: &str = "fabricLink";

/// Errors returned when loading a fabric-link companion document.
#[derive(Debug, Error)]
pub enum LinkLoadError {
    #[error("failed to read fabric links file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to decode fabric links file {path}: {source}")]
    Decode { path: String, source: DecodeError },
    #[error("{path} is not a fabric link document (expected an imdata array of fabricLink objects)")]
    NotLinkDocument { path: String },
}

/// Load explicit fabric links from a companion file.
pub fn load_fabric_links(path: &Path) -> Result<Vec<FabricLink>, LinkLoadError> {
    let display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| LinkLoadError::Io {
        path: display.clone(),
        source,
    })?;
    parse_fabric_links(&raw, &display)
}

/// Parse a companion document. Records missing any endpoint field are skipped.
pub fn parse_fabric_links(text: &str, source_name: &str) -> Result<Vec<FabricLink>, LinkLoadError> {
    let root = mit_tree::decode_document(text, source_name).map_err(|source| LinkLoadError::Decode {
        path: source_name.to_string(),
        source,
    })?;
    if !is_link_document(&root) {
        return Err(LinkLoadError::NotLinkDocument {
            path: source_name.to_string(),
        });
    }
    let links: Vec<FabricLink> = root.children.iter().filter_map(link_record).collect();
    tracing::debug!(
        links = links.len(),
        skipped = root.children.len() - links.len(),
        "loaded fabric links"
    );
    Ok(links)
}

/// True for an `imdata` envelope whose every element is a `fabricLink`.
pub fn is_link_document(root: &MitNode) -> bool {
    root.class == mit_tree::json::IMDATA_CLASS
        && root.children.iter().all(|c| c.class == FABRIC_LINK_CLASS)
}

fn link_record(node: &MitNode) -> Option<FabricLink> {
    let field = |key: &str| {
        node.attr(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    Some(FabricLink {
        node1: field("n1")?,
        slot1: field("s1")?,
        port1: field("p1")?,
        node2: field("n2")?,
        slot2: field("s2")?,
        port2: field("p2")?,
        link_state: field("linkState"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn complete_records_are_kept() {
        let text = r#"{"imdata": [
            {"fabricLink": {"attributes": {"n1": "101", "s1": "1", "p1": "49", "n2": "201", "s2": "1", "p2": "1", "linkState": "ok"}}},
            {"fabricLink": {"attributes": {"n1": "102", "s1": "1", "p1": "49", "n2": "201"}}}
        ]}"#;
        let links = parse_fabric_links(text, "links.json").expect("links");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].node1, "101");
        assert_eq!(links[0].port2, "1");
        assert_eq!(links[0].link_state.as_deref(), Some("ok"));
    }

    #[test]
    fn primary_export_is_not_a_link_document() {
        let text = r#"{"polUni": {"attributes": {}, "children": []}}"#;
        let err = parse_fabric_links(text, "fabric.json").expect_err("not links");
        assert!(matches!(err, LinkLoadError::NotLinkDocument { .. }));

        let mixed = r#"{"imdata": [{"fabricLink": {"attributes": {}}}, {"fvTenant": {"attributes": {}}}]}"#;
        assert!(parse_fabric_links(mixed, "mixed.json").is_err());
    }

    #[test]
    fn decode_failure_is_reported() {
        let err = parse_fabric_links("links", "links.txt").expect_err("bad");
        assert!(matches!(err, LinkLoadError::Decode { .. }));
    }
}
