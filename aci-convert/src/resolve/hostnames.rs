use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::fallback;
use crate::model::{AciModel, FabricNode};

/// nodeId -> unique device hostname.
///
/// Computed once from the frozen model. Only nodes with a non-empty node id
/// get an entry; those are exactly the nodes that become devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Hostnames {
    by_node: BTreeMap<String, String>,
}

impl Hostnames {
    /// Resolve every node's hostname, renaming collisions.
    ///
    /// Nodes are visited in ascending node-id order. The first node to claim
    /// a base hostname keeps it; each later one becomes
    /// `{base}-{nodeId}-{n}` with the smallest free `n >= 2`.
    pub fn resolve(model: &AciModel, diagnostics: &mut Diagnostics) -> Self {
        let mut by_node = BTreeMap::new();
        let mut used = BTreeSet::new();

        for node in model.fabric_nodes().values() {
            let Some(node_id) = node.node_id.as_deref().filter(|id| !id.is_empty()) else {
                continue;
            };
            let base = base_hostname(node, node_id, model.hostname());
            let mut hostname = base.clone();
            let mut suffix = 2;
            while used.contains(&hostname) {
                hostname = format!("{base}-{node_id}-{suffix}");
                suffix += 1;
            }
            if hostname != base {
                diagnostics.referential(format!(
                    "Duplicate ACI node hostname '{base}' detected; using '{hostname}' for nodeId {node_id}."
                ));
            }
            used.insert(hostname.clone());
            by_node.insert(node_id.to_string(), hostname);
        }

        tracing::debug!(nodes = by_node.len(), "resolved node hostnames");
        Self { by_node }
    }

    pub fn get(&self, node_id: &str) -> Option<&str> {
        self.by_node.get(node_id).map(String::as_str)
    }

    /// (nodeId, hostname) pairs in node-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_node.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

fn base_hostname(node: &FabricNode, node_id: &str, fabric_hostname: &str) -> String {
    match node.name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => fallback::synthesized_hostname(fabric_hostname, node_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::build_model;
    use mit_tree::MitNode;
    use pretty_assertions::assert_eq;

    fn fabric(nodes: &[(&str, Option<&str>)]) -> AciModel {
        let mut group = MitNode::new("fabricExplicitGEp").with_attr("id", "1");
        for (id, name) in nodes {
            let mut ep = MitNode::new("fabricNodePEp").with_attr("nodeId", *id);
            if let Some(name) = name {
                ep = ep.with_attr("name", *name);
            }
            group = group.with_child(ep);
        }
        let root = MitNode::new("polUni").with_attr("name", "aci-aci-lab.json").with_child(
            MitNode::new("fabricInst")
                .with_child(MitNode::new("fabricProtPol").with_child(group)),
        );
        build_model(&root, "lab.json", &mut Diagnostics::new())
    }

    #[test]
    fn unnamed_nodes_use_sanitized_fabric_name() {
        let model = fabric(&[("101", None), ("102", None)]);
        let names = Hostnames::resolve(&model, &mut Diagnostics::new());
        assert_eq!(names.get("101"), Some("aci-lab-101"));
        assert_eq!(names.get("102"), Some("aci-lab-102"));
    }

    #[test]
    fn collisions_get_node_suffix_in_id_order() {
        let model = fabric(&[("103", Some("edge")), ("101", Some("edge")), ("102", Some("edge"))]);
        let mut diags = Diagnostics::new();
        let names = Hostnames::resolve(&model, &mut diags);

        assert_eq!(names.get("101"), Some("edge"));
        assert_eq!(names.get("102"), Some("edge-102-2"));
        assert_eq!(names.get("103"), Some("edge-103-2"));
        assert!(diags.contains(
            "Duplicate ACI node hostname 'edge' detected; using 'edge-102-2' for nodeId 102."
        ));

        let again = Hostnames::resolve(&model, &mut Diagnostics::new());
        assert_eq!(names, again);
    }
}
