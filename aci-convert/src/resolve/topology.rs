use std::collections::BTreeSet;

use crate::device::{Endpoint, Layer1Edge};
use crate::model::{AciModel, FabricNode, NodeRole};

use super::Hostnames;

/// Physical edges for the whole fabric.
///
/// Explicit fabric links, when the model has any, replace the synthesized
/// mesh entirely. `peer_link` names the vPC peer-link interface on both
/// members.
pub fn layer1_edges(model: &AciModel, hostnames: &Hostnames, peer_link: &str) -> BTreeSet<Layer1Edge> {
    let edges = if model.fabric_links().is_empty() {
        let mut edges = spine_leaf_mesh(model, hostnames);
        edges.extend(vpc_edges(model, hostnames, peer_link));
        edges
    } else {
        explicit_edges(model, hostnames)
    };
    tracing::debug!(edges = edges.len(), "synthesized layer-1 topology");
    edges
}

fn explicit_edges(model: &AciModel, hostnames: &Hostnames) -> BTreeSet<Layer1Edge> {
    model
        .fabric_links()
        .iter()
        .filter_map(|link| {
            let a = hostnames.get(&link.node1)?;
            let b = hostnames.get(&link.node2)?;
            Some(Layer1Edge {
                a: Endpoint::new(a, format!("Ethernet{}/{}", link.slot1, link.port1)),
                b: Endpoint::new(b, format!("Ethernet{}/{}", link.slot2, link.port2)),
            })
        })
        .collect()
}

fn spine_leaf_mesh(model: &AciModel, hostnames: &Hostnames) -> BTreeSet<Layer1Edge> {
    let nodes = model.fabric_nodes().values();
    let spines: Vec<&FabricNode> = nodes.clone().filter(|n| n.role == NodeRole::Spine).collect();
    let mut edges = BTreeSet::new();

    for leaf in nodes.filter(|n| n.role.is_leaf_like()) {
        let Some((leaf_id, leaf_host)) = resolved(leaf, hostnames) else {
            continue;
        };
        let leaf_ifaces = leaf_interfaces(model, leaf, leaf_id);

        for (index, spine) in spines.iter().enumerate() {
            let Some((_, spine_host)) = resolved(spine, hostnames) else {
                continue;
            };
            let leaf_iface = nth_or_default(leaf_ifaces.iter().map(String::as_str), index);
            let spine_iface = nth_or_default(spine.interfaces.iter().map(|i| i.name.as_str()), index);
            edges.insert(Layer1Edge {
                a: Endpoint::new(leaf_host, leaf_iface),
                b: Endpoint::new(spine_host, spine_iface),
            });
        }
    }
    edges
}

fn vpc_edges<'a>(
    model: &'a AciModel,
    hostnames: &'a Hostnames,
    peer_link: &'a str,
) -> impl Iterator<Item = Layer1Edge> + 'a {
    model.vpc_pairs().values().filter_map(move |pair| {
        model.fabric_nodes().get(&pair.peer1)?;
        model.fabric_nodes().get(&pair.peer2)?;
        let a = hostnames.get(&pair.peer1)?;
        let b = hostnames.get(&pair.peer2)?;
        Some(Layer1Edge {
            a: Endpoint::new(a, peer_link),
            b: Endpoint::new(b, peer_link),
        })
    })
}

fn resolved<'n, 'h>(node: &'n FabricNode, hostnames: &'h Hostnames) -> Option<(&'n str, &'h str)> {
    let id = node.node_id.as_deref()?;
    hostnames.get(id).map(|h| (id, h))
}

/// The node's own interfaces, then path-attachment interfaces not already
/// listed, in first-seen order.
pub fn leaf_interfaces(model: &AciModel, node: &FabricNode, node_id: &str) -> Vec<String> {
    let mut out: Vec<String> = node.interfaces.iter().map(|i| i.name.clone()).collect();
    for name in model.node_interfaces().get(node_id).into_iter().flatten() {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}

fn nth_or_default<'a>(mut names: impl Iterator<Item = &'a str>, index: usize) -> String {
    names
        .nth(index)
        .map_or_else(|| format!("Ethernet1/{}", index + 1), str::to_string)
}
