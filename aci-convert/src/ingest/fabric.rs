use mit_tree::MitNode;

use super::{children_of, name_of};
use crate::class::MitClass;
use crate::diagnostics::Diagnostics;
use crate::fallback;
use crate::ids::normalize_interface_name;
use crate::model::{FabricNode, FabricNodeInterface, ModelBuilder, VpcPair};

/// Collect nodeId -> name pairs from every identity policy in the export.
pub(super) fn collect_node_names(top: &[&MitNode], builder: &mut ModelBuilder) {
    for node in top {
        match crate::class::class_of(node) {
            MitClass::FabricInst => {
                for pol in children_of(node, MitClass::FabricNodeIdentPol) {
                    offer_identities(pol, builder);
                }
                for prot in children_of(node, MitClass::FabricProtPol) {
                    for group in children_of(prot, MitClass::FabricExplicitGEp) {
                        offer_identities(group, builder);
                    }
                }
            }
            MitClass::CtrlrInst => {
                for pol in children_of(node, MitClass::FabricNodeIdentPol) {
                    offer_identities(pol, builder);
                }
            }
            _ => {}
        }
    }
}

fn offer_identities(parent: &MitNode, builder: &mut ModelBuilder) {
    for ident in children_of(parent, MitClass::FabricNodeIdentP) {
        if let (Some(id), Some(name)) = (fallback::node_id(ident), name_of(ident)) {
            builder.offer_node_name(id, name);
        }
    }
}

// fabricInst -> fabricProtPol -> fabricExplicitGEp, the only place node
// endpoints are declared.
fn explicit_groups<'a>(top: &[&'a MitNode]) -> Vec<&'a MitNode> {
    top.iter()
        .copied()
        .filter(|n| crate::class::class_of(n) == MitClass::FabricInst)
        .flat_map(|inst| children_of(inst, MitClass::FabricProtPol))
        .flat_map(|prot| children_of(prot, MitClass::FabricExplicitGEp))
        .collect()
}

/// Create one [`FabricNode`] per `fabricNodePEp`.
pub(super) fn build_fabric_nodes(
    top: &[&MitNode],
    builder: &mut ModelBuilder,
    diagnostics: &mut Diagnostics,
) {
    for group in explicit_groups(top) {
        for endpoint in children_of(group, MitClass::FabricNodePEp) {
            build_node(endpoint, builder, diagnostics);
        }
    }
}

fn build_node(endpoint: &MitNode, builder: &mut ModelBuilder, diagnostics: &mut Diagnostics) {
    let id = fallback::node_id(endpoint);
    let identity = id.and_then(|i| builder.node_names.get(i)).map(String::as_str);
    let name = fallback::node_name(identity, name_of(endpoint)).map(str::to_string);

    let Some(key) = fallback::node_key(id, name.as_deref()).map(str::to_string) else {
        diagnostics.structural("Fabric node missing both ID and name, skipping");
        return;
    };

    let interfaces = node_interfaces(endpoint);

    if let Some(existing) = builder.fabric_nodes.get_mut(&key) {
        for iface in interfaces {
            if existing.interface(&iface.name).is_none() {
                existing.interfaces.push(iface);
            }
        }
        return;
    }

    let role = fallback::resolve_role(endpoint.attr("role"), name.as_deref());
    builder.fabric_nodes.insert(
        key,
        FabricNode {
            node_id: id.map(str::to_string),
            name,
            role,
            pod_id: endpoint.attr("podId").map(str::to_string),
            interfaces,
            management: None,
        },
    );
}

// fabricInterface entries first, then l1PhysIf ports not already present.
fn node_interfaces(endpoint: &MitNode) -> Vec<FabricNodeInterface> {
    let mut out: Vec<FabricNodeInterface> = Vec::new();

    for iface in children_of(endpoint, MitClass::FabricInterface) {
        let Some(raw) = name_of(iface) else {
            continue;
        };
        let name = normalize_interface_name(raw);
        if out.iter().any(|i| i.name == name) {
            continue;
        }
        out.push(FabricNodeInterface {
            name,
            kind: iface.attr("type").map(str::to_string),
            description: iface.attr("descr").map(str::to_string),
            enabled: true,
            epg: None,
            vlan: iface.attr("vlan").map(str::to_string),
        });
    }

    for port in children_of(endpoint, MitClass::L1PhysIf) {
        let Some(raw) = port.attr("id") else {
            continue;
        };
        let name = normalize_interface_name(raw);
        if out.iter().any(|i| i.name == name) {
            continue;
        }
        let admin_down = port
            .attr("adminSt")
            .is_some_and(|s| s.eq_ignore_ascii_case("down"));
        out.push(FabricNodeInterface {
            name,
            kind: Some("physical".to_string()),
            description: port.attr("descr").map(str::to_string),
            enabled: !admin_down,
            epg: None,
            vlan: None,
        });
    }

    out
}

/// A protection group with exactly two member nodes is a vPC pair.
pub(super) fn detect_vpc_pairs(top: &[&MitNode], builder: &mut ModelBuilder) {
    for group in explicit_groups(top) {
        let members: Vec<&str> = children_of(group, MitClass::FabricNodePEp)
            .filter_map(fallback::node_id)
            .collect();
        let (Some(vpc_id), [peer1, peer2]) = (group.attr("id"), members.as_slice()) else {
            continue;
        };
        builder.vpc_pairs.insert(
            vpc_id.to_string(),
            VpcPair {
                vpc_id: vpc_id.to_string(),
                vpc_name: name_of(group).map(str::to_string),
                peer1: (*peer1).to_string(),
                peer2: (*peer2).to_string(),
            },
        );
    }
}
