use mit_tree::MitNode;

use super::children_of;
use crate::class::MitClass;
use crate::diagnostics::Diagnostics;
use crate::ids::PodNode;
use crate::model::{ManagementInfo, ModelBuilder};

/// Attach out-of-band addresses from `mgmtMgmtP -> mgmtOoB -> mgmtRsOoBStNode`
/// to the fabric nodes they name.
pub(super) fn management(node: &MitNode, builder: &mut ModelBuilder, diagnostics: &mut Diagnostics) {
    for oob in children_of(node, MitClass::MgmtOoB) {
        for binding in children_of(oob, MitClass::MgmtRsOoBStNode) {
            attach(binding, builder, diagnostics);
        }
    }
}

fn attach(binding: &MitNode, builder: &mut ModelBuilder, diagnostics: &mut Diagnostics) {
    let Some(tdn) = binding.attr("tDn") else {
        return;
    };
    let Some(address) = binding.attr("addr") else {
        return;
    };
    let Some(target) = PodNode::parse(tdn) else {
        diagnostics.value(format!("Could not parse node ID from management tDn: {tdn}"));
        return;
    };
    let Some(node) = builder.fabric_nodes.get_mut(&target.node_id) else {
        diagnostics.referential(format!(
            "Management IP {address} references unknown node ID {} (from tDn: {tdn})",
            target.node_id
        ));
        return;
    };
    node.management = Some(ManagementInfo {
        address: address.to_string(),
        gateway: binding.attr("gw").map(str::to_string),
        address6: binding.attr("v6Addr").map(str::to_string),
        gateway6: binding.attr("v6Gw").map(str::to_string),
    });
    if node.pod_id.is_none() {
        node.pod_id = target.pod_id;
    }
}
