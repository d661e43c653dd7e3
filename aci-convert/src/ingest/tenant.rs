use mit_tree::MitNode;

use super::{children_of, contracts, external, mgmt, name_of};
use crate::class::{class_of, MitClass};
use crate::diagnostics::Diagnostics;
use crate::fallback::fq;
use crate::ids::{Encap, PodNodeIface};
use crate::model::{ApplicationProfile, BridgeDomain, Epg, ModelBuilder, PathAttachment, Vrf};

/// Dispatch every child of one `fvTenant` to its handler.
pub(super) fn walk_tenant(node: &MitNode, builder: &mut ModelBuilder, diagnostics: &mut Diagnostics) {
    let Some(tenant) = name_of(node) else {
        return;
    };
    builder.tenant_mut(tenant).description = node.attr("descr").map(str::to_string);

    for child in &node.children {
        match class_of(child) {
            MitClass::FvCtx => vrf(child, tenant, builder),
            MitClass::FvBD => bridge_domain(child, tenant, builder),
            MitClass::FvAp => application_profile(child, tenant, builder, diagnostics),
            MitClass::FvAEPg => {
                epg(child, tenant, None, builder, diagnostics);
            }
            MitClass::VzFilter => contracts::filter(child, tenant, builder),
            MitClass::VzBrCP => contracts::contract(child, tenant, builder),
            MitClass::VzCPIf => contracts::contract_interface(child, tenant, builder),
            MitClass::VzTaboo => contracts::taboo(child, tenant, builder),
            MitClass::L3extOut => external::l3out(child, tenant, builder, diagnostics),
            MitClass::L2extOut => external::l2out(child, tenant, builder),
            MitClass::MgmtMgmtP => mgmt::management(child, builder, diagnostics),
            other => {
                let name = child
                    .attr("name")
                    .map(|n| format!(" (name: {n})"))
                    .unwrap_or_default();
                diagnostics.structural(format!(
                    "Skipping unsupported tenant child object: {other}{name} in tenant {tenant}. \
                     This configuration will not be analyzed."
                ));
            }
        }
    }
}

fn vrf(node: &MitNode, tenant: &str, builder: &mut ModelBuilder) {
    let Some(name) = name_of(node) else {
        return;
    };
    builder.add_vrf(
        fq(tenant, name),
        Vrf {
            name: name.to_string(),
            tenant: tenant.to_string(),
            description: node.attr("descr").map(str::to_string),
        },
    );
}

fn bridge_domain(node: &MitNode, tenant: &str, builder: &mut ModelBuilder) {
    let Some(name) = name_of(node) else {
        return;
    };
    let vrf = children_of(node, MitClass::FvRsCtx)
        .find_map(|rs| rs.attr("tnFvCtxName"))
        .map(|v| fq(tenant, v));
    let subnets = children_of(node, MitClass::FvSubnet)
        .filter_map(|s| s.attr("ip"))
        .map(str::to_string)
        .collect();
    // The BD's own encapsulation, when the export carries one; ACI's
    // `unknown` placeholder counts as none.
    let encapsulation = node
        .attr("encap")
        .or_else(|| children_of(node, MitClass::FvRsPathAtt).find_map(|p| p.attr("encap")))
        .map(Encap::parse)
        .filter(|e| *e != Encap::Unknown);

    builder.add_bridge_domain(
        fq(tenant, name),
        BridgeDomain {
            name: name.to_string(),
            tenant: tenant.to_string(),
            vrf,
            subnets,
            encapsulation,
            description: node.attr("descr").map(str::to_string),
        },
    );
}

fn application_profile(
    node: &MitNode,
    tenant: &str,
    builder: &mut ModelBuilder,
    diagnostics: &mut Diagnostics,
) {
    let Some(name) = name_of(node) else {
        return;
    };
    let mut members = Vec::new();
    for child in children_of(node, MitClass::FvAEPg) {
        if let Some(key) = epg(child, tenant, Some(name), builder, diagnostics) {
            members.push(key);
        }
    }
    builder.add_application_profile(
        fq(tenant, name),
        ApplicationProfile {
            name: name.to_string(),
            tenant: tenant.to_string(),
            description: node.attr("descr").map(str::to_string),
            epgs: members,
        },
    );
}

fn relation_names(node: &MitNode, class: MitClass, attr: &str) -> Vec<String> {
    children_of(node, class)
        .filter_map(|rs| rs.attr(attr))
        .map(str::to_string)
        .collect()
}

/// Build one EPG and return its fq-key.
fn epg(
    node: &MitNode,
    tenant: &str,
    ap: Option<&str>,
    builder: &mut ModelBuilder,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    let name = name_of(node)?;
    let key = match ap {
        Some(ap) => format!("{tenant}:{ap}:{name}"),
        None => fq(tenant, name),
    };

    let mut epg = Epg {
        name: name.to_string(),
        tenant: tenant.to_string(),
        application_profile: ap.map(str::to_string),
        bridge_domain: children_of(node, MitClass::FvRsBd)
            .find_map(|rs| rs.attr("tnFvBDName"))
            .map(|bd| fq(tenant, bd)),
        provided_contracts: relation_names(node, MitClass::FvRsProv, "tnVzBrCPName"),
        consumed_contracts: relation_names(node, MitClass::FvRsCons, "tnVzBrCPName"),
        provided_contract_interfaces: relation_names(node, MitClass::FvRsProvIf, "tnVzCPIfName"),
        consumed_contract_interfaces: relation_names(node, MitClass::FvRsConsIf, "tnVzCPIfName"),
        protected_by_taboos: relation_names(node, MitClass::FvRsProtBy, "tnVzTabooName"),
        description: node.attr("descr").map(str::to_string),
        path_attachments: Vec::new(),
    };

    for rs in children_of(node, MitClass::FvRsPathAtt) {
        let Some(tdn) = rs.attr("tDn") else {
            continue;
        };
        let Some(target) = PodNodeIface::parse(tdn) else {
            diagnostics.value(format!(
                "Could not parse path attachment tDn '{tdn}' for EPG {key}"
            ));
            continue;
        };
        let raw_encap = rs.attr("encap").map(str::to_string);
        let attachment = PathAttachment {
            target,
            encap: raw_encap.as_deref().map(Encap::parse),
            raw_encap,
            description: rs.attr("descr").map(str::to_string),
            epg_name: Some(key.clone()),
            epg_tenant: Some(tenant.to_string()),
            address: None,
            mac: None,
            mode: rs.attr("mode").map(str::to_string),
            interface_type: None,
        };
        tag_fabric_interface(&attachment, builder);
        builder.index_path_attachment(&attachment);
        epg.path_attachments.push(attachment);
    }

    builder.add_epg(key.clone(), epg);
    Some(key)
}

// Mark an already-known fabric port as belonging to the attaching EPG.
fn tag_fabric_interface(attachment: &PathAttachment, builder: &mut ModelBuilder) {
    for node_id in attachment.target.node_ids() {
        let Some(node) = builder.fabric_nodes.get_mut(node_id) else {
            continue;
        };
        if let Some(iface) = node
            .interfaces
            .iter_mut()
            .find(|i| i.name == attachment.target.interface)
        {
            iface.epg = attachment.epg_name.clone();
            iface.vlan = attachment.raw_encap.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn walk(tenant: MitNode) -> (crate::model::AciModel, Diagnostics) {
        let mut builder = ModelBuilder::new("fab");
        let mut diags = Diagnostics::new();
        walk_tenant(&tenant, &mut builder, &mut diags);
        (builder.freeze(), diags)
    }

    #[test]
    fn nested_epg_is_keyed_under_its_profile() {
        let tenant = MitNode::new("fvTenant").with_attr("name", "prod").with_child(
            MitNode::new("fvAp").with_attr("name", "shop").with_child(
                MitNode::new("fvAEPg")
                    .with_attr("name", "web")
                    .with_child(MitNode::new("fvRsBd").with_attr("tnFvBDName", "web-bd"))
                    .with_child(MitNode::new("fvRsCons").with_attr("tnVzBrCPName", "db")),
            ),
        );
        let (model, diags) = walk(tenant);
        let epg = &model.epgs()["prod:shop:web"];
        assert_eq!(epg.bridge_domain.as_deref(), Some("prod:web-bd"));
        assert_eq!(epg.consumed_contracts, vec!["db".to_string()]);
        assert_eq!(model.application_profiles()["prod:shop"].epgs, vec!["prod:shop:web"]);
        assert!(model.tenants()["prod"].epgs.contains("prod:shop:web"));
        assert!(diags.is_empty());
    }

    #[test]
    fn vpc_path_attachment_lands_on_both_nodes() {
        let tenant = MitNode::new("fvTenant").with_attr("name", "prod").with_child(
            MitNode::new("fvAEPg").with_attr("name", "web").with_child(
                MitNode::new("fvRsPathAtt")
                    .with_attr("tDn", "topology/pod-1/protpaths-101-102/pathep-[eth1/1]")
                    .with_attr("encap", "vlan-110"),
            ),
        );
        let (model, _) = walk(tenant);
        for node in ["101", "102"] {
            assert_eq!(model.node_interfaces()[node], vec!["Ethernet1/1".to_string()]);
            let att = &model.path_attachments()[node]["Ethernet1/1"];
            assert_eq!(att.epg_name.as_deref(), Some("prod:web"));
        }
    }

    #[test]
    fn unsupported_child_warns_and_siblings_survive() {
        let tenant = MitNode::new("fvTenant")
            .with_attr("name", "prod")
            .with_child(MitNode::new("vnsLDevVip").with_attr("name", "fw"))
            .with_child(MitNode::new("fvCtx").with_attr("name", "vrf1"));
        let (model, diags) = walk(tenant);
        assert!(diags.contains(
            "Skipping unsupported tenant child object: vnsLDevVip (name: fw) in tenant prod"
        ));
        assert!(model.vrfs().contains_key("prod:vrf1"));
    }

    #[test]
    fn nameless_objects_are_skipped_silently() {
        let tenant = MitNode::new("fvTenant")
            .with_attr("name", "prod")
            .with_child(MitNode::new("fvCtx"))
            .with_child(MitNode::new("fvBD").with_attr("name", ""));
        let (model, diags) = walk(tenant);
        assert!(model.vrfs().is_empty());
        assert!(model.bridge_domains().is_empty());
        assert!(diags.is_empty());
    }
}
