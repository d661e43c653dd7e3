use crate::device::{DeviceConfig, SwitchportMode};
use crate::diagnostics::Diagnostics;
use crate::ids::{Encap, VlanId};
use crate::model::{Epg, FabricNode};

use super::LoweringContext;

/// One port bound to one EPG on this node.
struct Binding<'a> {
    interface: &'a str,
    epg: &'a str,
    vlan: Option<&'a str>,
}

/// Tag EPG-bound ports with VLANs and install the EPG's policy filters.
pub(super) fn bind(
    device: &mut DeviceConfig,
    ctx: &LoweringContext<'_>,
    node: &FabricNode,
    node_id: &str,
    diagnostics: &mut Diagnostics,
) {
    for binding in bindings(ctx, node, node_id) {
        let Some(epg) = ctx.model.epgs().get(binding.epg) else {
            continue;
        };
        let Some(iface) = device.interfaces.get_mut(binding.interface) else {
            diagnostics.referential(format!(
                "Interface {} not found for EPG {}",
                binding.interface, binding.epg
            ));
            continue;
        };

        iface.append_description(&epg_label(ctx, epg));

        let bd_vlan = epg
            .bridge_domain
            .as_deref()
            .and_then(|bd| ctx.bridge_domain_vlan(bd));
        if let Some(vlan) = bd_vlan {
            iface.allowed_vlans.insert(vlan);
            iface.native_vlan = Some(vlan);
            iface.switchport = Some(SwitchportMode::Trunk);
        }

        if let Some(raw) = binding.vlan.filter(|v| !v.trim().is_empty()) {
            match explicit_vlan(raw) {
                Some(vlan) => {
                    iface.allowed_vlans.insert(vlan);
                    iface.native_vlan.get_or_insert(vlan);
                    iface.switchport = Some(SwitchportMode::Trunk);
                }
                None => diagnostics.value(format!(
                    "Invalid VLAN for interface {}: {raw}",
                    binding.interface
                )),
            }
        }

        let Some(policy) = ctx.epg_policies.get(binding.epg) else {
            continue;
        };
        iface.incoming_filter = policy.incoming.as_ref().map(|acl| acl.name.clone());
        iface.outgoing_filter = policy.outgoing.as_ref().map(|acl| acl.name.clone());
        for acl in policy.acls() {
            device.acls.insert(acl.name.clone(), acl.clone());
        }
    }
}

// Node ports tagged during ingestion, then path attachments on this node
// that were not already covered.
fn bindings<'a>(ctx: &'a LoweringContext<'_>, node: &'a FabricNode, node_id: &str) -> Vec<Binding<'a>> {
    let mut out: Vec<Binding<'a>> = node
        .interfaces
        .iter()
        .filter_map(|iface| {
            Some(Binding {
                interface: &iface.name,
                epg: iface.epg.as_deref()?,
                vlan: iface.vlan.as_deref(),
            })
        })
        .collect();

    for (name, attachment) in ctx.model.path_attachments().get(node_id).into_iter().flatten() {
        let Some(epg) = attachment.epg_name.as_deref() else {
            continue;
        };
        if out.iter().any(|b| b.interface == name && b.epg == epg) {
            continue;
        }
        out.push(Binding {
            interface: name,
            epg,
            vlan: attachment.raw_encap.as_deref(),
        });
    }
    out
}

fn epg_label(ctx: &LoweringContext<'_>, epg: &Epg) -> String {
    let bd = epg.bridge_domain.as_deref().map(|fq| {
        ctx.model
            .bridge_domains()
            .get(fq)
            .map_or(fq, |bd| bd.name.as_str())
    });
    format!(
        "EPG: {} | Tenant: {} | AppProfile: {} | BridgeDomain: {}",
        epg.name,
        epg.tenant,
        epg.application_profile.as_deref().unwrap_or("-"),
        bd.unwrap_or("-")
    )
}

// `vlan-110` or a bare `110`.
fn explicit_vlan(raw: &str) -> Option<VlanId> {
    match Encap::parse(raw) {
        Encap::Vlan(id) => Some(id),
        _ => raw.trim().parse::<u16>().ok().and_then(VlanId::new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::ingest::build_model;
    use crate::settings::LoweringSettings;
    use mit_tree::MitNode;
    use pretty_assertions::assert_eq;

    fn root(encap: &str) -> MitNode {
        let nodes = MitNode::new("fabricInst").with_child(
            MitNode::new("fabricProtPol").with_child(
                MitNode::new("fabricExplicitGEp").with_attr("id", "1").with_child(
                    MitNode::new("fabricNodePEp")
                        .with_attr("nodeId", "101")
                        .with_attr("name", "leaf-101")
                        .with_attr("role", "leaf")
                        .with_child(MitNode::new("fabricInterface").with_attr("name", "eth1/1")),
                ),
            ),
        );
        let tenant = MitNode::new("fvTenant")
            .with_attr("name", "prod")
            .with_child(
                MitNode::new("fvBD")
                    .with_attr("name", "web-bd")
                    .with_child(MitNode::new("fvRsCtx").with_attr("tnFvCtxName", "vrf1")),
            )
            .with_child(
                MitNode::new("vzBrCP").with_attr("name", "web").with_child(
                    MitNode::new("vzSubj")
                        .with_attr("name", "s")
                        .with_child(MitNode::new("vzRsSubjFiltAtt").with_attr("tnVzFilterName", "default")),
                ),
            )
            .with_child(
                MitNode::new("fvAp").with_attr("name", "shop").with_child(
                    MitNode::new("fvAEPg")
                        .with_attr("name", "web")
                        .with_child(MitNode::new("fvRsBd").with_attr("tnFvBDName", "web-bd"))
                        .with_child(MitNode::new("fvRsProv").with_attr("tnVzBrCPName", "web"))
                        .with_child(
                            MitNode::new("fvRsPathAtt")
                                .with_attr("tDn", "topology/pod-1/paths-101/pathep-[eth1/1]")
                                .with_attr("encap", encap),
                        )
                        .with_child(
                            MitNode::new("fvRsPathAtt")
                                .with_attr("tDn", "topology/pod-1/paths-101/pathep-[eth1/7]")
                                .with_attr("encap", encap),
                        ),
                ),
            );
        MitNode::new("polUni")
            .with_child(nodes)
            .with_child(tenant)
    }

    #[test]
    fn bound_ports_are_trunked_and_filtered() {
        let model = build_model(&root("vlan-110"), "fab.json", &mut Diagnostics::new());
        let result = crate::lower::convert(&model, &LoweringSettings::default());
        let device = &result.devices["leaf-101"];
        let bd_vlan = VlanId::from_name_hash("prod:web-bd");

        for name in ["Ethernet1/1", "Ethernet1/7"] {
            let iface = &device.interfaces[name];
            assert_eq!(iface.switchport, Some(SwitchportMode::Trunk));
            assert_eq!(iface.native_vlan, Some(bd_vlan));
            let allowed: Vec<u16> = iface.allowed_vlans.iter().map(|v| v.get()).collect();
            let mut expected = vec![110, bd_vlan.get()];
            expected.sort_unstable();
            assert_eq!(allowed, expected);
            assert!(iface
                .description
                .as_deref()
                .is_some_and(|d| d.contains("EPG: web | Tenant: prod | AppProfile: shop | BridgeDomain: web-bd")));
            assert_eq!(iface.incoming_filter, None);
            assert_eq!(
                iface.outgoing_filter.as_deref(),
                Some("~EPG_POLICY~prod:shop:web~OUT")
            );
        }
        assert!(device.acls.contains_key("~EPG_POLICY~prod:shop:web~OUT"));
    }

    #[test]
    fn bad_explicit_vlan_is_reported() {
        let model = build_model(&root("vlan-abc"), "fab.json", &mut Diagnostics::new());
        let result = crate::lower::convert(&model, &LoweringSettings::default());
        assert!(result
            .diagnostics
            .contains("Invalid VLAN for interface Ethernet1/1: vlan-abc"));
        let iface = &result.devices["leaf-101"].interfaces["Ethernet1/1"];
        assert_eq!(iface.allowed_vlans.len(), 1);
    }

    #[test]
    fn explicit_vlan_forms() {
        assert_eq!(explicit_vlan("vlan-10").map(VlanId::get), Some(10));
        assert_eq!(explicit_vlan("20").map(VlanId::get), Some(20));
        assert_eq!(explicit_vlan("vxlan-5"), None);
        assert_eq!(explicit_vlan("0"), None);
    }
}
