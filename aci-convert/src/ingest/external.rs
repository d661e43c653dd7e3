use mit_tree::MitNode;

use super::{children_of, name_of, specified};
use crate::class::{class_of, MitClass};
use crate::diagnostics::Diagnostics;
use crate::fallback::{self, fq};
use crate::ids::{Encap, PodNode, PodNodeIface};
use crate::model::{
    BgpPeerConfig, BgpProcessConfig, ExternalEpg, L2Out, L3Out, L3OutNode, ModelBuilder,
    OspfArea, OspfConfig, OspfInterfaceConfig, PathAttachment, StaticRouteConfig,
};

/// Decode one `l3extOut` and everything under it.
pub(super) fn l3out(
    node: &MitNode,
    tenant: &str,
    builder: &mut ModelBuilder,
    diagnostics: &mut Diagnostics,
) {
    let Some(name) = name_of(node) else {
        return;
    };
    let mut out = L3Out {
        name: name.to_string(),
        tenant: tenant.to_string(),
        description: node.attr("descr").map(str::to_string),
        enforce_route_control: node.attr("enforceRtctrl").map(str::to_string),
        mpls_enabled: node.attr("mplsEnabled").map(str::to_string),
        target_dscp: node.attr("targetDscp").map(str::to_string),
        ..L3Out::default()
    };
    // ospfIfP may sit under an interface profile rather than the OSPF policy.
    let mut profile_ospf_interfaces = Vec::new();

    for child in &node.children {
        match class_of(child) {
            MitClass::L3extRsEctx => {
                if let Some(vrf) = child.attr("tnFvCtxName") {
                    out.vrf = Some(fq(tenant, vrf));
                }
            }
            MitClass::L3extInstP => {
                let epg = external_epg(child, &mut out, diagnostics);
                out.external_epgs.push(epg);
            }
            MitClass::BgpExtP => {
                bgp_process(child, &mut out, diagnostics);
                for peer in children_of(child, MitClass::BgpPeerP) {
                    out.bgp_peers.push(bgp_peer(peer));
                }
            }
            MitClass::OspfExtP => {
                out.ospf = Some(ospf_config(child, name, diagnostics));
            }
            MitClass::L3extLNodeP => {
                node_profile(child, &mut out, &mut profile_ospf_interfaces, diagnostics);
            }
            _ => {}
        }
    }

    if let Some(ospf) = out.ospf.as_mut() {
        ospf.interfaces.extend(profile_ospf_interfaces);
    }

    builder.add_l3out(fq(tenant, name), out);
}

fn external_epg(node: &MitNode, l3out: &mut L3Out, diagnostics: &mut Diagnostics) -> ExternalEpg {
    let names = |class: MitClass, attr: &str| -> Vec<String> {
        children_of(node, class)
            .filter_map(|rs| rs.attr(attr))
            .map(str::to_string)
            .collect()
    };

    for route in children_of(node, MitClass::IpRouteP) {
        l3out.static_routes.push(static_route(route, &l3out.name, diagnostics));
    }

    ExternalEpg {
        name: fallback::external_epg_name(name_of(node), &l3out.name),
        description: node.attr("descr").map(str::to_string),
        subnets: names(MitClass::L3extSubnet, "ip"),
        provided_contracts: names(MitClass::FvRsProv, "tnVzBrCPName"),
        consumed_contracts: names(MitClass::FvRsCons, "tnVzBrCPName"),
        provided_contract_interfaces: names(MitClass::FvRsProvIf, "tnVzCPIfName"),
        consumed_contract_interfaces: names(MitClass::FvRsConsIf, "tnVzCPIfName"),
        protected_by_taboos: names(MitClass::FvRsProtBy, "tnVzTabooName"),
    }
}

fn static_route(node: &MitNode, l3out: &str, diagnostics: &mut Diagnostics) -> StaticRouteConfig {
    let next_hop = specified(node, "nextHop")
        .or_else(|| children_of(node, MitClass::IpNexthopP).find_map(|nh| nh.attr("nhAddr")))
        .map(|nh| nh.split('/').next().unwrap_or(nh).to_string());
    if let Some(tag) = node.attr("tag") {
        if tag.parse::<u64>().is_err() {
            diagnostics.value(format!(
                "Invalid tag '{tag}' for static route in L3Out {l3out}, ignoring"
            ));
        }
    }
    StaticRouteConfig {
        prefix: node.attr("ip").map(str::to_string),
        next_hop,
        next_hop_interface: node.attr("ifName").map(str::to_string),
        admin_distance: node.attr("pref").map(str::to_string),
        tag: node
            .attr("tag")
            .filter(|t| t.parse::<u64>().is_ok())
            .map(str::to_string),
    }
}

fn bgp_process(node: &MitNode, l3out: &mut L3Out, diagnostics: &mut Diagnostics) {
    let process = l3out.bgp_process.get_or_insert_with(BgpProcessConfig::default);
    if let Some(router_id) = node.attr("routerId") {
        process.router_id = Some(router_id.to_string());
    }
    if let Some(raw) = node.attr("asn") {
        match raw.trim().parse::<u64>() {
            Ok(asn) => process.asn = Some(asn),
            Err(err) => diagnostics.value(format!(
                "Invalid AS number '{raw}' in BGP process, ignoring: {err}"
            )),
        }
    }
}

fn bgp_peer(node: &MitNode) -> BgpPeerConfig {
    let ctrl = node.attr("ctrl").unwrap_or_default();
    let has_ctrl = |flag: &str| ctrl.split(',').any(|c| c.trim() == flag);
    let multihop = node
        .attr("ttl")
        .and_then(|t| t.parse::<u8>().ok())
        .is_some_and(|ttl| ttl > 1);

    BgpPeerConfig {
        peer_address: node.attr("addr").map(str::to_string),
        remote_as: node
            .attr("asn")
            .or_else(|| children_of(node, MitClass::BgpAsP).find_map(|a| a.attr("asn")))
            .map(str::to_string),
        local_as: node
            .attr("localAsn")
            .or_else(|| children_of(node, MitClass::BgpLocalAsnP).find_map(|a| a.attr("localAsn")))
            .map(str::to_string),
        description: node.attr("descr").map(str::to_string),
        password: node.attr("pwd").map(str::to_string),
        update_source: node.attr("updateSrc").map(str::to_string),
        local_preference: node.attr("localPref").map(str::to_string),
        import_route_map: node.attr("importRtMap").map(str::to_string),
        export_route_map: node.attr("exportRtMap").map(str::to_string),
        next_hop_self: fallback::flag(node.attr("nhSelf")) || has_ctrl("nh-self"),
        route_reflector_client: fallback::flag(node.attr("rrClient")),
        ebgp_multihop: fallback::flag(node.attr("ebgpMultihop")) || multihop,
    }
}

fn ospf_config(node: &MitNode, l3out: &str, diagnostics: &mut Diagnostics) -> OspfConfig {
    let area_id = node
        .attr("areaId")
        .or_else(|| node.attr("area"))
        .map(str::to_string);
    let areas = match (&area_id, node.attr("areaType")) {
        (Some(id), Some(kind)) => vec![OspfArea {
            area_id: id.clone(),
            area_type: Some(kind.to_string()),
        }],
        _ => Vec::new(),
    };
    OspfConfig {
        name: name_of(node).map(str::to_string),
        description: node.attr("descr").map(str::to_string),
        process_id: node.attr("processId").map(str::to_string),
        area_id,
        areas,
        interfaces: children_of(node, MitClass::OspfIfP)
            .map(|i| ospf_interface(i, l3out, diagnostics))
            .collect(),
    }
}

fn ospf_interface(node: &MitNode, l3out: &str, diagnostics: &mut Diagnostics) -> OspfInterfaceConfig {
    let mut number = |key: &str, label: &str| -> Option<u32> {
        let raw = node.attr(key)?;
        match raw.trim().parse::<u32>() {
            Ok(v) => Some(v),
            Err(err) => {
                diagnostics.value(format!(
                    "Invalid OSPF {label} '{raw}' in L3Out {l3out}, using default: {err}"
                ));
                None
            }
        }
    };
    let cost = number("cost", "cost");
    let hello_interval = number("helloIntvl", "hello interval");
    let dead_interval = number("deadIntvl", "dead interval");
    OspfInterfaceConfig {
        name: name_of(node).map(str::to_string),
        description: node.attr("descr").map(str::to_string),
        cost,
        hello_interval,
        dead_interval,
        network_type: node.attr("nwT").map(str::to_string),
        passive: node.attr("passive").map(|p| fallback::flag(Some(p))),
    }
}

// l3extLNodeP: border-node bindings (with their static routes) and interface
// profiles carrying path attachments.
fn node_profile(
    node: &MitNode,
    l3out: &mut L3Out,
    ospf_interfaces: &mut Vec<OspfInterfaceConfig>,
    diagnostics: &mut Diagnostics,
) {
    for binding in children_of(node, MitClass::L3extRsNodeL3OutAtt) {
        let Some(target) = binding.attr("tDn").and_then(PodNode::parse) else {
            continue;
        };
        l3out.nodes.push(L3OutNode {
            node_id: target.node_id,
            router_id: binding.attr("rtrId").map(str::to_string),
        });
        for route in children_of(binding, MitClass::IpRouteP) {
            let route = static_route(route, &l3out.name, diagnostics);
            l3out.static_routes.push(route);
        }
    }

    for profile in children_of(node, MitClass::L3extLIfP) {
        for rs in children_of(profile, MitClass::L3extRsPathL3OutAtt) {
            let Some(tdn) = rs.attr("tDn") else {
                continue;
            };
            let Some(target) = PodNodeIface::parse(tdn) else {
                diagnostics.value(format!(
                    "Could not parse path attachment tDn '{tdn}' for L3Out {}",
                    l3out.name
                ));
                continue;
            };
            let raw_encap = specified(rs, "encap").map(str::to_string);
            l3out.path_attachments.push(PathAttachment {
                target,
                encap: raw_encap.as_deref().map(Encap::parse),
                raw_encap,
                description: rs.attr("descr").map(str::to_string),
                epg_name: None,
                epg_tenant: None,
                address: rs.attr("addr").map(str::to_string),
                mac: rs.attr("mac").map(str::to_string),
                mode: rs.attr("mode").map(str::to_string),
                interface_type: rs.attr("ifInstT").map(str::to_string),
            });
        }
        for peer in children_of(profile, MitClass::BgpPeerP) {
            l3out.bgp_peers.push(bgp_peer(peer));
        }
        for ospf in children_of(profile, MitClass::OspfIfP) {
            ospf_interfaces.push(ospf_interface(ospf, &l3out.name, diagnostics));
        }
    }

    for peer in children_of(node, MitClass::BgpPeerP) {
        l3out.bgp_peers.push(bgp_peer(peer));
    }
}

pub(super) fn l2out(node: &MitNode, tenant: &str, builder: &mut ModelBuilder) {
    let Some(name) = name_of(node) else {
        return;
    };
    let bd = children_of(node, MitClass::L2extRsEBd).next();
    let l2out = L2Out {
        name: name.to_string(),
        tenant: tenant.to_string(),
        description: node.attr("descr").map(str::to_string),
        bridge_domain: bd
            .and_then(|rs| rs.attr("tnFvBDName"))
            .map(|b| fq(tenant, b)),
        encapsulation: bd
            .and_then(|rs| rs.attr("encap"))
            .or_else(|| node.attr("encap"))
            .map(str::to_string),
    };
    builder.add_l2out(fq(tenant, name), l2out);
}
