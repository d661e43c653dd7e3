use std::net::Ipv4Addr;

use crate::device::{
    BgpPeer, BgpProcess, DeviceConfig, Origin, RouterId, RoutingPolicy, Statement,
};
use crate::diagnostics::Diagnostics;
use crate::model::{BgpPeerConfig, L3Out};
use crate::settings::LoweringSettings;

use super::interfaces::LOOPBACK;

pub(super) const IMPORT_POLICY_PREFIX: &str = "~BGP_IMPORT~";
pub(super) const EXPORT_POLICY_PREFIX: &str = "~BGP_EXPORT~";

/// Add this L3Out's peers to the VRF's BGP process, creating the process on
/// first use.
pub(super) fn lower(
    device: &mut DeviceConfig,
    settings: &LoweringSettings,
    l3out: &L3Out,
    vrf: &str,
    node_id: &str,
    diagnostics: &mut Diagnostics,
) {
    let default_local_as = default_local_as(l3out, diagnostics);

    let mut peers = Vec::new();
    for config in &l3out.bgp_peers {
        if let Some(peer) = peer(device, l3out, config, default_local_as, diagnostics) {
            peers.push(peer);
        }
    }

    let mut policies = Vec::with_capacity(peers.len() * 2);
    let process = device
        .vrf_mut(vrf)
        .bgp
        .get_or_insert_with(|| new_process(settings, l3out, node_id, default_local_as, diagnostics));
    for (peer, import, export) in peers {
        process.peers.insert(peer.peer_address, peer);
        policies.push(import);
        policies.push(export);
    }
    for policy in policies {
        device.routing_policies.insert(policy.name.clone(), policy);
    }
}

fn new_process(
    settings: &LoweringSettings,
    l3out: &L3Out,
    node_id: &str,
    local_as: Option<u64>,
    diagnostics: &mut Diagnostics,
) -> BgpProcess {
    let configured = l3out.bgp_process.clone().unwrap_or_default();
    let raw_router_id = configured
        .router_id
        .as_deref()
        .or_else(|| l3out.router_id_for(node_id))
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let router_id = match raw_router_id {
        None => RouterId::Auto,
        Some(raw) => match raw.parse::<Ipv4Addr>() {
            Ok(ip) => RouterId::Ip(ip),
            Err(_) => {
                diagnostics.value(format!(
                    "Invalid router ID {raw} for BGP process in L3Out {}",
                    l3out.name
                ));
                RouterId::Auto
            }
        },
    };

    BgpProcess {
        router_id,
        local_as,
        ebgp_admin_distance: configured
            .ebgp_admin_distance
            .unwrap_or(settings.ebgp_admin_distance),
        ibgp_admin_distance: configured
            .ibgp_admin_distance
            .unwrap_or(settings.ibgp_admin_distance),
        local_admin_distance: configured
            .local_admin_distance
            .unwrap_or(settings.local_bgp_weight),
        peers: Default::default(),
    }
}

// The process AS, else the first peer's local AS.
fn default_local_as(l3out: &L3Out, diagnostics: &mut Diagnostics) -> Option<u64> {
    if let Some(asn) = l3out.bgp_process.as_ref().and_then(|p| p.asn) {
        return Some(asn);
    }
    let raw = l3out.bgp_peers.first()?.local_as.as_deref()?;
    match raw.trim().parse::<u64>() {
        Ok(asn) => Some(asn),
        Err(_) => {
            diagnostics.value(format!(
                "Invalid local AS '{raw}' in BGP peer for L3Out {}, ignoring",
                l3out.name
            ));
            None
        }
    }
}

fn peer(
    device: &DeviceConfig,
    l3out: &L3Out,
    config: &BgpPeerConfig,
    default_local_as: Option<u64>,
    diagnostics: &mut Diagnostics,
) -> Option<(BgpPeer, RoutingPolicy, RoutingPolicy)> {
    let Some(raw_address) = config.peer_address.as_deref().filter(|a| !a.trim().is_empty()) else {
        diagnostics.structural(format!("BGP peer in L3Out {} has no peer address", l3out.name));
        return None;
    };
    // Peer addresses are sometimes written with a prefix length.
    let host = raw_address.split('/').next().unwrap_or(raw_address).trim();
    let Ok(peer_address) = host.parse::<Ipv4Addr>() else {
        diagnostics.value(format!(
            "Invalid BGP peer address {raw_address} in L3Out {}",
            l3out.name
        ));
        return None;
    };

    let mut as_number = |raw: Option<&str>, label: &str| -> Option<u64> {
        let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
        match raw.parse::<u64>() {
            Ok(asn) => Some(asn),
            Err(_) => {
                diagnostics.value(format!(
                    "Invalid {label} AS {raw} for BGP peer {peer_address} in L3Out {}",
                    l3out.name
                ));
                None
            }
        }
    };
    let remote_as = as_number(config.remote_as.as_deref(), "remote");
    let local_as = as_number(config.local_as.as_deref(), "local").or(default_local_as);

    let local_ip = local_ip(device, l3out, config, peer_address, diagnostics);
    let import = import_policy(l3out, config, peer_address, diagnostics);
    let export = export_policy(l3out, config, peer_address);

    let peer = BgpPeer {
        peer_address,
        remote_as,
        local_as,
        local_ip,
        description: config
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("BGP peer from L3Out {}", l3out.name)),
        import_policy: Some(import.name.clone()),
        export_policy: Some(export.name.clone()),
        route_reflector_client: config.route_reflector_client,
        ebgp_multihop: config.ebgp_multihop,
    };
    Some((peer, import, export))
}

/// Source address for the session.
///
/// An explicit update source must have an address. Otherwise the first
/// interface whose subnet holds the peer wins, then loopback0.
fn local_ip(
    device: &DeviceConfig,
    l3out: &L3Out,
    config: &BgpPeerConfig,
    peer_address: Ipv4Addr,
    diagnostics: &mut Diagnostics,
) -> Option<Ipv4Addr> {
    if let Some(source) = config.update_source.as_deref().filter(|s| !s.is_empty()) {
        let ip = device
            .interfaces
            .get(source)
            .and_then(|i| i.address)
            .map(|a| a.address.ip());
        if ip.is_none() {
            diagnostics.referential(format!(
                "Update source interface {source} not found or has no IP address for BGP peer {peer_address} in L3Out {}",
                l3out.name
            ));
        }
        return ip;
    }

    device
        .interfaces
        .values()
        .filter_map(|i| i.address)
        .find(|a| a.address.contains(peer_address))
        .or_else(|| device.interfaces.get(LOOPBACK).and_then(|i| i.address))
        .map(|a| a.address.ip())
}

fn import_policy(
    l3out: &L3Out,
    config: &BgpPeerConfig,
    peer_address: Ipv4Addr,
    diagnostics: &mut Diagnostics,
) -> RoutingPolicy {
    let mut statements = Vec::new();
    if let Some(raw) = config.local_preference.as_deref().filter(|p| !p.trim().is_empty()) {
        match raw.trim().parse::<u32>() {
            Ok(pref) => statements.push(Statement::SetLocalPreference(pref)),
            Err(_) => diagnostics.value(format!(
                "Invalid local preference {raw} for BGP peer {peer_address} in L3Out {}",
                l3out.name
            )),
        }
    }
    statements.push(Statement::SetOrigin(Origin::Igp));
    statements.push(route_map_gate(config.import_route_map.as_deref()));
    RoutingPolicy {
        name: format!("{IMPORT_POLICY_PREFIX}{}~{peer_address}", l3out.name),
        statements,
    }
}

fn export_policy(l3out: &L3Out, config: &BgpPeerConfig, peer_address: Ipv4Addr) -> RoutingPolicy {
    let mut statements = Vec::new();
    if config.next_hop_self {
        statements.push(Statement::SetNextHopSelf);
    }
    statements.push(route_map_gate(config.export_route_map.as_deref()));
    RoutingPolicy {
        name: format!("{EXPORT_POLICY_PREFIX}{}~{peer_address}", l3out.name),
        statements,
    }
}

// Accept only what the route map permits; with no route map accept all.
fn route_map_gate(route_map: Option<&str>) -> Statement {
    match route_map.map(str::trim).filter(|m| !m.is_empty()) {
        Some(name) => Statement::If {
            route_map: name.to_string(),
            then: vec![Statement::Accept],
            otherwise: vec![Statement::Reject],
        },
        None => Statement::Accept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{InterfaceAddress, InterfaceConfig, InterfaceKind, DEFAULT_VRF};
    use crate::model::{BgpProcessConfig, L3OutNode, NodeRole};
    use pretty_assertions::assert_eq;

    fn device_with(iface: &str, addr: &str) -> DeviceConfig {
        let mut device = DeviceConfig::new("leaf", Some("101".to_string()), NodeRole::Leaf);
        let mut config = InterfaceConfig::new(iface, InterfaceKind::Physical, DEFAULT_VRF, 9000);
        config.address = Some(InterfaceAddress::new(addr.parse().expect("addr")));
        device.interfaces.insert(iface.to_string(), config);
        device
    }

    fn peer_config(addr: &str) -> BgpPeerConfig {
        BgpPeerConfig {
            peer_address: Some(addr.to_string()),
            remote_as: Some("65002".to_string()),
            ..Default::default()
        }
    }

    fn l3out(peers: Vec<BgpPeerConfig>) -> L3Out {
        L3Out {
            name: "wan".to_string(),
            tenant: "prod".to_string(),
            bgp_process: Some(BgpProcessConfig {
                asn: Some(65001),
                ..Default::default()
            }),
            bgp_peers: peers,
            nodes: vec![L3OutNode {
                node_id: "101".to_string(),
                router_id: Some("1.1.1.1".to_string()),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn peers_land_in_one_process_per_vrf() {
        let mut device = device_with("Ethernet1/10", "192.0.2.1/30");
        let mut diags = Diagnostics::new();
        let settings = LoweringSettings::default();
        lower(&mut device, &settings, &l3out(vec![peer_config("192.0.2.2")]), "vrf1", "101", &mut diags);
        lower(&mut device, &settings, &l3out(vec![peer_config("198.51.100.9")]), "vrf1", "101", &mut diags);

        let process = device.vrfs["vrf1"].bgp.as_ref().expect("bgp");
        assert_eq!(process.router_id, RouterId::Ip(Ipv4Addr::new(1, 1, 1, 1)));
        assert_eq!(process.local_as, Some(65001));
        assert_eq!(process.ebgp_admin_distance, 20);
        assert_eq!(process.peers.len(), 2);

        let near = &process.peers[&Ipv4Addr::new(192, 0, 2, 2)];
        assert_eq!(near.local_ip, Some(Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(near.remote_as, Some(65002));
        assert_eq!(near.local_as, Some(65001));
        assert_eq!(near.description, "BGP peer from L3Out wan");
        assert_eq!(process.peers[&Ipv4Addr::new(198, 51, 100, 9)].local_ip, None);
        assert!(device.routing_policies.contains_key("~BGP_IMPORT~wan~192.0.2.2"));
        assert!(diags.is_empty());
    }

    #[test]
    fn import_policy_gates_on_route_map() {
        let mut config = peer_config("192.0.2.2");
        config.local_preference = Some("200".to_string());
        config.import_route_map = Some("rm-in".to_string());
        let mut diags = Diagnostics::new();
        let policy = import_policy(&l3out(vec![]), &config, Ipv4Addr::new(192, 0, 2, 2), &mut diags);
        assert_eq!(
            policy.statements,
            vec![
                Statement::SetLocalPreference(200),
                Statement::SetOrigin(Origin::Igp),
                Statement::If {
                    route_map: "rm-in".to_string(),
                    then: vec![Statement::Accept],
                    otherwise: vec![Statement::Reject],
                },
            ]
        );

        config.next_hop_self = true;
        let export = export_policy(&l3out(vec![]), &config, Ipv4Addr::new(192, 0, 2, 2));
        assert_eq!(export.statements, vec![Statement::SetNextHopSelf, Statement::Accept]);
    }

    #[test]
    fn bad_peer_fields_are_reported() {
        let mut device = device_with("Ethernet1/10", "192.0.2.1/30");
        let mut bad_as = peer_config("192.0.2.2");
        bad_as.remote_as = Some("sixty".to_string());
        bad_as.update_source = Some("Loopback9".to_string());
        let peers = vec![BgpPeerConfig::default(), peer_config("not-an-ip"), bad_as];
        let mut diags = Diagnostics::new();
        lower(&mut device, &LoweringSettings::default(), &l3out(peers), "vrf1", "101", &mut diags);

        let process = device.vrfs["vrf1"].bgp.as_ref().expect("bgp");
        assert_eq!(process.peers.len(), 1);
        let peer = &process.peers[&Ipv4Addr::new(192, 0, 2, 2)];
        assert_eq!(peer.remote_as, None);
        assert_eq!(peer.local_ip, None);
        assert!(diags.contains("BGP peer in L3Out wan has no peer address"));
        assert!(diags.contains("Invalid BGP peer address not-an-ip in L3Out wan"));
        assert!(diags.contains("Invalid remote AS sixty for BGP peer 192.0.2.2 in L3Out wan"));
        assert!(diags.contains("Update source interface Loopback9 not found"));
    }
}
