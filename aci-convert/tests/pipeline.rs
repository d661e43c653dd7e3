use std::net::Ipv4Addr;
use std::path::PathBuf;

use aci_convert::convert_tree;
use aci_convert::device::{ConversionResult, InterfaceKind, RouterId};
use aci_convert::resolve::load_fabric_links;
use aci_convert::settings::{default_settings, LoweringSettings};
use pretty_assertions::assert_eq;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("fixtures")
        .join(name)
}

fn convert_fixture(name: &str, settings: &LoweringSettings) -> ConversionResult {
    let root = mit_tree::decode_file(&fixture(name)).expect("fixture decodes");
    convert_tree(&root, name, Vec::new(), settings)
}

#[test]
fn every_fabric_node_becomes_a_device() {
    let result = convert_fixture("fabric.json", &default_settings());
    assert_eq!(result.fabric_hostname, "aci-fabric");
    let hosts: Vec<&str> = result.devices.keys().map(String::as_str).collect();
    assert_eq!(hosts, vec!["leaf-101", "leaf-102", "spine-201", "spine-202"]);
    assert!(result.diagnostics.contains(
        "Skipping unsupported tenant child object: vnsLDevVip (name: fw-cluster) in tenant prod"
    ));
}

#[test]
fn json_and_xml_exports_lower_identically() {
    let settings = default_settings();
    let json = convert_fixture("fabric.json", &settings);
    let xml = convert_fixture("fabric.xml", &settings);

    assert_eq!(
        serde_json::to_value(&json.devices).expect("json devices"),
        serde_json::to_value(&xml.devices).expect("xml devices")
    );
    assert_eq!(json.edges, xml.edges);
    assert_eq!(
        json.diagnostics.messages().collect::<Vec<_>>(),
        xml.diagnostics.messages().collect::<Vec<_>>()
    );
}

#[test]
fn border_leaf_carries_the_l3out() {
    let result = convert_fixture("fabric.json", &default_settings());
    let leaf = &result.devices["leaf-101"];

    let uplink = &leaf.interfaces["Ethernet1/10"];
    assert_eq!(uplink.vrf, "vrf1");
    assert_eq!(uplink.kind, InterfaceKind::Physical);

    let vrf = &leaf.vrfs["vrf1"];
    let bgp = vrf.bgp.as_ref().expect("bgp process");
    assert_eq!(bgp.router_id, RouterId::Ip(Ipv4Addr::new(10, 255, 0, 101)));
    let peer = &bgp.peers[&Ipv4Addr::new(192, 0, 2, 1)];
    assert_eq!(peer.remote_as, Some(65100));
    assert_eq!(peer.local_ip, Some(Ipv4Addr::new(192, 0, 2, 2)));
    assert!(leaf.routing_policies.contains_key("~BGP_IMPORT~wan~192.0.2.1"));
    assert!(leaf.routing_policies.contains_key("~BGP_EXPORT~wan~192.0.2.1"));

    let default_route = vrf
        .static_routes
        .iter()
        .find(|r| r.prefix.to_string() == "0.0.0.0/0")
        .expect("default route");
    assert_eq!(default_route.next_hop_ip, Some(Ipv4Addr::new(192, 0, 2, 1)));

    let other = &result.devices["leaf-102"];
    assert!(other.bgp_peers().next().is_none());
    assert!(!other.interfaces.contains_key("Ethernet1/10"));
}

#[test]
fn contract_acls_land_on_every_device() {
    let result = convert_fixture("fabric.json", &default_settings());
    for device in result.devices.values() {
        for acl in ["~CONTRACT~prod:web", "~CONTRACT~prod:db", "~TABOO~prod:block-telnet"] {
            assert!(device.acls.contains_key(acl), "{} lacks {acl}", device.hostname);
        }
    }
}

#[test]
fn epg_ports_are_bound_on_both_vpc_members() {
    let result = convert_fixture("fabric.json", &default_settings());
    for host in ["leaf-101", "leaf-102"] {
        let device = &result.devices[host];
        let port = &device.interfaces["Ethernet1/1"];
        assert_eq!(
            port.incoming_filter.as_deref(),
            Some("~EPG_POLICY~prod:shop:web~IN"),
            "{host}"
        );
        assert_eq!(
            port.outgoing_filter.as_deref(),
            Some("~EPG_POLICY~prod:shop:web~OUT"),
            "{host}"
        );
        assert!(device.acls.contains_key("~EPG_POLICY~prod:shop:web~IN"));
        assert!(device.interfaces.contains_key("port-channel1"));
    }
    // The db EPG is only attached to leaf 101.
    let spine = &result.devices["spine-201"];
    assert!(!spine.acls.contains_key("~EPG_POLICY~prod:shop:db~OUT"));
}

#[test]
fn bridge_domains_become_vlan_interfaces() {
    let result = convert_fixture("fabric.json", &default_settings());
    let leaf = &result.devices["leaf-101"];
    let svi = &leaf.interfaces["Vlan120"];
    assert_eq!(svi.kind, InterfaceKind::Vlan);
    assert_eq!(svi.vrf, "vrf1");
    assert_eq!(
        svi.address.map(|a| a.address.to_string()),
        Some("10.1.2.1/24".to_string())
    );
    assert!(leaf.interfaces.contains_key("L2Out-legacy"));
}

#[test]
fn settings_change_lowered_values() {
    let settings = LoweringSettings {
        interface_mtu: 1500,
        vpc_peer_link_name: "port-channel100".to_string(),
        ..default_settings()
    };
    let result = convert_fixture("fabric.json", &settings);
    let leaf = &result.devices["leaf-102"];
    assert_eq!(leaf.interfaces["Ethernet1/1"].mtu, 1500);
    assert!(leaf.interfaces.contains_key("port-channel100"));
}

#[test]
fn explicit_links_replace_the_synthesized_mesh() {
    let root = mit_tree::decode_file(&fixture("fabric.json")).expect("fixture");
    let settings = default_settings();

    let synthesized = convert_tree(&root, "fabric.json", Vec::new(), &settings);
    assert_eq!(synthesized.edges.len(), 5);

    let links = load_fabric_links(&fixture("links.json")).expect("links");
    let explicit = convert_tree(&root, "fabric.json", links, &settings);
    let lines: Vec<String> = explicit.edges.iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "leaf-101[Ethernet1/49] <-> spine-201[Ethernet1/1]",
            "leaf-101[Ethernet1/50] <-> spine-202[Ethernet1/1]",
            "leaf-102[Ethernet1/49] <-> spine-201[Ethernet1/2]",
            "leaf-102[Ethernet1/50] <-> spine-202[Ethernet1/2]",
        ]
    );
}

#[test]
fn export_without_nodes_yields_one_fabric_device() {
    let text = r#"{"polUni": {"attributes": {"name": "lab"}, "children": [
        {"fvTenant": {"attributes": {"name": "prod"}, "children": [
            {"fvCtx": {"attributes": {"name": "vrf1"}}}
        ]}}
    ]}}"#;
    let root = mit_tree::decode(text, "lab.json").expect("decode");
    let result = convert_tree(&root, "lab.json", Vec::new(), &default_settings());

    assert_eq!(result.devices.len(), 1);
    let device = &result.devices["lab"];
    assert!(device.vrfs.contains_key("vrf1"));
    assert!(result.edges.is_empty());
    assert!(result
        .diagnostics
        .contains("No fabric nodes defined in ACI configuration"));
}
