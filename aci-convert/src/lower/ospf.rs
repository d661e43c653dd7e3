use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use crate::device::{
    DeviceConfig, OspfAreaConfig, OspfAreaType, OspfInterfaceSettings, OspfNetworkType, OspfProcess,
};
use crate::diagnostics::Diagnostics;
use crate::model::{L3Out, OspfConfig};
use crate::settings::LoweringSettings;

const LAST_RESORT_ROUTER_ID: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 1);

/// One OSPF process for this L3Out, plus per-interface settings.
pub(super) fn lower(
    device: &mut DeviceConfig,
    settings: &LoweringSettings,
    l3out: &L3Out,
    config: &OspfConfig,
    vrf: &str,
    node_id: &str,
    diagnostics: &mut Diagnostics,
) {
    let process_id = config
        .process_id
        .clone()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| l3out.name.clone());
    let router_id = router_id(device, l3out, node_id, diagnostics);
    let mut areas = areas(l3out, config, diagnostics);
    let default_area = config
        .area_id
        .as_deref()
        .and_then(parse_area_id)
        .unwrap_or(Ipv4Addr::UNSPECIFIED);

    for iface_config in &config.interfaces {
        let Some(wanted) = iface_config.name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        let prefixed = format!("L3Out-{}-{wanted}", l3out.name);
        let name = if device.interfaces.contains_key(wanted) {
            wanted.to_string()
        } else if device.interfaces.contains_key(&prefixed) {
            prefixed
        } else {
            diagnostics.referential(format!(
                "OSPF interface {wanted} in L3Out {} not found in converted interfaces",
                l3out.name
            ));
            continue;
        };

        let network_type = match iface_config.network_type.as_deref() {
            None => OspfNetworkType::PointToPoint,
            Some(raw) => OspfNetworkType::parse(raw).unwrap_or_else(|| {
                diagnostics.value(format!(
                    "Unknown OSPF network type '{raw}' for interface {name} in L3Out {}, using point-to-point",
                    l3out.name
                ));
                OspfNetworkType::PointToPoint
            }),
        };

        areas
            .entry(default_area)
            .or_insert_with(|| area(default_area, OspfAreaType::Normal))
            .interfaces
            .insert(name.clone());

        if let Some(iface) = device.interfaces.get_mut(&name) {
            iface.ospf = Some(OspfInterfaceSettings {
                process: process_id.clone(),
                area: default_area,
                cost: iface_config.cost,
                hello_interval: iface_config.hello_interval.unwrap_or(settings.ospf_hello_interval),
                dead_interval: iface_config.dead_interval.unwrap_or(settings.ospf_dead_interval),
                network_type,
                passive: iface_config.passive.unwrap_or(false),
            });
        }
    }

    let process = OspfProcess {
        process_id: process_id.clone(),
        router_id,
        reference_bandwidth: settings.ospf_reference_bandwidth,
        areas,
    };
    device.vrf_mut(vrf).ospf.insert(process_id, process);
}

// First non-zero interface address, then the node id's low byte, then a
// fixed last resort.
fn router_id(device: &DeviceConfig, l3out: &L3Out, node_id: &str, diagnostics: &mut Diagnostics) -> Ipv4Addr {
    let from_interface = device
        .interfaces
        .values()
        .filter_map(|i| i.all_addresses().next())
        .map(|a| a.address.ip())
        .find(|ip| !ip.is_unspecified());
    if let Some(ip) = from_interface {
        return ip;
    }

    let digits: String = node_id.chars().filter(char::is_ascii_digit).collect();
    if let Ok(id) = digits.parse::<u32>() {
        return Ipv4Addr::from(id & 0xFF);
    }

    diagnostics.value(format!(
        "Could not infer OSPF router ID for L3Out {}, using {LAST_RESORT_ROUTER_ID}",
        l3out.name
    ));
    LAST_RESORT_ROUTER_ID
}

fn areas(l3out: &L3Out, config: &OspfConfig, diagnostics: &mut Diagnostics) -> BTreeMap<Ipv4Addr, OspfAreaConfig> {
    let mut out = BTreeMap::new();
    for entry in &config.areas {
        let Some(id) = parse_area_id(&entry.area_id) else {
            diagnostics.value(format!(
                "Invalid OSPF area ID {} in L3Out {}, skipping area",
                entry.area_id, l3out.name
            ));
            continue;
        };
        let area_type = match entry.area_type.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("stub") => OspfAreaType::Stub,
            Some("nssa") => OspfAreaType::Nssa,
            _ => OspfAreaType::Normal,
        };
        out.insert(id, area(id, area_type));
    }

    if out.is_empty() {
        let id = config
            .area_id
            .as_deref()
            .and_then(parse_area_id)
            .unwrap_or(Ipv4Addr::UNSPECIFIED);
        out.insert(id, area(id, OspfAreaType::Normal));
    }
    out
}

fn area(id: Ipv4Addr, area_type: OspfAreaType) -> OspfAreaConfig {
    OspfAreaConfig {
        area: id,
        area_type,
        interfaces: BTreeSet::new(),
    }
}

/// Area ids are written as a number (`1`) or a dotted quad (`0.0.0.1`).
fn parse_area_id(raw: &str) -> Option<Ipv4Addr> {
    let raw = raw.trim();
    raw.parse::<u32>()
        .map(Ipv4Addr::from)
        .or_else(|_| raw.parse::<Ipv4Addr>())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{InterfaceAddress, InterfaceConfig, InterfaceKind, DEFAULT_VRF};
    use crate::model::{NodeRole, OspfArea, OspfInterfaceConfig};
    use pretty_assertions::assert_eq;

    fn l3out() -> L3Out {
        L3Out {
            name: "wan".to_string(),
            ..Default::default()
        }
    }

    fn device(addr: Option<&str>) -> DeviceConfig {
        let mut device = DeviceConfig::new("leaf", Some("101".to_string()), NodeRole::Leaf);
        let mut iface = InterfaceConfig::new("Ethernet1/10", InterfaceKind::Physical, DEFAULT_VRF, 9000);
        iface.address = addr.map(|a| InterfaceAddress::new(a.parse().expect("addr")));
        device.interfaces.insert(iface.name.clone(), iface);
        device
    }

    #[test]
    fn area_ids_accept_both_spellings() {
        assert_eq!(parse_area_id("1"), Some(Ipv4Addr::new(0, 0, 0, 1)));
        assert_eq!(parse_area_id("0.0.0.10"), Some(Ipv4Addr::new(0, 0, 0, 10)));
        assert_eq!(parse_area_id("backbone"), None);
    }

    #[test]
    fn process_with_interfaces_and_areas() {
        let config = OspfConfig {
            area_id: Some("1".to_string()),
            areas: vec![
                OspfArea {
                    area_id: "1".to_string(),
                    area_type: Some("nssa".to_string()),
                },
                OspfArea {
                    area_id: "x".to_string(),
                    area_type: None,
                },
            ],
            interfaces: vec![
                OspfInterfaceConfig {
                    name: Some("Ethernet1/10".to_string()),
                    cost: Some(10),
                    passive: Some(true),
                    ..Default::default()
                },
                OspfInterfaceConfig {
                    name: Some("Ethernet1/20".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let mut device = device(Some("192.0.2.1/30"));
        let mut diags = Diagnostics::new();
        lower(&mut device, &LoweringSettings::default(), &l3out(), &config, "vrf1", "101", &mut diags);

        let process = &device.vrfs["vrf1"].ospf["wan"];
        assert_eq!(process.router_id, Ipv4Addr::new(192, 0, 2, 1));
        assert_eq!(process.reference_bandwidth, 100.0);
        let area = &process.areas[&Ipv4Addr::new(0, 0, 0, 1)];
        assert_eq!(area.area_type, OspfAreaType::Nssa);
        assert_eq!(area.interfaces.iter().collect::<Vec<_>>(), vec!["Ethernet1/10"]);

        let settings = device.interfaces["Ethernet1/10"].ospf.clone().expect("ospf");
        assert_eq!(settings.cost, Some(10));
        assert_eq!(settings.hello_interval, 10);
        assert_eq!(settings.dead_interval, 40);
        assert_eq!(settings.network_type, OspfNetworkType::PointToPoint);
        assert!(settings.passive);

        assert!(diags.contains("Invalid OSPF area ID x in L3Out wan, skipping area"));
        assert!(diags.contains("OSPF interface Ethernet1/20 in L3Out wan not found"));
    }

    #[test]
    fn router_id_falls_back_to_node_id() {
        let mut diags = Diagnostics::new();
        assert_eq!(
            router_id(&device(None), &l3out(), "301", &mut diags),
            Ipv4Addr::new(0, 0, 0, 45)
        );
        assert_eq!(
            router_id(&device(None), &l3out(), "leaf", &mut diags),
            LAST_RESORT_ROUTER_ID
        );
        assert!(diags.contains("Could not infer OSPF router ID for L3Out wan, using 0.0.0.1"));
    }

    #[test]
    fn no_areas_gives_backbone() {
        let mut device = device(None);
        let mut diags = Diagnostics::new();
        let config = OspfConfig {
            process_id: Some("7".to_string()),
            ..Default::default()
        };
        lower(&mut device, &LoweringSettings::default(), &l3out(), &config, "default", "101", &mut diags);
        let process = &device.vrfs["default"].ospf["7"];
        assert_eq!(process.areas.keys().collect::<Vec<_>>(), vec![&Ipv4Addr::UNSPECIFIED]);
    }
}
