use ipnetwork::Ipv4Network;

use crate::device::{DeviceConfig, InterfaceAddress, InterfaceConfig, InterfaceKind, DEFAULT_VRF};
use crate::diagnostics::Diagnostics;
use crate::ids::{Encap, VlanId};
use crate::model::{AciModel, BridgeDomain};

use super::LoweringContext;

/// Everything needed to emit one bridge domain's VLAN interface.
#[derive(Debug, Clone)]
pub(super) struct BridgeDomainPlan {
    pub key: String,
    pub name: String,
    pub vlan: VlanId,
    pub vrf: String,
    pub addresses: Vec<InterfaceAddress>,
}

/// Resolve VLAN, VRF, and gateway addresses for every bridge domain.
///
/// Runs once per conversion so problems are reported once, not per device.
pub(super) fn plan(model: &AciModel, diagnostics: &mut Diagnostics) -> Vec<BridgeDomainPlan> {
    model
        .bridge_domains()
        .iter()
        .map(|(key, bd)| BridgeDomainPlan {
            key: key.clone(),
            name: bd.name.clone(),
            vlan: vlan_for(key, bd, diagnostics),
            vrf: vrf_for(model, bd, diagnostics),
            addresses: gateway_addresses(bd, diagnostics),
        })
        .collect()
}

fn vlan_for(key: &str, bd: &BridgeDomain, diagnostics: &mut Diagnostics) -> VlanId {
    match &bd.encapsulation {
        Some(Encap::Vlan(id)) => *id,
        Some(Encap::Invalid(raw)) if raw.trim().to_ascii_lowercase().starts_with("vlan-") => {
            let generated = VlanId::from_name_hash(key);
            diagnostics.value(format!(
                "Invalid encapsulation '{raw}' for bridge domain {}, using generated VLAN ID {generated}",
                bd.name
            ));
            generated
        }
        _ => VlanId::from_name_hash(key),
    }
}

fn vrf_for(model: &AciModel, bd: &BridgeDomain, diagnostics: &mut Diagnostics) -> String {
    let Some(fq) = bd.vrf.as_deref() else {
        return DEFAULT_VRF.to_string();
    };
    match model.vrfs().get(fq).filter(|v| !v.name.is_empty()) {
        Some(vrf) => vrf.name.clone(),
        None => {
            diagnostics.referential(format!(
                "VRF {fq} not found for bridge domain {}, using default VRF",
                bd.name
            ));
            DEFAULT_VRF.to_string()
        }
    }
}

// The gateway is the first host of each subnet; /31 and /32 keep the
// network address.
fn gateway_addresses(bd: &BridgeDomain, diagnostics: &mut Diagnostics) -> Vec<InterfaceAddress> {
    let mut out = Vec::new();
    for subnet in &bd.subnets {
        let parsed = subnet
            .parse::<Ipv4Network>()
            .ok()
            .and_then(|net| gateway(net.network(), net.prefix()));
        match parsed {
            Some(address) => out.push(InterfaceAddress {
                generate_local_route: false,
                ..InterfaceAddress::new(address)
            }),
            None => diagnostics.value(format!(
                "Invalid subnet in bridge domain {}: {subnet}",
                bd.name
            )),
        }
    }
    out
}

fn gateway(network: std::net::Ipv4Addr, prefix: u8) -> Option<Ipv4Network> {
    let ip = if prefix < 31 {
        u32::from(network).checked_add(1)?.into()
    } else {
        network
    };
    Ipv4Network::new(ip, prefix).ok()
}

/// One `Vlan{n}` interface per bridge domain, unless the name is taken.
pub(super) fn install(device: &mut DeviceConfig, ctx: &LoweringContext<'_>) {
    for bd in &ctx.bridge_domains {
        let name = format!("Vlan{}", bd.vlan);
        if device.interfaces.contains_key(&name) {
            continue;
        }
        let mut config = InterfaceConfig::new(&name, InterfaceKind::Vlan, &bd.vrf, ctx.settings.interface_mtu);
        config.vlan = Some(bd.vlan);
        config.human_name = Some(format!("VLAN {} ({})", bd.vlan, bd.name));
        let mut addresses = bd.addresses.iter().copied();
        config.address = addresses.next();
        config.secondary_addresses = addresses.collect();
        device.interfaces.insert(name, config);
    }
}
