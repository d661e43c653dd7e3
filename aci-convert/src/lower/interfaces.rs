use ipnetwork::Ipv4Network;

use crate::device::{DeviceConfig, InterfaceAddress, InterfaceConfig, InterfaceKind, DEFAULT_VRF};
use crate::diagnostics::Diagnostics;
use crate::ids::ethernet_slot_port;
use crate::model::{FabricNode, NodeRole};
use crate::settings::LoweringSettings;

use super::LoweringContext;

pub(super) const LOOPBACK: &str = "loopback0";
pub(super) const MANAGEMENT: &str = "mgmt0";

const FABRIC_MARKER: &str = "Fabric interface (IS-IS/Overlay)";

/// Node ports, path-attachment ports, loopback0 and mgmt0.
///
/// A node that ends up with nothing but loopback0 gets a role-based set of
/// fallback ports so the topology still has something to connect.
pub(super) fn base_interfaces(
    device: &mut DeviceConfig,
    ctx: &LoweringContext<'_>,
    node: &FabricNode,
    node_id: &str,
    diagnostics: &mut Diagnostics,
) {
    let settings = ctx.settings;

    for iface in &node.interfaces {
        let mut config = InterfaceConfig::new(
            &iface.name,
            InterfaceKind::from_word(iface.kind.as_deref()),
            DEFAULT_VRF,
            settings.interface_mtu,
        );
        config.enabled = iface.enabled;
        config.human_name = Some(iface.name.clone());
        config.description = iface.description.clone().filter(|d| !d.is_empty());
        mark_fabric_port(&mut config, node.role, settings);
        device.interfaces.insert(iface.name.clone(), config);
    }

    if let Some(attachments) = ctx.model.path_attachments().get(node_id) {
        for (name, attachment) in attachments {
            if device.interfaces.contains_key(name) {
                continue;
            }
            let mut config =
                InterfaceConfig::new(name, InterfaceKind::Physical, DEFAULT_VRF, settings.interface_mtu);
            config.human_name = Some(name.clone());
            if let Some(descr) = attachment.description.as_deref().filter(|d| !d.is_empty()) {
                config.append_description(descr);
            }
            if let Some(epg) = &attachment.epg_name {
                config.append_description(&format!("EPG: {epg}"));
            }
            if let Some(encap) = &attachment.raw_encap {
                config.append_description(&format!("VLAN: {encap}"));
            }
            mark_fabric_port(&mut config, node.role, settings);
            device.interfaces.insert(name.clone(), config);
        }
    }

    loopback(device, ctx, node.role);
    management(device, node, settings, diagnostics);

    if device.interfaces.len() == 1 {
        let label = node.name.clone().unwrap_or_else(|| device.hostname.clone());
        diagnostics.structural(format!(
            "No interfaces defined for fabric node {label}. Adding fallback fabric interfaces based on role."
        ));
        fallback_ports(device, node.role, &label, settings);
    }
}

pub(super) fn loopback(device: &mut DeviceConfig, ctx: &LoweringContext<'_>, role: NodeRole) {
    let mut config = InterfaceConfig::new(
        LOOPBACK,
        InterfaceKind::Loopback,
        DEFAULT_VRF,
        ctx.settings.interface_mtu,
    );
    config.human_name = Some("VTEP Loopback".to_string());
    if matches!(role, NodeRole::Leaf | NodeRole::Spine) {
        config.description =
            Some("VTEP (VXLAN Tunnel Endpoint) - dynamically assigned IP from TEP pool".to_string());
    }
    device.interfaces.insert(LOOPBACK.to_string(), config);
}

fn management(
    device: &mut DeviceConfig,
    node: &FabricNode,
    settings: &LoweringSettings,
    diagnostics: &mut Diagnostics,
) {
    let Some(mgmt) = node.management.as_ref().filter(|m| !m.address.is_empty()) else {
        return;
    };
    let address = match mgmt.address.parse::<Ipv4Network>() {
        Ok(address) => address,
        Err(e) => {
            diagnostics.value(format!(
                "Failed to parse management address '{}': {e}",
                mgmt.address
            ));
            return;
        }
    };

    let mut config = InterfaceConfig::new(MANAGEMENT, InterfaceKind::Physical, DEFAULT_VRF, settings.interface_mtu);
    config.human_name = Some("Management Interface".to_string());
    config.address = Some(InterfaceAddress::new(address));
    config.description = Some(match mgmt.gateway.as_deref().filter(|g| !g.is_empty()) {
        Some(gw) => format!("Out-of-band management interface | Gateway: {gw}"),
        None => "Out-of-band management interface".to_string(),
    });
    device.interfaces.insert(MANAGEMENT.to_string(), config);
}

fn fallback_ports(device: &mut DeviceConfig, role: NodeRole, label: &str, settings: &LoweringSettings) {
    let mut add = |port: u32, description: String| {
        let name = format!("Ethernet1/{port}");
        let mut config = InterfaceConfig::new(&name, InterfaceKind::Physical, DEFAULT_VRF, settings.interface_mtu);
        config.human_name = Some(name.clone());
        config.description = Some(description);
        device.interfaces.insert(name, config);
    };

    match role {
        NodeRole::Spine => {
            for port in 1..=settings.spine_fallback_ports {
                add(port, format!("Fabric interface to leaf (fallback) - Node {label}"));
            }
        }
        NodeRole::Leaf | NodeRole::Service => {
            for &port in &settings.leaf_uplink_ports {
                add(port, format!("Fabric uplink to spine (fallback) - Node {label}"));
            }
            for port in 1..=settings.leaf_downstream_ports {
                add(port, format!("Downstream port for EPGs (fallback) - Node {label}"));
            }
        }
        NodeRole::Unknown => {}
    }
}

/// The vPC peer-link for the first pair this node belongs to.
pub(super) fn vpc_peer_link(device: &mut DeviceConfig, ctx: &LoweringContext<'_>, node_id: &str) {
    let Some((pair, peer_id)) = ctx
        .model
        .vpc_pairs()
        .values()
        .find_map(|pair| pair.peer_of(node_id).map(|peer| (pair, peer)))
    else {
        return;
    };

    let peer_label = ctx
        .model
        .fabric_nodes()
        .get(peer_id)
        .and_then(|n| n.name.as_deref())
        .unwrap_or(peer_id);
    let vpc_label = pair.vpc_name.as_deref().unwrap_or(&pair.vpc_id);
    let name = &ctx.settings.vpc_peer_link_name;

    let mut config = InterfaceConfig::new(
        name,
        InterfaceKind::Aggregated,
        DEFAULT_VRF,
        ctx.settings.interface_mtu,
    );
    config.human_name = Some(format!("VPC Peer-link (VPC {})", pair.vpc_id));
    config.description = Some(format!(
        "VPC peer-link connecting to {peer_label} (VPC: {vpc_label})"
    ));
    device.interfaces.insert(name.clone(), config);
}

// Leaf uplinks sit at or above the first uplink port; every low-numbered
// spine port faces a leaf.
fn is_fabric_port(name: &str, role: NodeRole, settings: &LoweringSettings) -> bool {
    let Some((1, port)) = ethernet_slot_port(name) else {
        return false;
    };
    match role {
        NodeRole::Spine => port <= settings.spine_fabric_max_port || port >= settings.fabric_uplink_first_port,
        _ => port >= settings.fabric_uplink_first_port,
    }
}

fn mark_fabric_port(config: &mut InterfaceConfig, role: NodeRole, settings: &LoweringSettings) {
    if is_fabric_port(&config.name, role, settings) {
        config.append_description(FABRIC_MARKER);
    }
}
