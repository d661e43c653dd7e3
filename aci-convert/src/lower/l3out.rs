use ipnetwork::Ipv4Network;

use crate::device::{DeviceConfig, InterfaceAddress, InterfaceConfig, InterfaceKind, DEFAULT_VRF};
use crate::diagnostics::Diagnostics;
use crate::model::{L3Out, PathAttachment};

use super::{bgp, ospf, static_routes, LoweringContext};

/// Lower every L3Out pinned to this node.
///
/// An L3Out with no node bindings and no path attachments is not pinned
/// anywhere and lands on every node.
pub(super) fn lower(
    device: &mut DeviceConfig,
    ctx: &LoweringContext<'_>,
    node_id: &str,
    diagnostics: &mut Diagnostics,
) {
    for l3out in ctx.model.l3outs().values() {
        let pinned = l3out.node_ids();
        if !pinned.is_empty() && !pinned.contains(node_id) {
            continue;
        }
        let vrf = vrf_for(ctx, l3out, diagnostics);
        device.vrf_mut(&vrf);

        for attachment in &l3out.path_attachments {
            if attachment.target.node_ids().any(|id| id == node_id) {
                routed_interface(device, ctx, l3out, &vrf, attachment, diagnostics);
            }
        }

        if !l3out.bgp_peers.is_empty() {
            bgp::lower(device, ctx.settings, l3out, &vrf, node_id, diagnostics);
        }
        static_routes::lower(device, ctx.settings, l3out, &vrf, diagnostics);
        if let Some(config) = &l3out.ospf {
            ospf::lower(device, ctx.settings, l3out, config, &vrf, node_id, diagnostics);
        }
    }
}

fn vrf_for(ctx: &LoweringContext<'_>, l3out: &L3Out, diagnostics: &mut Diagnostics) -> String {
    let Some(fq) = l3out.vrf.as_deref() else {
        return DEFAULT_VRF.to_string();
    };
    match ctx.vrf_name(fq) {
        Some(name) => name.to_string(),
        None => {
            diagnostics.referential(format!(
                "VRF {fq} not found for L3Out {}, using default VRF",
                l3out.name
            ));
            DEFAULT_VRF.to_string()
        }
    }
}

// Create or take over the routed port, SVI, or sub-interface an L3Out path
// lands on. `0.0.0.0` is ACI's placeholder for "no address".
fn routed_interface(
    device: &mut DeviceConfig,
    ctx: &LoweringContext<'_>,
    l3out: &L3Out,
    vrf: &str,
    attachment: &PathAttachment,
    diagnostics: &mut Diagnostics,
) {
    let name = &attachment.target.interface;
    let address = attachment
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty() && !a.starts_with("0.0.0.0"))
        .and_then(|raw| match raw.parse::<Ipv4Network>() {
            Ok(net) => Some(InterfaceAddress::new(net)),
            Err(e) => {
                diagnostics.value(format!(
                    "Invalid address {raw} for interface {name} in L3Out {}: {e}",
                    l3out.name
                ));
                None
            }
        });

    let kind = match attachment.interface_type.as_deref() {
        Some("ext-svi") => InterfaceKind::Vlan,
        _ => InterfaceKind::Physical,
    };
    let iface = device
        .interfaces
        .entry(name.clone())
        .or_insert_with(|| {
            let mut config = InterfaceConfig::new(name, kind, vrf, ctx.settings.interface_mtu);
            config.human_name = Some(name.clone());
            config
        });
    iface.vrf = vrf.to_string();
    if kind == InterfaceKind::Vlan {
        iface.vlan = attachment.encap.as_ref().and_then(|e| e.vlan());
    }
    if let Some(address) = address {
        let primary = iface.address;
        match primary {
            None => iface.address = Some(address),
            Some(existing) if existing != address && !iface.secondary_addresses.contains(&address) => {
                iface.secondary_addresses.push(address);
            }
            Some(_) => {}
        }
    }
    iface.append_description(&format!("L3Out: {}", l3out.name));
}
