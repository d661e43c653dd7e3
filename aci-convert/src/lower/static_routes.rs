use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use crate::device::{DeviceConfig, StaticRoute};
use crate::diagnostics::Diagnostics;
use crate::model::{L3Out, StaticRouteConfig};
use crate::settings::LoweringSettings;

pub(super) fn lower(
    device: &mut DeviceConfig,
    settings: &LoweringSettings,
    l3out: &L3Out,
    vrf: &str,
    diagnostics: &mut Diagnostics,
) {
    let routes: Vec<StaticRoute> = l3out
        .static_routes
        .iter()
        .filter_map(|config| route(device, settings, l3out, config, diagnostics))
        .collect();
    if !routes.is_empty() {
        device.vrf_mut(vrf).static_routes.extend(routes);
    }
}

fn route(
    device: &DeviceConfig,
    settings: &LoweringSettings,
    l3out: &L3Out,
    config: &StaticRouteConfig,
    diagnostics: &mut Diagnostics,
) -> Option<StaticRoute> {
    let name = &l3out.name;
    let Some(raw_prefix) = config.prefix.as_deref().filter(|p| !p.trim().is_empty()) else {
        diagnostics.structural(format!("Static route in L3Out {name} has no prefix"));
        return None;
    };
    let prefix = match raw_prefix.trim().parse::<Ipv4Network>() {
        Ok(net) => Ipv4Network::new(net.network(), net.prefix()).ok()?,
        Err(_) => {
            diagnostics.value(format!(
                "Invalid prefix {raw_prefix} for static route in L3Out {name}"
            ));
            return None;
        }
    };

    let next_hop_ip = config
        .next_hop
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .and_then(|raw| match raw.parse::<Ipv4Addr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                diagnostics.value(format!(
                    "Invalid next hop {raw} for static route {prefix} in L3Out {name}"
                ));
                None
            }
        });

    let next_hop_interface = config
        .next_hop_interface
        .as_deref()
        .filter(|i| !i.is_empty())
        .and_then(|iface| {
            if device.interfaces.contains_key(iface) {
                Some(iface.to_string())
            } else {
                diagnostics.referential(format!(
                    "Next hop interface {iface} not found for static route {prefix} in L3Out {name}"
                ));
                None
            }
        });

    if next_hop_ip.is_none() && next_hop_interface.is_none() {
        diagnostics.structural(format!(
            "Static route {prefix} in L3Out {name} has no valid next hop (missing both IP and interface)"
        ));
        return None;
    }

    let default_distance = settings.static_route_admin_distance;
    let admin_distance = match config.admin_distance.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        None => default_distance,
        Some(raw) => raw.parse::<u32>().unwrap_or_else(|_| {
            diagnostics.value(format!(
                "Invalid administrative distance {raw} for static route {prefix} in L3Out {name}, using default ({default_distance})"
            ));
            default_distance
        }),
    };

    Some(StaticRoute {
        prefix,
        next_hop_ip,
        next_hop_interface,
        admin_distance,
        tag: config.tag.as_deref().and_then(|t| t.parse().ok()),
    })
}
