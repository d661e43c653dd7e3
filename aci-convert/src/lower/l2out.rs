use crate::device::{DeviceConfig, InterfaceConfig, InterfaceKind, DEFAULT_VRF};
use crate::diagnostics::Diagnostics;
use crate::ids::{Encap, VlanId};
use crate::model::{AciModel, L2Out};

use super::LoweringContext;

#[derive(Debug, Clone)]
pub(super) struct L2OutPlan {
    pub interface: String,
    pub name: String,
    pub vlan: VlanId,
    pub vrf: String,
    pub description: String,
}

/// Resolve VLAN and VRF for every L2Out. L2Outs with an unusable
/// encapsulation are reported and left out.
pub(super) fn plan(model: &AciModel, diagnostics: &mut Diagnostics) -> Vec<L2OutPlan> {
    model
        .l2outs()
        .values()
        .filter(|l2out| !l2out.name.is_empty())
        .filter_map(|l2out| {
            let vlan = vlan_for(l2out, diagnostics)?;
            Some(L2OutPlan {
                interface: format!("L2Out-{}", l2out.name),
                name: l2out.name.clone(),
                vlan,
                vrf: vrf_for(model, l2out),
                description: l2out
                    .description
                    .clone()
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| format!("L2Out {} for external L2 connectivity", l2out.name)),
            })
        })
        .collect()
}

fn vlan_for(l2out: &L2Out, diagnostics: &mut Diagnostics) -> Option<VlanId> {
    let Some(raw) = l2out.encapsulation.as_deref().filter(|e| !e.trim().is_empty()) else {
        return Some(VlanId::from_name_hash(&l2out.name));
    };
    let encap = Encap::parse(raw);
    let vlan = encap.vlan();
    if vlan.is_none() {
        let label = if raw.trim().to_ascii_lowercase().starts_with("vxlan-") {
            "VXLAN"
        } else {
            "VLAN"
        };
        diagnostics.value(format!(
            "Invalid {label} encapsulation '{raw}' for L2Out {}",
            l2out.name
        ));
    }
    vlan
}

// The VRF of the associated bridge domain, when both resolve.
fn vrf_for(model: &AciModel, l2out: &L2Out) -> String {
    l2out
        .bridge_domain
        .as_deref()
        .and_then(|bd| model.bridge_domains().get(bd))
        .and_then(|bd| bd.vrf.as_deref())
        .and_then(|vrf| model.vrfs().get(vrf))
        .map(|vrf| vrf.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_VRF.to_string())
}

pub(super) fn install(device: &mut DeviceConfig, ctx: &LoweringContext<'_>) {
    for plan in &ctx.l2outs {
        if device.interfaces.contains_key(&plan.interface) {
            continue;
        }
        let mut config = InterfaceConfig::new(
            &plan.interface,
            InterfaceKind::Vlan,
            &plan.vrf,
            ctx.settings.interface_mtu,
        );
        config.vlan = Some(plan.vlan);
        config.human_name = Some(format!("L2Out {} (VLAN {})", plan.name, plan.vlan));
        config.description = Some(plan.description.clone());
        device.interfaces.insert(plan.interface.clone(), config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BridgeDomain, ModelBuilder, Vrf};
    use pretty_assertions::assert_eq;

    fn l2out(name: &str, encap: Option<&str>) -> L2Out {
        L2Out {
            name: name.to_string(),
            tenant: "prod".to_string(),
            bridge_domain: Some("prod:web-bd".to_string()),
            encapsulation: encap.map(str::to_string),
            ..Default::default()
        }
    }

    fn model(l2outs: Vec<L2Out>) -> AciModel {
        let mut builder = ModelBuilder::new("fab");
        builder.add_vrf(
            "prod:vrf1".to_string(),
            Vrf {
                name: "vrf1".to_string(),
                tenant: "prod".to_string(),
                description: None,
            },
        );
        builder.add_bridge_domain(
            "prod:web-bd".to_string(),
            BridgeDomain {
                name: "web-bd".to_string(),
                tenant: "prod".to_string(),
                vrf: Some("prod:vrf1".to_string()),
                subnets: Vec::new(),
                encapsulation: None,
                description: None,
            },
        );
        for l2out in l2outs {
            builder.add_l2out(format!("prod:{}", l2out.name), l2out);
        }
        builder.freeze()
    }

    #[test]
    fn encapsulation_forms() {
        let model = model(vec![
            l2out("a", Some("vlan-200")),
            l2out("b", Some("vxlan-4095")),
            l2out("c", None),
            l2out("d", Some("vlan-5000")),
            l2out("e", Some("vxlan-x")),
        ]);
        let mut diags = Diagnostics::new();
        let plans = plan(&model, &mut diags);

        let vlans: Vec<(&str, u16)> = plans.iter().map(|p| (p.name.as_str(), p.vlan.get())).collect();
        assert_eq!(
            vlans,
            vec![
                ("a", 200),
                ("b", 2),
                ("c", VlanId::from_name_hash("c").get()),
            ]
        );
        assert!(plans.iter().all(|p| p.vrf == "vrf1"));
        assert_eq!(plans[0].description, "L2Out a for external L2 connectivity");
        assert!(diags.contains("Invalid VLAN encapsulation 'vlan-5000' for L2Out d"));
        assert!(diags.contains("Invalid VXLAN encapsulation 'vxlan-x' for L2Out e"));
    }

    #[test]
    fn installs_one_vlan_interface_each() {
        let model = model(vec![l2out("legacy", Some("vlan-300"))]);
        let settings = crate::settings::LoweringSettings::default();
        let mut diags = Diagnostics::new();
        let ctx = LoweringContext::new(&model, &settings, &mut diags);
        let mut device = DeviceConfig::new("leaf", None, crate::model::NodeRole::Leaf);
        install(&mut device, &ctx);

        let iface = &device.interfaces["L2Out-legacy"];
        assert_eq!(iface.kind, InterfaceKind::Vlan);
        assert_eq!(iface.vrf, "vrf1");
        assert_eq!(iface.human_name.as_deref(), Some("L2Out legacy (VLAN 300)"));
    }
}
