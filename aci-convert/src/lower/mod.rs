//! Device Lowering Engine.
//!
//! [`convert`] turns a frozen model into one [`DeviceConfig`] per fabric node
//! plus the fabric-wide layer-1 edge set.
//!
//! Work that does not depend on the node (hostnames, contract ACLs, EPG
//! policies, bridge-domain VLANs and addresses, L2Out VLANs) is done once in
//! [`LoweringContext::new`] and only read afterwards. Each node is then
//! lowered with its own [`Diagnostics`]; those are merged into the run's sink
//! in hostname order so output does not depend on evaluation order.
//!
//! Per-node order matters, because later steps look up interfaces created by
//! earlier ones:
//!
//! 1. VRFs
//! 2. base interfaces (node ports, path-attachment ports, loopback0, mgmt0)
//! 3. vPC peer-link
//! 4. bridge-domain VLAN interfaces
//! 5. contract and taboo ACLs
//! 6. EPG binding (VLAN tagging and policy filters)
//! 7. L3Outs (routed interfaces, then BGP, static routes, OSPF)
//! 8. L2Outs

mod bgp;
mod bridge_domains;
mod epg;
mod interfaces;
mod l2out;
mod l3out;
mod ospf;
mod static_routes;

use std::collections::BTreeMap;

use crate::acl::{compile_contracts, compile_epg_policies, EpgPolicy};
use crate::device::{Acl, ConversionResult, DeviceConfig, DEFAULT_VRF};
use crate::diagnostics::Diagnostics;
use crate::model::{AciModel, FabricNode, NodeRole};
use crate::resolve::{layer1_edges, Hostnames};
use crate::settings::LoweringSettings;

use bridge_domains::BridgeDomainPlan;
use l2out::L2OutPlan;

/// Node-independent state shared by every lowering task.
pub struct LoweringContext<'m> {
    pub model: &'m AciModel,
    pub settings: &'m LoweringSettings,
    pub hostnames: Hostnames,
    pub contract_acls: BTreeMap<String, Acl>,
    pub epg_policies: BTreeMap<String, EpgPolicy>,
    bridge_domains: Vec<BridgeDomainPlan>,
    l2outs: Vec<L2OutPlan>,
}

impl<'m> LoweringContext<'m> {
    pub fn new(model: &'m AciModel, settings: &'m LoweringSettings, diagnostics: &mut Diagnostics) -> Self {
        let hostnames = Hostnames::resolve(model, diagnostics);
        let contract_acls = compile_contracts(model, diagnostics);
        let epg_policies = compile_epg_policies(model, &contract_acls, diagnostics);
        let bridge_domains = bridge_domains::plan(model, diagnostics);
        let l2outs = l2out::plan(model, diagnostics);
        Self {
            model,
            settings,
            hostnames,
            contract_acls,
            epg_policies,
            bridge_domains,
            l2outs,
        }
    }

    /// Device VRF for a model VRF reference, if the reference resolves.
    pub fn vrf_name(&self, fq: &str) -> Option<&'m str> {
        self.model
            .vrfs()
            .get(fq)
            .map(|v| v.name.as_str())
            .filter(|n| !n.is_empty())
    }

    /// VLAN assigned to a bridge domain, by fq-name.
    pub fn bridge_domain_vlan(&self, fq: &str) -> Option<crate::ids::VlanId> {
        self.bridge_domains
            .iter()
            .find(|bd| bd.key == fq)
            .map(|bd| bd.vlan)
    }
}

/// Run the whole lowering pipeline over one model.
pub fn convert(model: &AciModel, settings: &LoweringSettings) -> ConversionResult {
    let mut diagnostics = Diagnostics::new();
    let ctx = LoweringContext::new(model, settings, &mut diagnostics);
    let mut devices = BTreeMap::new();

    if model.fabric_nodes().is_empty() {
        diagnostics.structural(format!(
            "No fabric nodes defined in ACI configuration. Creating single configuration for fabric: {}",
            model.hostname()
        ));
        let device = fabric_device(&ctx);
        devices.insert(device.hostname.clone(), device);
    } else {
        let mut per_device: BTreeMap<String, (DeviceConfig, Diagnostics)> = BTreeMap::new();
        for (node_id, hostname) in ctx.hostnames.iter() {
            let Some(node) = model.fabric_nodes().get(node_id) else {
                diagnostics.referential(format!(
                    "Skipping fabric node {node_id} due to unresolved hostname."
                ));
                continue;
            };
            let mut local = Diagnostics::new();
            let device = lower_node(&ctx, node, node_id, hostname, &mut local);
            per_device.insert(hostname.to_string(), (device, local));
        }
        for (hostname, (device, local)) in per_device {
            diagnostics.absorb(local);
            devices.insert(hostname, device);
        }
    }

    let edges = layer1_edges(model, &ctx.hostnames, &settings.vpc_peer_link_name);
    tracing::info!(
        devices = devices.len(),
        edges = edges.len(),
        warnings = diagnostics.len(),
        "lowered fabric"
    );

    ConversionResult {
        fabric_hostname: model.hostname().to_string(),
        devices,
        edges,
        diagnostics,
    }
}

fn lower_node(
    ctx: &LoweringContext<'_>,
    node: &FabricNode,
    node_id: &str,
    hostname: &str,
    diagnostics: &mut Diagnostics,
) -> DeviceConfig {
    let mut device = DeviceConfig::new(hostname, Some(node_id.to_string()), node.role);
    add_vrfs(&mut device, ctx.model);

    interfaces::base_interfaces(&mut device, ctx, node, node_id, diagnostics);
    interfaces::vpc_peer_link(&mut device, ctx, node_id);
    bridge_domains::install(&mut device, ctx);
    device.acls.extend(ctx.contract_acls.clone());
    epg::bind(&mut device, ctx, node, node_id, diagnostics);
    l3out::lower(&mut device, ctx, node_id, diagnostics);
    l2out::install(&mut device, ctx);

    tracing::debug!(
        hostname,
        interfaces = device.interfaces.len(),
        acls = device.acls.len(),
        "lowered node"
    );
    device
}

// The whole fabric as one device: VRFs, bridge-domain interfaces, and
// contract ACLs. Nothing node-specific.
fn fabric_device(ctx: &LoweringContext<'_>) -> DeviceConfig {
    let mut device = DeviceConfig::new(ctx.model.hostname(), None, NodeRole::Unknown);
    add_vrfs(&mut device, ctx.model);
    interfaces::loopback(&mut device, ctx, NodeRole::Unknown);
    bridge_domains::install(&mut device, ctx);
    device.acls.extend(ctx.contract_acls.clone());
    device
}

fn add_vrfs(device: &mut DeviceConfig, model: &AciModel) {
    for vrf in model.vrfs().values() {
        if vrf.name.is_empty() || vrf.name == DEFAULT_VRF {
            continue;
        }
        device.vrf_mut(&vrf.name);
    }
}
