use std::collections::{BTreeMap, BTreeSet};

use colored::Colorize;
use serde::Serialize;

use crate::device::{ConversionResult, DeviceConfig, Layer1Edge};
use crate::diagnostics::Diagnostics;
use crate::model::{AciModel, NodeRole};
use crate::resolve::Hostnames;

/// Render a conversion run for terminal output.
pub fn render_conversion(result: &ConversionResult) -> String {
    let mut out = Vec::new();
    out.push(format!("fabric {}", result.fabric_hostname).cyan().bold().to_string());
    out.push(format!(
        "result devices={} edges={} warnings={}",
        result.devices.len(),
        result.edges.len(),
        result.diagnostics.len()
    ));
    out.push(String::new());
    out.push("devices".to_string());
    if result.devices.is_empty() {
        out.push("- none".to_string());
    }
    for device in result.devices.values() {
        out.push(device_line(device));
    }
    append_diagnostics(&mut out, &result.diagnostics);
    out.join("\n")
}

fn device_line(device: &DeviceConfig) -> String {
    let static_routes: usize = device.vrfs.values().map(|v| v.static_routes.len()).sum();
    format!(
        "- {} node={} role={} vrfs={} interfaces={} acls={} bgp_peers={} static_routes={}",
        device.hostname,
        device.node_id.as_deref().unwrap_or("-"),
        device.role,
        device.vrfs.len(),
        device.interfaces.len(),
        device.acls.len(),
        device.bgp_peers().count(),
        static_routes
    )
}

/// Render the edge set, one edge per line.
pub fn render_topology(edges: &BTreeSet<Layer1Edge>) -> String {
    let mut out = vec![format!("edges={}", edges.len())];
    out.extend(edges.iter().map(|edge| format!("- {edge}")));
    out.join("\n")
}

fn append_diagnostics(out: &mut Vec<String>, diagnostics: &Diagnostics) {
    if diagnostics.is_empty() {
        return;
    }
    out.push(String::new());
    out.push("warnings".to_string());
    for entry in diagnostics.entries() {
        out.push(
            format!("- [{}] {}", entry.kind, entry.message)
                .yellow()
                .to_string(),
        );
    }
}

/// Collection counts and resolved nodes of one model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub hostname: String,
    pub counts: BTreeMap<&'static str, usize>,
    pub fabric_nodes: Vec<NodeSummary>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub key: String,
    pub node_id: Option<String>,
    pub name: Option<String>,
    pub role: NodeRole,
    /// `None` for nodes without an id; they produce no device.
    pub hostname: Option<String>,
    pub interfaces: usize,
    pub management: Option<String>,
}

pub fn model_summary(model: &AciModel, hostnames: &Hostnames, diagnostics: Diagnostics) -> ModelSummary {
    let counts = BTreeMap::from([
        ("tenants", model.tenants().len()),
        ("vrfs", model.vrfs().len()),
        ("bridge_domains", model.bridge_domains().len()),
        ("application_profiles", model.application_profiles().len()),
        ("epgs", model.epgs().len()),
        ("contracts", model.contracts().len()),
        ("taboo_contracts", model.taboo_contracts().len()),
        ("contract_interfaces", model.contract_interfaces().len()),
        ("filters", model.filters().len()),
        ("fabric_nodes", model.fabric_nodes().len()),
        ("vpc_pairs", model.vpc_pairs().len()),
        ("l3outs", model.l3outs().len()),
        ("l2outs", model.l2outs().len()),
        ("fabric_links", model.fabric_links().len()),
    ]);
    let fabric_nodes = model
        .fabric_nodes()
        .iter()
        .map(|(key, node)| NodeSummary {
            key: key.clone(),
            node_id: node.node_id.clone(),
            name: node.name.clone(),
            role: node.role,
            hostname: node
                .node_id
                .as_deref()
                .and_then(|id| hostnames.get(id))
                .map(str::to_string),
            interfaces: node.interfaces.len(),
            management: node.management.as_ref().map(|m| m.address.clone()),
        })
        .collect();
    ModelSummary {
        hostname: model.hostname().to_string(),
        counts,
        fabric_nodes,
        diagnostics,
    }
}

pub fn render_model(summary: &ModelSummary) -> String {
    let mut out = Vec::new();
    out.push(format!("fabric {}", summary.hostname).cyan().bold().to_string());
    out.push("counts".to_string());
    for (collection, count) in &summary.counts {
        out.push(format!("- {collection}={count}"));
    }
    out.push(String::new());
    out.push("fabric_nodes".to_string());
    if summary.fabric_nodes.is_empty() {
        out.push("- none".to_string());
    }
    for node in &summary.fabric_nodes {
        let mut line = format!(
            "- {} role={} hostname={} interfaces={}",
            node.key,
            node.role,
            node.hostname.as_deref().unwrap_or("-"),
            node.interfaces
        );
        if let Some(mgmt) = &node.management {
            line.push_str(&format!(" mgmt={mgmt}"));
        }
        out.push(line);
    }
    append_diagnostics(&mut out, &summary.diagnostics);
    out.join("\n")
}
