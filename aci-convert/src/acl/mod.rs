//! Contract-to-ACL compiler.
//!
//! Every contract and taboo contract becomes one named [`Acl`]. Each filter
//! entry reachable from a subject becomes its own line, so the entries of one
//! filter are alternatives. A trailing default-deny line closes any ACL that
//! has at least one line; a contract that yields no lines yields no ACL.
//!
//! The compiler knows nothing about bridge domains. Same-BD reachability is a
//! question for downstream analysis, not for the filters installed here.

pub mod epg_policy;
pub mod fields;

use std::collections::BTreeMap;

use crate::device::{Acl, AclLine, LineAction, MatchExpr};
use crate::diagnostics::Diagnostics;
use crate::fallback;
use crate::model::{AciModel, Contract, EntryMatch, Filter, FilterAction, FilterRef};

use fields::{Direction, IcmpFamily, LineContext};

pub use epg_policy::{compile_epg_policies, EpgPolicy};

pub const CONTRACT_ACL_PREFIX: &str = "~CONTRACT~";
pub const TABOO_ACL_PREFIX: &str = "~TABOO~";

pub fn contract_acl_name(contract: &str) -> String {
    format!("{CONTRACT_ACL_PREFIX}{contract}")
}

pub fn taboo_acl_name(taboo: &str) -> String {
    format!("{TABOO_ACL_PREFIX}{taboo}")
}

/// Which kind of contract an ACL is compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclKind {
    Contract,
    Taboo,
}

impl AclKind {
    pub fn acl_name(self, contract: &str) -> String {
        match self {
            Self::Contract => contract_acl_name(contract),
            Self::Taboo => taboo_acl_name(contract),
        }
    }
}

/// Compile every contract and taboo contract in the model.
///
/// The result is keyed by ACL name and is shared by every device.
pub fn compile_contracts(model: &AciModel, diagnostics: &mut Diagnostics) -> BTreeMap<String, Acl> {
    let mut acls = BTreeMap::new();
    let sources = model
        .contracts()
        .iter()
        .map(|(k, c)| (AclKind::Contract, k, c))
        .chain(model.taboo_contracts().iter().map(|(k, c)| (AclKind::Taboo, k, c)));

    for (kind, key, contract) in sources {
        let lines = contract_lines(model, key, contract, kind, diagnostics);
        if lines.is_empty() {
            continue;
        }
        let name = kind.acl_name(key);
        acls.insert(name.clone(), Acl { name, lines });
    }
    tracing::debug!(acls = acls.len(), "compiled contract ACLs");
    acls
}

/// Lines for one contract, including the trailing default deny.
pub fn contract_lines(
    model: &AciModel,
    key: &str,
    contract: &Contract,
    kind: AclKind,
    diagnostics: &mut Diagnostics,
) -> Vec<AclLine> {
    let mut lines = Vec::new();

    for filter_ref in contract.subjects.iter().flat_map(|s| &s.filters) {
        // A taboo ACL describes the traffic to block; the EPG policy turns a
        // match into a deny.
        let action = match (kind, filter_ref.action) {
            (AclKind::Taboo, _) | (AclKind::Contract, FilterAction::Permit) => LineAction::Permit,
            (AclKind::Contract, FilterAction::Deny) => LineAction::Deny,
        };

        let resolved = filter_ref
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .and_then(|n| resolve_filter(model, n, &contract.tenant))
            .filter(|f| !f.entries.is_empty());

        match resolved {
            Some(filter) => {
                let filter_name = filter_ref.name.as_deref().unwrap_or(filter.name.as_str());
                for entry in &filter.entries {
                    let ctx = LineContext {
                        contract: key,
                        filter: filter_name,
                        entry: Some(&entry.name),
                    };
                    lines.push(AclLine::new(
                        action,
                        build_match(&entry.fields, ctx, diagnostics),
                        format!("Contract {key} filter {filter_name} entry {}", entry.name),
                    ));
                }
            }
            None => lines.push(inline_line(key, filter_ref, action, diagnostics)),
        }
    }

    if !lines.is_empty() {
        lines.push(AclLine::new(
            LineAction::Deny,
            MatchExpr::True,
            format!("Default deny for contract {key}"),
        ));
    }
    lines
}

// Filters are looked up tenant-qualified first, then as written, then in
// tenant `common`.
fn resolve_filter<'m>(model: &'m AciModel, name: &str, tenant: &str) -> Option<&'m Filter> {
    let filters = model.filters();
    filters
        .get(&fallback::fq(tenant, name))
        .or_else(|| filters.get(name))
        .or_else(|| filters.get(&fallback::fq("common", name)))
}

fn inline_line(
    key: &str,
    filter_ref: &FilterRef,
    action: LineAction,
    diagnostics: &mut Diagnostics,
) -> AclLine {
    let filter_name = filter_ref.name.as_deref().unwrap_or("unnamed");
    let ctx = LineContext {
        contract: key,
        filter: filter_name,
        entry: None,
    };
    AclLine::new(
        action,
        build_match(&filter_ref.inline, ctx, diagnostics),
        format!("Contract {key} filter {filter_name}"),
    )
}

/// Conjunction of every constraint present on one entry.
pub fn build_match(entry: &EntryMatch, ctx: LineContext<'_>, diagnostics: &mut Diagnostics) -> MatchExpr {
    let mut terms = Vec::new();

    if let Some(raw) = entry.ether_type.as_deref() {
        terms.extend(fields::ether_type(raw, ctx, diagnostics));
    }

    if let Some(protocol) = entry
        .protocol
        .as_deref()
        .and_then(|p| fields::ip_protocol(p, diagnostics))
    {
        terms.push(MatchExpr::IpProtocol(protocol));
        let icmp = match protocol {
            fields::IP_PROTOCOL_ICMP => entry
                .icmpv4_type
                .as_deref()
                .map(|t| (t, entry.icmpv4_code.as_deref(), IcmpFamily::V4)),
            fields::IP_PROTOCOL_ICMPV6 => entry
                .icmpv6_type
                .as_deref()
                .map(|t| (t, entry.icmpv6_code.as_deref(), IcmpFamily::V6)),
            _ => None,
        };
        if let Some((icmp_type, icmp_code, family)) = icmp {
            terms.extend(fields::icmp(icmp_type, icmp_code, family, diagnostics));
        }
    }

    if let Some(raw) = entry.source_address.as_deref() {
        terms.extend(fields::address(raw, diagnostics).map(MatchExpr::SrcAddress));
    }
    if let Some(raw) = entry.destination_address.as_deref() {
        terms.extend(fields::address(raw, diagnostics).map(MatchExpr::DstAddress));
    }
    if let Some(field) = &entry.destination_ports {
        terms.extend(fields::ports(field, Direction::Destination, ctx, diagnostics));
    }
    if let Some(field) = &entry.source_ports {
        terms.extend(fields::ports(field, Direction::Source, ctx, diagnostics));
    }

    if fields::is_meaningful_arp_opcode(entry.arp_opcode.as_deref()) {
        diagnostics.value(format!(
            "ARP opcode specified in {ctx}: {}. ARP filtering has limited effect in IP ACLs.",
            entry.arp_opcode.as_deref().unwrap_or_default()
        ));
    }
    if entry.stateful {
        diagnostics.value(format!(
            "Stateful filtering specified in {ctx}. Stateful filtering may not be fully supported in ACL conversion."
        ));
    }

    MatchExpr::and(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::ingest::build_model;
    use mit_tree::MitNode;
    use pretty_assertions::assert_eq;

    fn entry(name: &str, port: &str) -> MitNode {
        MitNode::new("vzEntry")
            .with_attr("name", name)
            .with_attr("etherT", "ip")
            .with_attr("prot", "tcp")
            .with_attr("dFromPort", port)
            .with_attr("dToPort", port)
    }

    fn contract(name: &str, filters: &[&str]) -> MitNode {
        let mut subj = MitNode::new("vzSubj").with_attr("name", "s1");
        for f in filters {
            subj = subj.with_child(MitNode::new("vzRsSubjFiltAtt").with_attr("tnVzFilterName", *f));
        }
        MitNode::new("vzBrCP").with_attr("name", name).with_child(subj)
    }

    fn model(children: Vec<MitNode>) -> AciModel {
        let mut tenant = MitNode::new("fvTenant").with_attr("name", "prod");
        for c in children {
            tenant = tenant.with_child(c);
        }
        let root = MitNode::new("polUni").with_child(tenant);
        build_model(&root, "t.json", &mut Diagnostics::new())
    }

    #[test]
    fn each_entry_is_its_own_line() {
        let model = model(vec![
            MitNode::new("vzFilter")
                .with_attr("name", "web")
                .with_child(entry("http", "80"))
                .with_child(entry("https", "443"))
                .with_child(entry("alt", "8080")),
            contract("web", &["web"]),
        ]);
        let mut diags = Diagnostics::new();
        let acls = compile_contracts(&model, &mut diags);
        let acl = &acls["~CONTRACT~prod:web"];

        assert_eq!(acl.lines.len(), 4);
        assert_eq!(acl.lines[0].name, "Contract prod:web filter web entry http");
        assert_eq!(
            acl.lines[1].matcher,
            MatchExpr::And(vec![
                MatchExpr::IpProtocol(6),
                MatchExpr::DstPorts(vec![crate::ids::PortRange::single(443)]),
            ])
        );
        let last = acl.lines.last().expect("default line");
        assert_eq!(last.action, LineAction::Deny);
        assert_eq!(last.matcher, MatchExpr::True);
        assert_eq!(last.name, "Default deny for contract prod:web");
        assert!(diags.is_empty());
    }

    #[test]
    fn empty_contract_yields_no_acl() {
        let model = model(vec![
            MitNode::new("vzBrCP").with_attr("name", "nothing"),
            MitNode::new("vzBrCP")
                .with_attr("name", "hollow")
                .with_child(MitNode::new("vzSubj").with_attr("name", "s")),
        ]);
        let acls = compile_contracts(&model, &mut Diagnostics::new());
        assert!(acls.is_empty());
    }

    #[test]
    fn unresolved_filter_uses_inline_fields() {
        let model = model(vec![MitNode::new("vzBrCP").with_attr("name", "ssh").with_child(
            MitNode::new("vzSubj").with_child(
                MitNode::new("vzRsSubjFiltAtt")
                    .with_attr("tnVzFilterName", "missing")
                    .with_attr("prot", "tcp")
                    .with_attr("dPort", "22")
                    .with_attr("action", "deny"),
            ),
        )]);
        let acls = compile_contracts(&model, &mut Diagnostics::new());
        let acl = &acls["~CONTRACT~prod:ssh"];
        assert_eq!(acl.lines.len(), 2);
        assert_eq!(acl.lines[0].name, "Contract prod:ssh filter missing");
        assert_eq!(acl.lines[0].action, LineAction::Deny);
    }

    #[test]
    fn taboo_lines_describe_traffic_to_block() {
        let model = model(vec![
            MitNode::new("vzFilter")
                .with_attr("name", "telnet")
                .with_child(entry("telnet", "23")),
            MitNode::new("vzTaboo").with_attr("name", "block").with_child(
                MitNode::new("vzTSubj").with_child(
                    MitNode::new("vzRsDenyRule")
                        .with_attr("tnVzFilterName", "telnet")
                        .with_attr("action", "deny"),
                ),
            ),
        ]);
        let acls = compile_contracts(&model, &mut Diagnostics::new());
        let acl = &acls["~TABOO~prod:block"];
        assert_eq!(acl.lines[0].action, LineAction::Permit);
        assert_eq!(acl.lines.len(), 2);
    }

    #[test]
    fn filter_in_common_resolves() {
        let common = MitNode::new("fvTenant").with_attr("name", "common").with_child(
            MitNode::new("vzFilter")
                .with_attr("name", "dns")
                .with_child(entry("dns", "53")),
        );
        let prod = MitNode::new("fvTenant")
            .with_attr("name", "prod")
            .with_child(contract("dns", &["dns"]));
        let root = MitNode::new("polUni").with_child(common).with_child(prod);
        let model = build_model(&root, "t.json", &mut Diagnostics::new());
        let acls = compile_contracts(&model, &mut Diagnostics::new());
        assert_eq!(
            acls["~CONTRACT~prod:dns"].lines[0].name,
            "Contract prod:dns filter dns entry dns"
        );
    }
}
