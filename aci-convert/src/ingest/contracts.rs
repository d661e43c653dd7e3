use mit_tree::MitNode;

use super::{children_of, name_of, specified};
use crate::class::MitClass;
use crate::fallback::{self, fq};
use crate::ids::port_spec;
use crate::model::{
    Contract, ContractInterface, EntryMatch, Filter, FilterEntry, FilterRef, ModelBuilder,
    PortField, Subject,
};

pub(super) fn filter(node: &MitNode, tenant: &str, builder: &mut ModelBuilder) {
    let Some(name) = name_of(node) else {
        return;
    };
    let entries = children_of(node, MitClass::VzEntry)
        .enumerate()
        .map(|(index, entry)| FilterEntry {
            name: name_of(entry).map_or_else(|| format!("entry-{}", index + 1), str::to_string),
            fields: entry_match(entry),
        })
        .collect();
    builder.add_filter(
        fq(tenant, name),
        Filter {
            name: name.to_string(),
            tenant: tenant.to_string(),
            description: node.attr("descr").map(str::to_string),
            entries,
        },
    );
}

pub(super) fn contract(node: &MitNode, tenant: &str, builder: &mut ModelBuilder) {
    if let Some(contract) = contract_body(node, tenant) {
        builder.add_contract(fq(tenant, &contract.name), contract);
    }
}

pub(super) fn taboo(node: &MitNode, tenant: &str, builder: &mut ModelBuilder) {
    if let Some(taboo) = contract_body(node, tenant) {
        builder.add_taboo(fq(tenant, &taboo.name), taboo);
    }
}

pub(super) fn contract_interface(node: &MitNode, tenant: &str, builder: &mut ModelBuilder) {
    let Some(name) = name_of(node) else {
        return;
    };
    builder.add_contract_interface(
        fq(tenant, name),
        ContractInterface {
            name: name.to_string(),
            tenant: tenant.to_string(),
            description: node.attr("descr").map(str::to_string),
        },
    );
}

// Contracts and taboos share one shape; taboo subjects and deny rules fold
// onto the same classes at classification time.
fn contract_body(node: &MitNode, tenant: &str) -> Option<Contract> {
    let name = name_of(node)?;
    let subjects = children_of(node, MitClass::VzSubj)
        .map(|subj| Subject {
            name: name_of(subj).map(str::to_string),
            filters: children_of(subj, MitClass::VzRsSubjFiltAtt)
                .map(filter_ref)
                .collect(),
        })
        .collect();
    Some(Contract {
        name: name.to_string(),
        tenant: tenant.to_string(),
        description: node.attr("descr").map(str::to_string),
        scope: node.attr("scope").map(str::to_string),
        subjects,
    })
}

fn filter_ref(rs: &MitNode) -> FilterRef {
    FilterRef {
        name: rs
            .attr("tnVzFilterName")
            .or_else(|| rs.attr("name"))
            .map(str::to_string),
        action: fallback::filter_action(rs.attr("action")),
        inline: entry_match(rs),
    }
}

/// Read L2-L4 match fields from a `vzEntry` or an inline filter reference.
pub(crate) fn entry_match(node: &MitNode) -> EntryMatch {
    let owned = |key: &str| specified(node, key).map(str::to_string);
    let ports = |single: &str, from: &str, to: &str| {
        port_spec(node.attr(single), node.attr(from), node.attr(to)).map(PortField::parse)
    };
    EntryMatch {
        ether_type: owned("etherT"),
        protocol: owned("prot"),
        destination_ports: ports("dPort", "dFromPort", "dToPort"),
        source_ports: ports("sPort", "sFromPort", "sToPort"),
        icmpv4_type: owned("icmpv4T"),
        icmpv4_code: owned("icmpv4C"),
        icmpv6_type: owned("icmpv6T"),
        icmpv6_code: owned("icmpv6C"),
        arp_opcode: owned("arpOpc"),
        apply_to_fragments: fallback::flag(node.attr("applyToFrag")),
        stateful: fallback::flag(node.attr("stateful")),
        tcp_rules: owned("tcpRules"),
        source_address: owned("srcAddr"),
        destination_address: owned("dstAddr"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{PortRange, PortToken};
    use crate::model::FilterAction;
    use pretty_assertions::assert_eq;

    #[test]
    fn entry_fields_drop_unspecified_placeholders() {
        let entry = MitNode::new("vzEntry")
            .with_attr("etherT", "ip")
            .with_attr("prot", "tcp")
            .with_attr("dFromPort", "8080")
            .with_attr("dToPort", "8090")
            .with_attr("sFromPort", "unspecified")
            .with_attr("sToPort", "unspecified")
            .with_attr("icmpv4T", "unspecified")
            .with_attr("stateful", "yes");
        let fields = entry_match(&entry);
        assert_eq!(fields.protocol.as_deref(), Some("tcp"));
        assert_eq!(fields.icmpv4_type, None);
        assert_eq!(fields.source_ports, None);
        assert!(fields.stateful);
        let dst = fields.destination_ports.expect("destination ports");
        assert_eq!(dst.raw, "8080-8090");
        assert_eq!(dst.token, PortToken::Range(PortRange { start: 8080, end: 8090 }));
    }

    #[test]
    fn taboo_subject_classes_fold_onto_contract_shape() {
        let node = MitNode::new("vzTaboo").with_attr("name", "block").with_child(
            MitNode::new("vzTSubj").with_attr("name", "s").with_child(
                MitNode::new("vzRsDenyRule")
                    .with_attr("tnVzFilterName", "telnet")
                    .with_attr("action", "deny"),
            ),
        );
        let mut builder = ModelBuilder::new("fab");
        taboo(&node, "prod", &mut builder);
        let model = builder.freeze();
        let taboo = &model.taboo_contracts()["prod:block"];
        let refs = &taboo.subjects[0].filters;
        assert_eq!(refs[0].name.as_deref(), Some("telnet"));
        assert_eq!(refs[0].action, FilterAction::Deny);
    }

    #[test]
    fn unnamed_entries_get_positional_names() {
        let node = MitNode::new("vzFilter")
            .with_attr("name", "f")
            .with_child(MitNode::new("vzEntry").with_attr("prot", "udp"))
            .with_child(MitNode::new("vzEntry").with_attr("name", "dns"));
        let mut builder = ModelBuilder::new("fab");
        filter(&node, "prod", &mut builder);
        let model = builder.freeze();
        let names: Vec<&str> = model.filters()["prod:f"]
            .entries
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["entry-1", "dns"]);
    }
}
