//! Per-EPG composite policies.
//!
//! An EPG policy ACL does not match packets itself. It defers to the contract
//! and taboo ACLs already compiled for the device: taboo matches deny first,
//! contract matches permit next, and anything left over is permitted.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use crate::device::{Acl, AclLine, LineAction, MatchExpr};
use crate::diagnostics::Diagnostics;
use crate::fallback;
use crate::model::{AciModel, Epg};

use super::AclKind;

pub const EPG_POLICY_ACL_PREFIX: &str = "~EPG_POLICY~";

/// The two filters installed on every interface bound to one EPG.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpgPolicy {
    pub incoming: Option<Acl>,
    pub outgoing: Option<Acl>,
}

impl EpgPolicy {
    pub fn acls(&self) -> impl Iterator<Item = &Acl> {
        self.incoming.iter().chain(self.outgoing.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolicyDirection {
    Incoming,
    Outgoing,
    Taboo,
}

impl PolicyDirection {
    fn suffix(self) -> &'static str {
        match self {
            Self::Incoming => "IN",
            Self::Outgoing => "OUT",
            Self::Taboo => "TABOO",
        }
    }
}

impl Display for PolicyDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
            Self::Taboo => "taboo",
        })
    }
}

/// Name of the composite ACL for `epg` in one direction.
pub fn epg_policy_acl_name(epg: &str, incoming: bool) -> String {
    let direction = if incoming {
        PolicyDirection::Incoming
    } else {
        PolicyDirection::Outgoing
    };
    format!("{EPG_POLICY_ACL_PREFIX}{}~{}", sanitize(epg), direction.suffix())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Build the composite policies for every EPG, keyed by EPG fq-name.
///
/// `acls` is the output of [`super::compile_contracts`]. References that do
/// not name one of those ACLs are reported and left out. An EPG with nothing
/// to enforce in a direction gets no ACL for that direction.
pub fn compile_epg_policies(
    model: &AciModel,
    acls: &BTreeMap<String, Acl>,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<String, EpgPolicy> {
    let mut policies = BTreeMap::new();
    for (key, epg) in model.epgs() {
        let policy = compile_one(key, epg, acls, diagnostics);
        if policy.incoming.is_some() || policy.outgoing.is_some() {
            policies.insert(key.clone(), policy);
        }
    }
    tracing::debug!(epgs = policies.len(), "compiled EPG policies");
    policies
}

fn compile_one(
    key: &str,
    epg: &Epg,
    acls: &BTreeMap<String, Acl>,
    diagnostics: &mut Diagnostics,
) -> EpgPolicy {
    let mut resolver = RefResolver {
        epg_key: key,
        tenant: &epg.tenant,
        acls,
        diagnostics,
    };

    let incoming = resolver.resolve(
        &epg.consumed_contracts,
        &epg.consumed_contract_interfaces,
        PolicyDirection::Incoming,
        AclKind::Contract,
    );
    let outgoing = resolver.resolve(
        &epg.provided_contracts,
        &epg.provided_contract_interfaces,
        PolicyDirection::Outgoing,
        AclKind::Contract,
    );
    let taboos = resolver.resolve(
        &epg.protected_by_taboos,
        &[],
        PolicyDirection::Taboo,
        AclKind::Taboo,
    );

    let build = |permits: &[String], direction: PolicyDirection| {
        (!permits.is_empty() || !taboos.is_empty())
            .then(|| composite(key, direction, permits, &taboos))
    };
    EpgPolicy {
        incoming: build(&incoming, PolicyDirection::Incoming),
        outgoing: build(&outgoing, PolicyDirection::Outgoing),
    }
}

struct RefResolver<'a> {
    epg_key: &'a str,
    tenant: &'a str,
    acls: &'a BTreeMap<String, Acl>,
    diagnostics: &'a mut Diagnostics,
}

impl RefResolver<'_> {
    /// ACL names for the given references, deduplicated in first-seen order.
    fn resolve(
        &mut self,
        contracts: &[String],
        interfaces: &[String],
        direction: PolicyDirection,
        kind: AclKind,
    ) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let tagged = contracts
            .iter()
            .map(|n| ("contract", n))
            .chain(interfaces.iter().map(|n| ("contract-interface", n)));

        for (ref_type, raw) in tagged {
            if raw.is_empty() {
                continue;
            }
            let found = fallback::reference_candidates(raw, self.tenant)
                .into_iter()
                .map(|candidate| kind.acl_name(&candidate))
                .find(|acl| self.acls.contains_key(acl));
            match found {
                Some(acl) if !out.contains(&acl) => out.push(acl),
                Some(_) => {}
                None => {
                    let ref_type = if kind == AclKind::Taboo { "taboo" } else { ref_type };
                    self.diagnostics.referential(format!(
                        "Could not resolve {ref_type} reference '{raw}' for EPG {} ({direction} direction) to a known contract ACL",
                        self.epg_key
                    ));
                }
            }
        }
        out
    }
}

fn composite(epg: &str, direction: PolicyDirection, permits: &[String], taboos: &[String]) -> Acl {
    let mut lines = Vec::with_capacity(permits.len() + taboos.len() + 1);
    for taboo in taboos {
        lines.push(AclLine::new(
            LineAction::Deny,
            MatchExpr::PermittedByAcl(taboo.clone()),
            format!("Denied by taboo policy ACL {taboo}"),
        ));
    }
    for permit in permits {
        lines.push(AclLine::new(
            LineAction::Permit,
            MatchExpr::PermittedByAcl(permit.clone()),
            format!("Permitted by contract policy ACL {permit}"),
        ));
    }
    lines.push(AclLine::new(
        LineAction::Permit,
        MatchExpr::True,
        format!("Default permit for EPG {epg} {} policy", direction.suffix()),
    ));
    Acl {
        name: epg_policy_acl_name(epg, direction == PolicyDirection::Incoming),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::compile_contracts;
    use crate::ingest::build_model;
    use mit_tree::MitNode;
    use pretty_assertions::assert_eq;

    fn filter(name: &str, port: &str) -> MitNode {
        MitNode::new("vzFilter").with_attr("name", name).with_child(
            MitNode::new("vzEntry")
                .with_attr("name", name)
                .with_attr("prot", "tcp")
                .with_attr("dFromPort", port)
                .with_attr("dToPort", port),
        )
    }

    fn contract(class: &str, name: &str, filter: &str) -> MitNode {
        let (subj, rel) = if class == "vzTaboo" {
            ("vzTSubj", "vzRsDenyRule")
        } else {
            ("vzSubj", "vzRsSubjFiltAtt")
        };
        MitNode::new(class).with_attr("name", name).with_child(
            MitNode::new(subj)
                .with_attr("name", "s")
                .with_child(MitNode::new(rel).with_attr("tnVzFilterName", filter)),
        )
    }

    fn epg(name: &str, relations: &[(&str, &str)]) -> MitNode {
        let mut node = MitNode::new("fvAEPg").with_attr("name", name);
        for (class, target) in relations {
            let attr = match *class {
                "fvRsProv" | "fvRsCons" => "tnVzBrCPName",
                "fvRsProtBy" => "tnVzTabooName",
                _ => "tnVzCPIfName",
            };
            node = node.with_child(MitNode::new(*class).with_attr(attr, *target));
        }
        node
    }

    fn model(children: Vec<MitNode>) -> AciModel {
        let mut ap = MitNode::new("fvAp").with_attr("name", "shop");
        let mut tenant = MitNode::new("fvTenant").with_attr("name", "prod");
        for c in children {
            if c.class == "fvAEPg" {
                ap = ap.with_child(c);
            } else {
                tenant = tenant.with_child(c);
            }
        }
        let root = MitNode::new("polUni").with_child(tenant.with_child(ap));
        build_model(&root, "t.json", &mut Diagnostics::new())
    }

    fn compile(model: &AciModel) -> (BTreeMap<String, EpgPolicy>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let acls = compile_contracts(model, &mut diags);
        let policies = compile_epg_policies(model, &acls, &mut diags);
        (policies, diags)
    }

    #[test]
    fn taboos_deny_before_contracts_permit() {
        let model = model(vec![
            filter("http", "80"),
            filter("telnet", "23"),
            contract("vzBrCP", "web", "http"),
            contract("vzTaboo", "no-telnet", "telnet"),
            epg("web", &[("fvRsCons", "web"), ("fvRsProtBy", "no-telnet")]),
        ]);
        let (policies, diags) = compile(&model);
        let policy = &policies["prod:shop:web"];
        let incoming = policy.incoming.as_ref().expect("incoming");

        assert_eq!(incoming.name, "~EPG_POLICY~prod:shop:web~IN");
        let actions: Vec<_> = incoming.lines.iter().map(|l| l.action).collect();
        assert_eq!(
            actions,
            vec![LineAction::Deny, LineAction::Permit, LineAction::Permit]
        );
        assert_eq!(
            incoming.lines[0].matcher,
            MatchExpr::PermittedByAcl("~TABOO~prod:no-telnet".to_string())
        );
        assert_eq!(
            incoming.lines[1].matcher,
            MatchExpr::PermittedByAcl("~CONTRACT~prod:web".to_string())
        );
        assert_eq!(incoming.lines[2].matcher, MatchExpr::True);

        // The taboo alone still yields an outgoing policy.
        let outgoing = policy.outgoing.as_ref().expect("outgoing");
        assert_eq!(outgoing.lines.len(), 2);
        assert!(diags.is_empty());
    }

    #[test]
    fn consumed_feeds_incoming_and_provided_feeds_outgoing() {
        let model = model(vec![
            filter("http", "80"),
            filter("sql", "3306"),
            contract("vzBrCP", "web", "http"),
            contract("vzBrCP", "db", "sql"),
            epg("app", &[("fvRsCons", "db"), ("fvRsProv", "web")]),
        ]);
        let (policies, _) = compile(&model);
        let policy = &policies["prod:shop:app"];
        let incoming = policy.incoming.as_ref().expect("incoming");
        let outgoing = policy.outgoing.as_ref().expect("outgoing");
        assert_eq!(
            incoming.lines[0].matcher,
            MatchExpr::PermittedByAcl("~CONTRACT~prod:db".to_string())
        );
        assert_eq!(
            outgoing.lines[0].matcher,
            MatchExpr::PermittedByAcl("~CONTRACT~prod:web".to_string())
        );
    }

    #[test]
    fn unresolved_reference_warns_and_is_omitted() {
        let model = model(vec![
            filter("http", "80"),
            contract("vzBrCP", "web", "http"),
            epg("web", &[("fvRsCons", "web"), ("fvRsCons", "ghost"), ("fvRsConsIf", "iface")]),
        ]);
        let (policies, diags) = compile(&model);
        let incoming = policies["prod:shop:web"].incoming.clone().expect("incoming");
        assert_eq!(incoming.lines.len(), 2);
        assert!(diags.contains(
            "Could not resolve contract reference 'ghost' for EPG prod:shop:web (incoming direction) to a known contract ACL"
        ));
        assert!(diags.contains("Could not resolve contract-interface reference 'iface'"));
    }

    #[test]
    fn epg_without_relations_has_no_policy() {
        let model = model(vec![epg("idle", &[])]);
        let (policies, _) = compile(&model);
        assert!(policies.is_empty());
    }

    #[test]
    fn duplicate_references_collapse() {
        let model = model(vec![
            filter("http", "80"),
            contract("vzBrCP", "web", "http"),
            epg("web", &[("fvRsCons", "web"), ("fvRsCons", "prod:web")]),
        ]);
        let (policies, _) = compile(&model);
        let incoming = policies["prod:shop:web"].incoming.clone().expect("incoming");
        assert_eq!(incoming.lines.len(), 2);
    }

    #[test]
    fn policy_names_are_sanitized() {
        assert_eq!(
            epg_policy_acl_name("prod:my app/web epg", false),
            "~EPG_POLICY~prod:my_app_web_epg~OUT"
        );
    }
}
