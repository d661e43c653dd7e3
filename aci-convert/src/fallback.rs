//! Named fallback chains.
//!
//! Each function here encodes one "prefer X, else Y" rule with its priority
//! order spelled out, so the rule lives in one place and can be tested alone.

use std::path::Path;

use mit_tree::MitNode;

use crate::model::{FilterAction, NodeRole};

/// Node identifier of a fabric object: `nodeId`, else `id`.
pub fn node_id(node: &MitNode) -> Option<&str> {
    node.attr("nodeId").or_else(|| node.attr("id"))
}

/// Map key for a fabric node: its id, else its resolved name.
pub fn node_key<'a>(id: Option<&'a str>, name: Option<&'a str>) -> Option<&'a str> {
    id.or(name).filter(|k| !k.is_empty())
}

/// Human name of a fabric node: the identity-policy name, else the node's own
/// `name` attribute. Empty names count as absent.
pub fn node_name<'a>(identity: Option<&'a str>, own: Option<&'a str>) -> Option<&'a str> {
    identity
        .filter(|n| !n.is_empty())
        .or(own.filter(|n| !n.is_empty()))
}

/// Parse an explicit role word. `None` for empty or `unspecified`.
pub fn explicit_role(raw: Option<&str>) -> Option<NodeRole> {
    let raw = raw?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("unspecified") {
        return None;
    }
    Some(match raw.to_ascii_lowercase().as_str() {
        "leaf" => NodeRole::Leaf,
        "spine" => NodeRole::Spine,
        "service" | "services" => NodeRole::Service,
        _ => NodeRole::Unknown,
    })
}

/// Infer a role from a node name.
///
/// Exactly two rules, case-insensitive:
/// - contains `-leaf-` or starts with `leaf` -> leaf
/// - contains `-spine-` or starts with `spine` -> spine
pub fn infer_role(name: Option<&str>) -> NodeRole {
    let Some(name) = name else {
        return NodeRole::Unknown;
    };
    let lower = name.to_ascii_lowercase();
    if lower.contains("-leaf-") {
        NodeRole::Leaf
    } else if lower.contains("-spine-") || lower.starts_with("spine") {
        NodeRole::Spine
    } else if lower.starts_with("leaf") {
        NodeRole::Leaf
    } else {
        NodeRole::Unknown
    }
}

/// Role of a fabric node: explicit attribute, else inferred from the name.
pub fn resolve_role(explicit: Option<&str>, name: Option<&str>) -> NodeRole {
    explicit_role(explicit).unwrap_or_else(|| infer_role(name))
}

/// Fabric hostname: the `polUni` name, else `aci-{file stem}`.
pub fn document_hostname(pol_uni_name: Option<&str>, source_name: &str) -> String {
    if let Some(name) = pol_uni_name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    let stem = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("fabric");
    format!("aci-{stem}")
}

/// Clean a fabric hostname for use as a node hostname prefix.
///
/// Trims whitespace (blank becomes `aci`), strips a trailing `.json`/`.xml`,
/// collapses repeated leading `aci-` prefixes into one, and trims trailing
/// hyphens.
pub fn sanitize_fabric_hostname(raw: &str) -> String {
    let mut base = raw.trim().to_string();
    if base.is_empty() {
        base = "aci".to_string();
    }

    for ext in [".json", ".xml"] {
        if base.len() > ext.len() && base.to_ascii_lowercase().ends_with(ext) {
            base.truncate(base.len() - ext.len());
            break;
        }
    }

    let mut rest = base.as_str();
    let mut collapsed = false;
    while rest.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("aci-")) {
        rest = &rest[4..];
        collapsed = true;
    }
    let mut out = if collapsed {
        format!("aci-{rest}")
    } else {
        rest.to_string()
    };

    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out = "aci".to_string();
    }
    out
}

/// Hostname for a node without a name of its own.
pub fn synthesized_hostname(fabric_hostname: &str, node_id: &str) -> String {
    format!("{}-{}", sanitize_fabric_hostname(fabric_hostname), node_id)
}

/// External EPG name: the object's own name, else `extepg-{l3out}`.
pub fn external_epg_name(own: Option<&str>, l3out: &str) -> String {
    own.map_or_else(|| format!("extepg-{l3out}"), str::to_string)
}

/// Filter action: `deny` (any case) denies, anything else permits.
pub fn filter_action(raw: Option<&str>) -> FilterAction {
    match raw {
        Some(a) if a.trim().eq_ignore_ascii_case("deny") => FilterAction::Deny,
        _ => FilterAction::Permit,
    }
}

/// ACI boolean flags: `yes`/`true`/`enabled` are true.
pub fn flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("yes" | "true" | "enabled")
    )
}

/// Qualify a bare name with its tenant.
pub fn fq(tenant: &str, name: &str) -> String {
    format!("{tenant}:{name}")
}

/// Candidate fully qualified names for a bare reference, in lookup order:
/// as written, tenant-qualified, then tenant `common`.
pub fn reference_candidates(raw: &str, tenant: &str) -> Vec<String> {
    let mut out = vec![raw.to_string()];
    if !raw.contains(':') {
        out.push(fq(tenant, raw));
        if tenant != "common" {
            out.push(fq("common", raw));
        }
    }
    out
}
