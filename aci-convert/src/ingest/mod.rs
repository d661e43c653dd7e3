//! Model Builder: walk a decoded MIT tree into a frozen [`AciModel`].
//!
//! The walk runs in a fixed order because later steps read what earlier ones
//! recorded:
//!
//! 1. node names from the identity policies
//! 2. fabric nodes and their interfaces
//! 3. vPC pairs from explicit protection groups
//! 4. tenants (EPG path attachments and OOB management are decoded here,
//!    after nodes exist)

mod contracts;
mod external;
mod fabric;
mod mgmt;
mod tenant;

use mit_tree::MitNode;

use crate::class::{class_of, MitClass};
use crate::diagnostics::Diagnostics;
use crate::fallback;
use crate::model::{AciModel, ModelBuilder};

/// Build the semantic model for one decoded document.
///
/// `root` is what [`mit_tree::decode`] returned: `polUni` when the export has
/// one, else the document root. `source_name` is only used to derive the
/// fabric hostname when `polUni` carries no name.
pub fn build_model(root: &MitNode, source_name: &str, diagnostics: &mut Diagnostics) -> AciModel {
    let pol_uni_name = match class_of(root) {
        MitClass::PolUni => root.attr("name"),
        _ => None,
    };
    let hostname = fallback::document_hostname(pol_uni_name, source_name);
    let mut builder = ModelBuilder::new(hostname);

    let top = top_level(root);

    fabric::collect_node_names(&top, &mut builder);
    fabric::build_fabric_nodes(&top, &mut builder, diagnostics);
    fabric::detect_vpc_pairs(&top, &mut builder);

    for node in &top {
        if class_of(node) == MitClass::FvTenant {
            tenant::walk_tenant(node, &mut builder, diagnostics);
        }
    }

    let model = builder.freeze();
    tracing::debug!(
        hostname = model.hostname(),
        tenants = model.tenants().len(),
        fabric_nodes = model.fabric_nodes().len(),
        epgs = model.epgs().len(),
        contracts = model.contracts().len(),
        "built semantic model"
    );
    model
}

// Objects that sit directly under the universe. A tree rooted at some other
// object (a bare tenant export, say) is treated as its own single top-level
// object.
fn top_level(root: &MitNode) -> Vec<&MitNode> {
    match root.class.as_str() {
        mit_tree::decode::POL_UNI | mit_tree::json::IMDATA_CLASS | mit_tree::json::DOCUMENT_CLASS => {
            root.children.iter().collect()
        }
        _ => vec![root],
    }
}

/// Direct children of `node` that belong to `class`.
pub(crate) fn children_of<'a>(
    node: &'a MitNode,
    class: MitClass,
) -> impl Iterator<Item = &'a MitNode> + 'a {
    node.children.iter().filter(move |c| class_of(c) == class)
}

/// Non-empty `name` attribute, trimmed.
pub(crate) fn name_of(node: &MitNode) -> Option<&str> {
    node.attr("name").map(str::trim).filter(|n| !n.is_empty())
}

/// Attribute value unless it is ACI's `unspecified` placeholder.
pub(crate) fn specified<'a>(node: &'a MitNode, key: &str) -> Option<&'a str> {
    node.attr(key)
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("unspecified"))
}
