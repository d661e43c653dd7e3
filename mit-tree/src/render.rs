use std::fmt::Write;

use crate::tree::MitNode;

/// Render a tree as indented class names down to `max_depth`.
///
/// Each line shows the class and, when present, the `name` or `dn`
/// attribute. A node cut off by the depth limit shows how many children it
/// hides.
pub fn render_tree(node: &MitNode, max_depth: usize) -> String {
    let mut out = String::new();
    render_node(node, 0, max_depth, &mut out);
    out
}

fn render_node(node: &MitNode, depth: usize, max_depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = write!(out, "{indent}{}", node.class);
    if let Some(label) = node.attr("name").or_else(|| node.attr("dn")) {
        let _ = write!(out, " [{label}]");
    }

    if depth >= max_depth {
        if !node.children.is_empty() {
            let _ = write!(out, " (+{} children)", node.children.len());
        }
        out.push('\n');
        return;
    }
    out.push('\n');

    for child in &node.children {
        render_node(child, depth + 1, max_depth, out);
    }
}

#[cfg(test)]
mod tests {
    use super::render_tree;
    use crate::tree::MitNode;

    fn sample() -> MitNode {
        MitNode::new("polUni").with_child(
            MitNode::new("fvTenant")
                .with_attr("name", "prod")
                .with_child(MitNode::new("fvCtx").with_attr("name", "vrf1"))
                .with_child(MitNode::new("fvBD").with_attr("name", "bd1")),
        )
    }

    #[test]
    fn renders_names_with_indentation() {
        let out = render_tree(&sample(), 5);
        assert_eq!(
            out,
            "polUni\n  fvTenant [prod]\n    fvCtx [vrf1]\n    fvBD [bd1]\n"
        );
    }

    #[test]
    fn depth_limit_counts_hidden_children() {
        let out = render_tree(&sample(), 1);
        assert_eq!(out, "polUni\n  fvTenant [prod] (+2 children)\n");
    }
}
