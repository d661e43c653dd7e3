use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// A generic Managed Information Tree object.
///
/// Both export encodings collapse to this shape: one class name, a flat string
/// attribute map, and an ordered list of child objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MitNode {
    /// Object class name (`fvTenant`, `fvBD`, ...).
    pub class: String,
    /// Object attributes keyed by name.
    pub attributes: BTreeMap<String, String>,
    /// Child objects in document order.
    pub children: Vec<MitNode>,
}

impl MitNode {
    /// Create a new node with no attributes or children.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style helper used heavily by tests.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder-style helper that appends a child.
    pub fn with_child(mut self, child: MitNode) -> Self {
        self.children.push(child);
        self
    }

    /// Return an attribute value, treating empty strings as absent.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Return the first child with the provided class.
    pub fn get_child(&self, class: &str) -> Option<&MitNode> {
        self.children.iter().find(|child| child.class == class)
    }

    /// Return all children with the provided class.
    pub fn get_children(&self, class: &str) -> Vec<&MitNode> {
        self.children
            .iter()
            .filter(|child| child.class == class)
            .collect()
    }

    /// Walk a nested class path and return every terminal node reached.
    ///
    /// Unlike [`MitNode::get_child`], each segment fans out over all matching
    /// children, so `["fabricNodeIdentPol", "fabricNodeIdentP"]` yields every
    /// identity entry under every identity policy.
    pub fn descendants<'a>(&'a self, path: &[&str]) -> Vec<&'a MitNode> {
        let mut current = vec![self];
        for segment in path {
            current = current
                .into_iter()
                .flat_map(|node| node.children.iter().filter(|c| c.class == *segment))
                .collect();
        }
        current
    }

    /// Count this node and all of its descendants.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(MitNode::node_count).sum::<usize>()
    }
}

impl Display for MitNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.class)?;
        if let Some(name) = self.attr("name") {
            write!(f, "[{}]", name)?;
        }
        if !self.children.is_empty() {
            write!(f, " ({} children)", self.children.len())?;
        }
        Ok(())
    }
}
