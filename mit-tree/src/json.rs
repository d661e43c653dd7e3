use serde_json::{Map, Value};

use crate::decode::DecodeError;
use crate::tree::MitNode;

/// Class name given to the synthetic node wrapping a REST `imdata` array.
pub const IMDATA_CLASS: &str = "imdata";

/// Class name given to a top-level object that is neither a single-class
/// object nor an `imdata` envelope.
pub const DOCUMENT_CLASS: &str = "document";

/// Decode a JSON export into a [`MitNode`] tree.
///
/// Accepted shapes:
/// - `{"polUni": {"attributes": {...}, "children": [...]}}` (single-class object)
/// - `{"totalCount": "1", "imdata": [{...}, ...]}` (REST query envelope)
///
/// Any other top-level object is wrapped in a `document` node whose children
/// are its keys.
pub fn parse_json(text: &str) -> Result<MitNode, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(top) = value else {
        return Err(DecodeError::Malformed(
            "top-level JSON value is not an object".to_string(),
        ));
    };

    if let Some(Value::Array(items)) = top.get(IMDATA_CLASS) {
        let mut root = MitNode::new(IMDATA_CLASS);
        if let Some(count) = top.get("totalCount").and_then(scalar_to_string) {
            root.attributes.insert("totalCount".to_string(), count);
        }
        root.children = children_from_array(items);
        return Ok(root);
    }

    if top.len() == 1 {
        if let Some((class, body)) = top.iter().next() {
            return Ok(node_from_body(class, body));
        }
    }

    let mut root = MitNode::new(DOCUMENT_CLASS);
    root.children = top
        .iter()
        .map(|(class, body)| node_from_body(class, body))
        .collect();
    Ok(root)
}

fn node_from_body(class: &str, body: &Value) -> MitNode {
    let mut node = MitNode::new(class);
    let Value::Object(fields) = body else {
        return node;
    };

    if let Some(Value::Object(attrs)) = fields.get("attributes") {
        for (key, value) in attrs {
            if let Some(text) = scalar_to_string(value) {
                node.attributes.insert(key.clone(), text);
            }
        }
    }
    if let Some(Value::Array(children)) = fields.get("children") {
        node.children = children_from_array(children);
    }
    node
}

fn children_from_array(items: &[Value]) -> Vec<MitNode> {
    let mut out = Vec::new();
    for item in items {
        if let Value::Object(wrapper) = item {
            for (class, body) in wrapper {
                out.push(node_from_body(class, body));
            }
        }
    }
    out
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Encode a [`MitNode`] back into the single-class JSON object shape.
pub fn to_json_value(node: &MitNode) -> Value {
    let mut body = Map::new();
    if !node.attributes.is_empty() {
        let attrs: Map<String, Value> = node
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        body.insert("attributes".to_string(), Value::Object(attrs));
    }
    if !node.children.is_empty() {
        let children = node.children.iter().map(to_json_value).collect();
        body.insert("children".to_string(), Value::Array(children));
    }
    let mut wrapper = Map::new();
    wrapper.insert(node.class.clone(), Value::Object(body));
    Value::Object(wrapper)
}
