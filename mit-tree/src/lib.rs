//! Decoding primitives for Cisco ACI Managed Information Tree exports.
//!
//! Exports arrive either as JSON (`{"polUni": {"attributes": ..., "children": [...]}}`)
//! or as XML (`<polUni name="..."><fvTenant .../></polUni>`). Both collapse into
//! the same [`MitNode`] shape so higher layers never branch on encoding.

pub mod decode;
pub mod json;
pub mod render;
pub mod tree;
pub mod xml;

pub use decode::{decode, decode_document, decode_file, detect_format, DecodeError, Format};
pub use json::{parse_json, to_json_value};
pub use render::render_tree;
pub use tree::MitNode;
pub use xml::parse_xml;
