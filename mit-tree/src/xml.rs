use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;

use crate::decode::DecodeError;
use crate::tree::MitNode;

/// Decode an XML export into a [`MitNode`] tree.
///
/// Every element becomes one object of the element's class. Text content is
/// not part of the object model and is dropped.
pub fn parse_xml(xml: &[u8]) -> Result<MitNode, DecodeError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<MitNode> = Vec::new();
    let mut root: Option<MitNode> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let node = build_node_start(&e, &reader)?;
                stack.push(node);
            }
            Event::Empty(e) => {
                let node = build_node_start(&e, &reader)?;
                attach(node, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| {
                    DecodeError::Malformed("encountered closing tag without open tag".to_string())
                })?;
                attach(node, &mut stack, &mut root)?;
            }
            Event::Eof => break,
            Event::Text(_)
            | Event::CData(_)
            | Event::Decl(_)
            | Event::PI(_)
            | Event::DocType(_)
            | Event::Comment(_) => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(DecodeError::Malformed(
            "unclosed element(s) at end of document".to_string(),
        ));
    }

    root.ok_or_else(|| DecodeError::Malformed("no root element found".to_string()))
}

fn attach(
    node: MitNode,
    stack: &mut [MitNode],
    root: &mut Option<MitNode>,
) -> Result<(), DecodeError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_none() {
        *root = Some(node);
    } else {
        return Err(DecodeError::Malformed(
            "multiple top-level elements found".to_string(),
        ));
    }
    Ok(())
}

fn build_node_start(
    e: &quick_xml::events::BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<MitNode, DecodeError> {
    let class = qname_to_string(e.name())?;
    let mut node = MitNode::new(class);

    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = qname_to_string(attr.key)?;
        let value = attr
            .decode_and_unescape_value(reader.decoder())?
            .into_owned();
        node.attributes.insert(key, value);
    }

    Ok(node)
}

fn qname_to_string(name: QName<'_>) -> Result<String, DecodeError> {
    Ok(std::str::from_utf8(name.as_ref())?.to_string())
}

#[cfg(test)]
mod tests {
    use super::parse_xml;

    #[test]
    fn nests_elements_and_decodes_entities() {
        let xml = br#"<polUni><fvTenant name="a&amp;b"><fvCtx name="v1"/></fvTenant></polUni>"#;
        let root = parse_xml(xml).expect("parse");
        assert_eq!(root.class, "polUni");
        let tenant = root.get_child("fvTenant").expect("tenant");
        assert_eq!(tenant.attr("name"), Some("a&b"));
        assert_eq!(tenant.children[0].class, "fvCtx");
    }

    #[test]
    fn rejects_unclosed_document() {
        let err = parse_xml(b"<polUni><fvTenant name=\"t\">").expect_err("should fail");
        assert!(err.to_string().contains("unclosed"));
    }
}
