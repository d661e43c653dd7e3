use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::json::parse_json;
use crate::tree::MitNode;
use crate::xml::parse_xml;

/// Class name of the policy-universe root object.
pub const POL_UNI: &str = "polUni";

/// Fatal errors raised while decoding an export. Any of these aborts the file.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input was empty or whitespace only.
    #[error("Empty configuration file: {source_name}")]
    Empty { source_name: String },
    /// Leading character was neither `{` nor `<`.
    #[error(
        "Unrecognized configuration format. Expected JSON (starting with '{{') or XML (starting with '<'), but file starts with '{found}': {source_name}"
    )]
    UnrecognizedFormat { found: char, source_name: String },
    /// JSON syntax error.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// XML syntax error.
    #[error("failed to parse XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Failed to decode an XML entity.
    #[error("failed to decode XML text: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    /// Input bytes were not valid UTF-8.
    #[error("invalid UTF-8 in configuration: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// Failed to read input file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    /// Structural issue in the document.
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Encoding of an export, decided by its first non-whitespace character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
}

/// Detect the export encoding.
///
/// # Errors
///
/// Returns [`DecodeError::Empty`] for blank input and
/// [`DecodeError::UnrecognizedFormat`] for any leading character other than
/// `{` or `<`.
pub fn detect_format(text: &str, source_name: &str) -> Result<Format, DecodeError> {
    match text.trim_start_matches('\u{feff}').trim_start().chars().next() {
        None => Err(DecodeError::Empty {
            source_name: source_name.to_string(),
        }),
        Some('{') => Ok(Format::Json),
        Some('<') => Ok(Format::Xml),
        Some(found) => Err(DecodeError::UnrecognizedFormat {
            found,
            source_name: source_name.to_string(),
        }),
    }
}

/// Decode export text into the raw document tree, without root selection.
pub fn decode_document(text: &str, source_name: &str) -> Result<MitNode, DecodeError> {
    let body = text.trim_start_matches('\u{feff}');
    match detect_format(body, source_name)? {
        Format::Json => parse_json(body),
        Format::Xml => parse_xml(body.as_bytes()),
    }
}

/// Decode export text and select the `polUni` root when one exists.
///
/// # Arguments
///
/// * `text` - Export contents
/// * `source_name` - File name used in error messages
///
/// # Errors
///
/// Any [`DecodeError`]; there is no partial result on failure.
pub fn decode(text: &str, source_name: &str) -> Result<MitNode, DecodeError> {
    decode_document(text, source_name).map(select_root)
}

/// Read and decode an export file.
pub fn decode_file(path: &Path) -> Result<MitNode, DecodeError> {
    let bytes = fs::read(path)?;
    let text = std::str::from_utf8(&bytes)?;
    decode(text, &path.display().to_string())
}

/// Pick the `polUni` object as root if it is the document root or one of its
/// direct children; otherwise keep the document root itself.
pub fn select_root(root: MitNode) -> MitNode {
    if root.class == POL_UNI {
        return root;
    }
    match root.children.iter().position(|c| c.class == POL_UNI) {
        Some(index) => {
            let mut root = root;
            root.children.swap_remove(index)
        }
        None => root,
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, detect_format, DecodeError, Format};

    #[test]
    fn detects_by_first_non_whitespace_character() {
        assert_eq!(detect_format("  \n{}", "a.json").expect("json"), Format::Json);
        assert_eq!(detect_format("\t<polUni/>", "a.xml").expect("xml"), Format::Xml);
    }

    #[test]
    fn empty_input_names_the_file() {
        let err = detect_format("   \n", "fabric.json").expect_err("empty");
        assert!(matches!(err, DecodeError::Empty { .. }));
        assert_eq!(err.to_string(), "Empty configuration file: fabric.json");
    }

    #[test]
    fn unknown_leading_character_is_fatal() {
        let err = detect_format("hostname r1", "r1.cfg").expect_err("unknown");
        assert_eq!(
            err.to_string(),
            "Unrecognized configuration format. Expected JSON (starting with '{') or XML (starting with '<'), but file starts with 'h': r1.cfg"
        );
    }

    #[test]
    fn selects_pol_uni_under_imdata() {
        let text = r#"{"imdata":[{"polUni":{"attributes":{"name":"lab"}}}]}"#;
        let root = decode(text, "x.json").expect("decode");
        assert_eq!(root.class, "polUni");
        assert_eq!(root.attr("name"), Some("lab"));
    }

    #[test]
    fn keeps_document_root_without_pol_uni() {
        let root = decode("<fvTenant name=\"t\"/>", "x.xml").expect("decode");
        assert_eq!(root.class, "fvTenant");
    }
}
