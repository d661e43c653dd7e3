//! Cisco ACI fabric export conversion.
//!
//! An APIC export describes a whole fabric as one policy tree: tenants, VRFs,
//! bridge domains, EPGs, contracts, L3Outs, and the switches they land on.
//! Downstream network analysis wants the opposite view, one configuration per
//! switch. This library does that translation and reports everything it had
//! to skip or guess along the way.
//!
//! # Architecture
//!
//! The pipeline runs in four stages. Each stage reads only what the previous
//! one produced.
//!
//! ## Decoding
//!
//! - [`mit_tree`] (separate crate) turns JSON or XML into a generic
//!   [`mit_tree::MitNode`] tree
//!
//! ## Ingestion
//!
//! - [`class`] - the MIT object classes the walk understands
//! - [`ids`] - typed parsing of DNs, encapsulations, and port tokens
//! - [`fallback`] - naming, role, and hostname rules for missing data
//! - [`ingest`] - the tree walk that fills a [`model::ModelBuilder`]
//! - [`model`] - the frozen [`model::AciModel`]
//!
//! ## Resolution
//!
//! - [`resolve`] - unique device hostnames and the layer-1 edge set
//! - [`acl`] - contracts and taboos compiled into ACLs, plus per-EPG
//!   composite policies
//!
//! ## Lowering
//!
//! - [`lower`] - one [`device::DeviceConfig`] per fabric node
//! - [`device`] - the vendor-independent output records
//! - [`settings`] - numeric constants, overridable from TOML
//!
//! ## Reporting
//!
//! - [`diagnostics`] - the append-only warning sink shared by every stage
//! - [`report`] - text and JSON summaries for the command line
//!
//! # Errors
//!
//! Only undecodable input is fatal; it surfaces as
//! [`mit_tree::DecodeError`] before any model exists. Every other problem
//! (an unresolved reference, an unparseable field, an unsupported object) is
//! recorded in [`diagnostics::Diagnostics`] and conversion continues.
//!
//! # Examples
//!
//! ```ignore
//! use aci_convert::{convert_tree, settings::default_settings};
//!
//! let text = std::fs::read_to_string("fabric.json")?;
//! let root = mit_tree::decode(&text, "fabric.json")?;
//! let result = convert_tree(&root, "fabric.json", Vec::new(), &default_settings());
//! for (hostname, device) in &result.devices {
//!     println!("{hostname}: {} interfaces", device.interfaces.len());
//! }
//! println!("warnings={}", result.diagnostics.len());
//! ```

pub mod acl;
pub mod class;
pub mod device;
pub mod diagnostics;
pub mod fallback;
pub mod ids;
pub mod ingest;
pub mod lower;
pub mod model;
pub mod report;
pub mod resolve;
pub mod settings;

use mit_tree::MitNode;

use device::ConversionResult;
use diagnostics::Diagnostics;
use model::FabricLink;
use settings::LoweringSettings;

/// Ingest, resolve, and lower one decoded document.
///
/// `links` are explicit fabric links from a companion document; pass an empty
/// vector to synthesize the topology instead. Ingestion diagnostics come first
/// in the result, followed by everything lowering recorded.
pub fn convert_tree(
    root: &MitNode,
    source_name: &str,
    links: Vec<FabricLink>,
    settings: &LoweringSettings,
) -> ConversionResult {
    let mut diagnostics = Diagnostics::new();
    let model = ingest::build_model(root, source_name, &mut diagnostics).with_fabric_links(links);
    let mut result = lower::convert(&model, settings);
    diagnostics.absorb(std::mem::take(&mut result.diagnostics));
    result.diagnostics = diagnostics;
    result
}
