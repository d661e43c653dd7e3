//! Name and topology resolution over a frozen model.
//!
//! Everything here is a pure function of the model (plus, for explicit links,
//! the companion document already merged into it). Results are computed once
//! and shared by every lowering task.

mod hostnames;
pub mod links;
mod topology;

pub use hostnames::Hostnames;
pub use links::{load_fabric_links, parse_fabric_links, LinkLoadError};
pub use topology::{layer1_edges, leaf_interfaces};
