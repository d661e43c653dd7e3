//! The frozen semantic model of one ACI export.
//!
//! [`AciModel`] is produced once by [`crate::ingest::build_model`] and is
//! read-only from then on. Every keyed collection is a `BTreeMap`, so
//! iteration is always in ascending key order; hostname de-duplication and
//! topology synthesis rely on that.
//!
//! Keys are fully qualified (`tenant:name`, or `tenant:ap:epg` for EPGs inside
//! an application profile) except for fabric-wide entities, which are keyed by
//! their raw identifiers.

mod builder;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::ids::{Encap, PodNodeIface, PortToken};

pub use builder::ModelBuilder;

/// Fabric role of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Leaf,
    Spine,
    Service,
    Unknown,
}

impl NodeRole {
    /// Leaf and service nodes both sit at the edge of the spine-leaf mesh.
    pub fn is_leaf_like(self) -> bool {
        matches!(self, Self::Leaf | Self::Service)
    }
}

impl Display for NodeRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Leaf => "leaf",
            Self::Spine => "spine",
            Self::Service => "service",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Root aggregate for one export.
#[derive(Debug, Clone, Serialize)]
pub struct AciModel {
    hostname: String,
    tenants: BTreeMap<String, Tenant>,
    vrfs: BTreeMap<String, Vrf>,
    bridge_domains: BTreeMap<String, BridgeDomain>,
    application_profiles: BTreeMap<String, ApplicationProfile>,
    epgs: BTreeMap<String, Epg>,
    contracts: BTreeMap<String, Contract>,
    taboo_contracts: BTreeMap<String, Contract>,
    contract_interfaces: BTreeMap<String, ContractInterface>,
    filters: BTreeMap<String, Filter>,
    fabric_nodes: BTreeMap<String, FabricNode>,
    vpc_pairs: BTreeMap<String, VpcPair>,
    l3outs: BTreeMap<String, L3Out>,
    l2outs: BTreeMap<String, L2Out>,
    fabric_links: Vec<FabricLink>,
    path_attachments: BTreeMap<String, BTreeMap<String, PathAttachment>>,
    node_interfaces: BTreeMap<String, Vec<String>>,
}

impl AciModel {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn tenants(&self) -> &BTreeMap<String, Tenant> {
        &self.tenants
    }

    pub fn vrfs(&self) -> &BTreeMap<String, Vrf> {
        &self.vrfs
    }

    pub fn bridge_domains(&self) -> &BTreeMap<String, BridgeDomain> {
        &self.bridge_domains
    }

    pub fn application_profiles(&self) -> &BTreeMap<String, ApplicationProfile> {
        &self.application_profiles
    }

    pub fn epgs(&self) -> &BTreeMap<String, Epg> {
        &self.epgs
    }

    pub fn contracts(&self) -> &BTreeMap<String, Contract> {
        &self.contracts
    }

    pub fn taboo_contracts(&self) -> &BTreeMap<String, Contract> {
        &self.taboo_contracts
    }

    pub fn contract_interfaces(&self) -> &BTreeMap<String, ContractInterface> {
        &self.contract_interfaces
    }

    pub fn filters(&self) -> &BTreeMap<String, Filter> {
        &self.filters
    }

    pub fn fabric_nodes(&self) -> &BTreeMap<String, FabricNode> {
        &self.fabric_nodes
    }

    pub fn vpc_pairs(&self) -> &BTreeMap<String, VpcPair> {
        &self.vpc_pairs
    }

    pub fn l3outs(&self) -> &BTreeMap<String, L3Out> {
        &self.l3outs
    }

    pub fn l2outs(&self) -> &BTreeMap<String, L2Out> {
        &self.l2outs
    }

    /// Explicit links from a companion topology document, if one was merged.
    pub fn fabric_links(&self) -> &[FabricLink] {
        &self.fabric_links
    }

    /// nodeId -> interface name -> attachment.
    pub fn path_attachments(&self) -> &BTreeMap<String, BTreeMap<String, PathAttachment>> {
        &self.path_attachments
    }

    /// nodeId -> interface names in first-seen order, without duplicates.
    pub fn node_interfaces(&self) -> &BTreeMap<String, Vec<String>> {
        &self.node_interfaces
    }

    /// Return a copy of this model with the given explicit links attached.
    ///
    /// Links are a side channel read from a separate document, so they are
    /// merged after freezing rather than through the builder.
    pub fn with_fabric_links(mut self, links: Vec<FabricLink>) -> Self {
        self.fabric_links = links;
        self
    }
}

/// Top-level policy container. Holds the fq-keys of its entities; the
/// entities themselves live in the global maps of [`AciModel`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tenant {
    pub name: String,
    pub description: Option<String>,
    pub vrfs: BTreeSet<String>,
    pub bridge_domains: BTreeSet<String>,
    pub application_profiles: BTreeSet<String>,
    pub epgs: BTreeSet<String>,
    pub contracts: BTreeSet<String>,
    pub contract_interfaces: BTreeSet<String>,
    pub filters: BTreeSet<String>,
    pub taboo_contracts: BTreeSet<String>,
    pub l3outs: BTreeSet<String>,
    pub l2outs: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vrf {
    pub name: String,
    pub tenant: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeDomain {
    pub name: String,
    pub tenant: String,
    /// fq-name of the VRF; may not resolve.
    pub vrf: Option<String>,
    /// CIDR strings in document order.
    pub subnets: Vec<String>,
    pub encapsulation: Option<Encap>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationProfile {
    pub name: String,
    pub tenant: String,
    pub description: Option<String>,
    /// fq-names of member EPGs.
    pub epgs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Epg {
    pub name: String,
    pub tenant: String,
    pub application_profile: Option<String>,
    /// fq-name of the bridge domain; may not resolve.
    pub bridge_domain: Option<String>,
    pub provided_contracts: Vec<String>,
    pub consumed_contracts: Vec<String>,
    pub provided_contract_interfaces: Vec<String>,
    pub consumed_contract_interfaces: Vec<String>,
    pub protected_by_taboos: Vec<String>,
    pub description: Option<String>,
    pub path_attachments: Vec<PathAttachment>,
}

/// A contract or taboo contract. Both share one shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contract {
    pub name: String,
    pub tenant: String,
    pub description: Option<String>,
    pub scope: Option<String>,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub name: Option<String>,
    pub filters: Vec<FilterRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    Permit,
    Deny,
}

/// A subject's reference to a filter.
///
/// `inline` holds match fields carried on the reference itself; they are used
/// only when the name does not resolve to a real [`Filter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterRef {
    pub name: Option<String>,
    pub action: FilterAction,
    pub inline: EntryMatch,
}

/// A port constraint as written, plus its parsed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortField {
    pub raw: String,
    #[serde(skip)]
    pub token: PortToken,
}

impl PortField {
    pub fn parse(raw: String) -> Self {
        let token = crate::ids::parse_port_token(&raw);
        Self { raw, token }
    }
}

/// L2-L4 match criteria shared by filter entries and inline filter refs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryMatch {
    pub ether_type: Option<String>,
    pub protocol: Option<String>,
    pub destination_ports: Option<PortField>,
    pub source_ports: Option<PortField>,
    pub icmpv4_type: Option<String>,
    pub icmpv4_code: Option<String>,
    pub icmpv6_type: Option<String>,
    pub icmpv6_code: Option<String>,
    pub arp_opcode: Option<String>,
    pub apply_to_fragments: bool,
    pub stateful: bool,
    pub tcp_rules: Option<String>,
    pub source_address: Option<String>,
    pub destination_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterEntry {
    pub name: String,
    pub fields: EntryMatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub name: String,
    pub tenant: String,
    pub description: Option<String>,
    pub entries: Vec<FilterEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractInterface {
    pub name: String,
    pub tenant: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManagementInfo {
    pub address: String,
    pub gateway: Option<String>,
    pub address6: Option<String>,
    pub gateway6: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FabricNodeInterface {
    pub name: String,
    /// Raw type word, when the export carries one.
    pub kind: Option<String>,
    pub description: Option<String>,
    pub enabled: bool,
    /// fq-name of the EPG bound to this port through a path attachment.
    pub epg: Option<String>,
    /// Raw encapsulation from that path attachment.
    pub vlan: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FabricNode {
    /// Absent when the node was keyed by name only; such nodes produce no device.
    pub node_id: Option<String>,
    /// Absent when the export names nothing; lowering then synthesizes one.
    pub name: Option<String>,
    pub role: NodeRole,
    pub pod_id: Option<String>,
    /// Interfaces in first-seen order, unique by name.
    pub interfaces: Vec<FabricNodeInterface>,
    pub management: Option<ManagementInfo>,
}

impl FabricNode {
    pub fn interface(&self, name: &str) -> Option<&FabricNodeInterface> {
        self.interfaces.iter().find(|i| i.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VpcPair {
    pub vpc_id: String,
    pub vpc_name: Option<String>,
    pub peer1: String,
    pub peer2: String,
}

impl VpcPair {
    /// The other member, if `node_id` belongs to this pair.
    pub fn peer_of(&self, node_id: &str) -> Option<&str> {
        if self.peer1 == node_id {
            Some(&self.peer2)
        } else if self.peer2 == node_id {
            Some(&self.peer1)
        } else {
            None
        }
    }
}

/// Binding of an EPG or L3Out interface profile to a fabric port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathAttachment {
    pub target: PodNodeIface,
    pub encap: Option<Encap>,
    pub raw_encap: Option<String>,
    pub description: Option<String>,
    pub epg_name: Option<String>,
    pub epg_tenant: Option<String>,
    // L3Out-only fields
    pub address: Option<String>,
    pub mac: Option<String>,
    pub mode: Option<String>,
    pub interface_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BgpProcessConfig {
    pub router_id: Option<String>,
    pub asn: Option<u64>,
    pub ebgp_admin_distance: Option<u32>,
    pub ibgp_admin_distance: Option<u32>,
    pub local_admin_distance: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BgpPeerConfig {
    pub peer_address: Option<String>,
    pub remote_as: Option<String>,
    pub local_as: Option<String>,
    pub description: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
    pub update_source: Option<String>,
    pub local_preference: Option<String>,
    pub import_route_map: Option<String>,
    pub export_route_map: Option<String>,
    pub next_hop_self: bool,
    pub route_reflector_client: bool,
    pub ebgp_multihop: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StaticRouteConfig {
    pub prefix: Option<String>,
    pub next_hop: Option<String>,
    pub next_hop_interface: Option<String>,
    pub admin_distance: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OspfArea {
    pub area_id: String,
    pub area_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OspfInterfaceConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cost: Option<u32>,
    pub hello_interval: Option<u32>,
    pub dead_interval: Option<u32>,
    pub network_type: Option<String>,
    pub passive: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OspfConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    pub process_id: Option<String>,
    pub area_id: Option<String>,
    pub areas: Vec<OspfArea>,
    pub interfaces: Vec<OspfInterfaceConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExternalEpg {
    pub name: String,
    pub description: Option<String>,
    pub subnets: Vec<String>,
    pub provided_contracts: Vec<String>,
    pub consumed_contracts: Vec<String>,
    pub provided_contract_interfaces: Vec<String>,
    pub consumed_contract_interfaces: Vec<String>,
    pub protected_by_taboos: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct L3Out {
    pub name: String,
    pub tenant: String,
    /// fq-name of the VRF; may not resolve.
    pub vrf: Option<String>,
    pub description: Option<String>,
    pub enforce_route_control: Option<String>,
    pub mpls_enabled: Option<String>,
    pub target_dscp: Option<String>,
    pub bgp_process: Option<BgpProcessConfig>,
    pub bgp_peers: Vec<BgpPeerConfig>,
    pub static_routes: Vec<StaticRouteConfig>,
    pub ospf: Option<OspfConfig>,
    pub external_epgs: Vec<ExternalEpg>,
    pub path_attachments: Vec<PathAttachment>,
    pub nodes: Vec<L3OutNode>,
}

impl L3Out {
    /// Nodes this L3Out is pinned to through node profiles or path attachments.
    pub fn node_ids(&self) -> BTreeSet<&str> {
        self.nodes
            .iter()
            .map(|n| n.node_id.as_str())
            .chain(self.path_attachments.iter().flat_map(|p| p.target.node_ids()))
            .collect()
    }

    /// Router id configured for `node_id` in the L3Out node profile.
    pub fn router_id_for(&self, node_id: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.node_id == node_id)
            .and_then(|n| n.router_id.as_deref())
    }
}

/// A border node bound to an L3Out (`l3extRsNodeL3OutAtt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct L3OutNode {
    pub node_id: String,
    pub router_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct L2Out {
    pub name: String,
    pub tenant: String,
    pub description: Option<String>,
    /// fq-name of the bridge domain; may not resolve.
    pub bridge_domain: Option<String>,
    pub encapsulation: Option<String>,
}

/// One explicit physical link from a companion topology document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FabricLink {
    pub node1: String,
    pub slot1: String,
    pub port1: String,
    pub node2: String,
    pub slot2: String,
    pub port2: String,
    pub link_state: Option<String>,
}
