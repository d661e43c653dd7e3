//! Vendor-independent per-device output records.
//!
//! These types carry what downstream analysis needs from one switch: VRFs,
//! interfaces, ACLs, routing processes, and routing policies. They are plain
//! serializable data; all the logic that fills them lives in [`crate::lower`]
//! and [`crate::acl`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::ids::{PortRange, VlanId};
use crate::model::NodeRole;

/// Name of the VRF every device carries.
pub const DEFAULT_VRF: &str = "default";

/// Everything produced for one fabric switch.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceConfig {
    pub hostname: String,
    pub node_id: Option<String>,
    pub role: NodeRole,
    pub vrfs: BTreeMap<String, VrfConfig>,
    pub interfaces: BTreeMap<String, InterfaceConfig>,
    pub acls: BTreeMap<String, Acl>,
    pub routing_policies: BTreeMap<String, RoutingPolicy>,
}

impl DeviceConfig {
    /// A device with only the `default` VRF.
    pub fn new(hostname: impl Into<String>, node_id: Option<String>, role: NodeRole) -> Self {
        let mut vrfs = BTreeMap::new();
        vrfs.insert(DEFAULT_VRF.to_string(), VrfConfig::new(DEFAULT_VRF));
        Self {
            hostname: hostname.into(),
            node_id,
            role,
            vrfs,
            interfaces: BTreeMap::new(),
            acls: BTreeMap::new(),
            routing_policies: BTreeMap::new(),
        }
    }

    /// The named VRF, created empty if missing.
    pub fn vrf_mut(&mut self, name: &str) -> &mut VrfConfig {
        self.vrfs
            .entry(name.to_string())
            .or_insert_with(|| VrfConfig::new(name))
    }

    /// Every BGP peer on the device, across VRFs.
    pub fn bgp_peers(&self) -> impl Iterator<Item = &BgpPeer> {
        self.vrfs
            .values()
            .filter_map(|v| v.bgp.as_ref())
            .flat_map(|b| b.peers.values())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VrfConfig {
    pub name: String,
    pub bgp: Option<BgpProcess>,
    /// OSPF processes keyed by process id.
    pub ospf: BTreeMap<String, OspfProcess>,
    pub static_routes: Vec<StaticRoute>,
}

impl VrfConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bgp: None,
            ospf: BTreeMap::new(),
            static_routes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceKind {
    Physical,
    Vlan,
    Loopback,
    Aggregated,
}

impl InterfaceKind {
    /// Map an export's interface type word. Unknown words are physical.
    pub fn from_word(word: Option<&str>) -> Self {
        match word.map(|w| w.trim().to_ascii_lowercase()).as_deref() {
            Some("vlan") => Self::Vlan,
            Some("loopback") => Self::Loopback,
            Some("portchannel" | "port-channel" | "aggregated") => Self::Aggregated,
            _ => Self::Physical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchportMode {
    Access,
    Trunk,
}

/// One L3 address on an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InterfaceAddress {
    pub address: Ipv4Network,
    pub generate_connected_route: bool,
    pub generate_local_route: bool,
}

impl InterfaceAddress {
    pub fn new(address: Ipv4Network) -> Self {
        Self {
            address,
            generate_connected_route: true,
            generate_local_route: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OspfNetworkType {
    PointToPoint,
    Broadcast,
    NonBroadcast,
    PointToMultipoint,
}

impl OspfNetworkType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "point-to-point" | "p2p" => Some(Self::PointToPoint),
            "broadcast" | "bcast" => Some(Self::Broadcast),
            "non-broadcast" | "nbma" => Some(Self::NonBroadcast),
            "point-to-multipoint" | "p2mp" => Some(Self::PointToMultipoint),
            _ => None,
        }
    }
}

/// Per-interface OSPF settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OspfInterfaceSettings {
    pub process: String,
    pub area: Ipv4Addr,
    pub cost: Option<u32>,
    pub hello_interval: u32,
    pub dead_interval: u32,
    pub network_type: OspfNetworkType,
    pub passive: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterfaceConfig {
    pub name: String,
    pub kind: InterfaceKind,
    pub vrf: String,
    pub enabled: bool,
    pub mtu: u32,
    pub human_name: Option<String>,
    pub description: Option<String>,
    /// Access VLAN of a VLAN interface.
    pub vlan: Option<VlanId>,
    pub switchport: Option<SwitchportMode>,
    pub allowed_vlans: BTreeSet<VlanId>,
    pub native_vlan: Option<VlanId>,
    pub address: Option<InterfaceAddress>,
    pub secondary_addresses: Vec<InterfaceAddress>,
    pub incoming_filter: Option<String>,
    pub outgoing_filter: Option<String>,
    pub ospf: Option<OspfInterfaceSettings>,
}

impl InterfaceConfig {
    pub fn new(name: impl Into<String>, kind: InterfaceKind, vrf: impl Into<String>, mtu: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            vrf: vrf.into(),
            enabled: true,
            mtu,
            human_name: None,
            description: None,
            vlan: None,
            switchport: None,
            allowed_vlans: BTreeSet::new(),
            native_vlan: None,
            address: None,
            secondary_addresses: Vec::new(),
            incoming_filter: None,
            outgoing_filter: None,
            ospf: None,
        }
    }

    /// Primary and secondary addresses, primary first.
    pub fn all_addresses(&self) -> impl Iterator<Item = &InterfaceAddress> {
        self.address.iter().chain(self.secondary_addresses.iter())
    }

    /// Append `extra` to the description with a ` | ` separator.
    pub fn append_description(&mut self, extra: &str) {
        self.description = Some(match self.description.take() {
            Some(existing) if !existing.is_empty() => format!("{existing} | {extra}"),
            _ => extra.to_string(),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineAction {
    Permit,
    Deny,
}

impl Display for LineAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Permit => "permit",
            Self::Deny => "deny",
        })
    }
}

/// An IPv4 address constraint in an ACL line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AddressMatch {
    Prefix { prefix: Ipv4Network },
    /// Cisco-style wildcard: bits set in `wildcard` are ignored.
    Wildcard { ip: Ipv4Addr, wildcard: Ipv4Addr },
}

/// Boolean match expression of one ACL line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "arg", rename_all = "snake_case")]
pub enum MatchExpr {
    True,
    False,
    And(Vec<MatchExpr>),
    IpProtocol(u8),
    IcmpType(u8),
    IcmpCode(u8),
    SrcAddress(AddressMatch),
    DstAddress(AddressMatch),
    DstPorts(Vec<PortRange>),
    SrcPorts(Vec<PortRange>),
    /// True when the named ACL on the same device permits the packet.
    PermittedByAcl(String),
}

impl MatchExpr {
    /// Conjunction of `terms`; no terms is [`MatchExpr::True`], one term is
    /// itself.
    pub fn and(mut terms: Vec<MatchExpr>) -> Self {
        match terms.len() {
            0 => Self::True,
            1 => terms.remove(0),
            _ => Self::And(terms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AclLine {
    pub action: LineAction,
    pub matcher: MatchExpr,
    pub name: String,
}

impl AclLine {
    pub fn new(action: LineAction, matcher: MatchExpr, name: impl Into<String>) -> Self {
        Self {
            action,
            matcher,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acl {
    pub name: String,
    pub lines: Vec<AclLine>,
}

/// BGP router id: explicit, or chosen by the device at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterId {
    Auto,
    Ip(Ipv4Addr),
}

#[derive(Debug, Clone, Serialize)]
pub struct BgpProcess {
    pub router_id: RouterId,
    pub local_as: Option<u64>,
    pub ebgp_admin_distance: u32,
    pub ibgp_admin_distance: u32,
    pub local_admin_distance: u32,
    /// Active peers keyed by peer address.
    pub peers: BTreeMap<Ipv4Addr, BgpPeer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BgpPeer {
    pub peer_address: Ipv4Addr,
    pub remote_as: Option<u64>,
    pub local_as: Option<u64>,
    pub local_ip: Option<Ipv4Addr>,
    pub description: String,
    pub import_policy: Option<String>,
    pub export_policy: Option<String>,
    pub route_reflector_client: bool,
    pub ebgp_multihop: bool,
}

/// BGP route origin attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Igp,
    Egp,
    Incomplete,
}

/// One routing-policy statement, evaluated in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "arg", rename_all = "snake_case")]
pub enum Statement {
    SetLocalPreference(u32),
    SetOrigin(Origin),
    SetNextHopSelf,
    /// Branch on whether the named route map permits the route.
    If {
        route_map: String,
        then: Vec<Statement>,
        otherwise: Vec<Statement>,
    },
    Accept,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingPolicy {
    pub name: String,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OspfAreaType {
    Normal,
    Stub,
    Nssa,
}

#[derive(Debug, Clone, Serialize)]
pub struct OspfAreaConfig {
    pub area: Ipv4Addr,
    pub area_type: OspfAreaType,
    /// Interfaces placed in this area.
    pub interfaces: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OspfProcess {
    pub process_id: String,
    pub router_id: Ipv4Addr,
    pub reference_bandwidth: f64,
    pub areas: BTreeMap<Ipv4Addr, OspfAreaConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticRoute {
    pub prefix: Ipv4Network,
    pub next_hop_ip: Option<Ipv4Addr>,
    pub next_hop_interface: Option<String>,
    pub admin_distance: u32,
    pub tag: Option<u64>,
}

/// One end of a physical link.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Endpoint {
    pub hostname: String,
    pub interface: String,
}

impl Endpoint {
    pub fn new(hostname: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            interface: interface.into(),
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.hostname, self.interface)
    }
}

/// A physical link between two device interfaces.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Layer1Edge {
    pub a: Endpoint,
    pub b: Endpoint,
}

impl Display for Layer1Edge {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.a, self.b)
    }
}

/// The outcome of one conversion run.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub fabric_hostname: String,
    /// Devices keyed by hostname.
    pub devices: BTreeMap<String, DeviceConfig>,
    pub edges: BTreeSet<Layer1Edge>,
    pub diagnostics: Diagnostics,
}
