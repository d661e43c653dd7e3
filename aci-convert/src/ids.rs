//! Typed identifiers parsed once from ACI string encodings.
//!
//! Distinguished names, encapsulations, and port tokens all arrive as strings.
//! They are decoded here, at ingestion, so lowering code works with values
//! instead of re-splitting the same text in several places.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// A parsed path-endpoint distinguished name.
///
/// `topology/pod-1/paths-101/pathep-[eth1/1]` or
/// `topology/pod-1/protpaths-101-102/pathep-[vpc-web]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodNodeIface {
    pub pod_id: Option<String>,
    pub node_id: String,
    /// Second vPC member for `protpaths-` targets.
    pub peer_node_id: Option<String>,
    /// Interface name after [`normalize_interface_name`].
    pub interface: String,
}

impl PodNodeIface {
    /// Parse a path-endpoint tDn. Returns `None` when no node or interface
    /// segment can be found.
    pub fn parse(tdn: &str) -> Option<Self> {
        let pod_id = segment_after(tdn, "/pod-").map(str::to_string);

        let (node_id, peer_node_id) = if let Some(pair) = segment_after(tdn, "/protpaths-") {
            let mut ids = pair.splitn(2, '-');
            let first = ids.next().filter(|s| !s.is_empty())?;
            let second = ids.next().filter(|s| !s.is_empty());
            (first.to_string(), second.map(str::to_string))
        } else {
            let single = segment_after(tdn, "/paths-").filter(|s| !s.is_empty())?;
            (single.to_string(), None)
        };

        let iface_start = tdn.find("/pathep-[")? + "/pathep-[".len();
        let iface_end = tdn[iface_start..].rfind(']')? + iface_start;
        let raw_iface = &tdn[iface_start..iface_end];
        if raw_iface.is_empty() {
            return None;
        }

        Some(Self {
            pod_id,
            node_id,
            peer_node_id,
            interface: normalize_interface_name(raw_iface),
        })
    }

    /// Every node this path lands on: one for single-homed, two for vPC.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.node_id.as_str()).chain(self.peer_node_id.as_deref())
    }
}

/// A parsed node distinguished name, `topology/pod-1/node-101`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodNode {
    pub pod_id: Option<String>,
    pub node_id: String,
}

impl PodNode {
    pub fn parse(tdn: &str) -> Option<Self> {
        let node_id = tdn
            .split('/')
            .find_map(|part| part.strip_prefix("node-"))
            .filter(|id| !id.is_empty())?;
        let pod_id = tdn
            .split('/')
            .find_map(|part| part.strip_prefix("pod-"))
            .map(str::to_string);
        Some(Self {
            pod_id,
            node_id: node_id.to_string(),
        })
    }
}

// Text between `marker` and the next '/' (or end of string).
fn segment_after<'a>(tdn: &'a str, marker: &str) -> Option<&'a str> {
    let start = tdn.find(marker)? + marker.len();
    let rest = &tdn[start..];
    Some(rest.split('/').next().unwrap_or(rest))
}

/// Normalize an ACI interface token to the vendor-independent spelling.
///
/// | input       | output          |
/// |-------------|-----------------|
/// | `eth1/1`    | `Ethernet1/1`   |
/// | `po10`      | `port-channel10`|
/// | `lo0`       | `Loopback0`     |
/// | `vlan100`   | `Vlan100`       |
/// | `vl100`     | `Vlan100`       |
///
/// Anything else has only its first character upper-cased.
pub fn normalize_interface_name(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();

    if let Some(rest) = lower.strip_prefix("eth") {
        if is_slot_port(rest) {
            return format!("Ethernet{rest}");
        }
    }
    if let Some(rest) = lower.strip_prefix("po") {
        if is_digits(rest) {
            return format!("port-channel{rest}");
        }
    }
    if let Some(rest) = lower.strip_prefix("lo") {
        if is_digits(rest) {
            return format!("Loopback{rest}");
        }
    }
    let vlan_rest = lower
        .strip_prefix("vlan")
        .or_else(|| lower.strip_prefix("vl"));
    if let Some(rest) = vlan_rest {
        if is_digits(rest) {
            return format!("Vlan{rest}");
        }
    }

    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// `1/1`, and breakout forms such as `1/1/2`.
fn is_slot_port(s: &str) -> bool {
    let parts: Vec<&str> = s.split('/').collect();
    parts.len() >= 2 && parts.iter().all(|p| is_digits(p))
}

/// Return the `(slot, port)` pair of an `Ethernet{slot}/{port}` name.
pub fn ethernet_slot_port(name: &str) -> Option<(u32, u32)> {
    let rest = name.strip_prefix("Ethernet")?;
    let mut parts = rest.split('/');
    let slot = parts.next()?.parse().ok()?;
    let port = parts.next()?.parse().ok()?;
    Some((slot, port))
}

/// An 802.1Q VLAN identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 4095;

    pub fn new(id: u16) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&id).then_some(Self(id))
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Derive a stable VLAN from a name when no encapsulation is given.
    ///
    /// Uses the 32-bit polynomial-31 string hash so the result is identical on
    /// every platform and every run: `|hash mod 4094| + 1`.
    pub fn from_name_hash(name: &str) -> Self {
        let hash = name
            .encode_utf16()
            .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)));
        let id = (hash % 4094).unsigned_abs() + 1;
        Self(id as u16)
    }
}

impl Display for VlanId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A parsed encapsulation string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Encap {
    /// `vlan-{n}` with n in 1..=4095.
    Vlan(VlanId),
    /// `vxlan-{vni}` with vni >= 1.
    Vxlan(u32),
    /// ACI's literal `unknown` placeholder.
    Unknown,
    /// Anything that failed to parse; the raw text is kept for diagnostics.
    Invalid(String),
}

impl Encap {
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        if lower == "unknown" {
            return Self::Unknown;
        }
        if let Some(rest) = lower.strip_prefix("vlan-") {
            return rest
                .parse::<u16>()
                .ok()
                .and_then(VlanId::new)
                .map_or_else(|| Self::Invalid(raw.to_string()), Self::Vlan);
        }
        if let Some(rest) = lower.strip_prefix("vxlan-") {
            return match rest.parse::<u32>() {
                Ok(vni) if vni >= 1 => Self::Vxlan(vni),
                _ => Self::Invalid(raw.to_string()),
            };
        }
        Self::Invalid(raw.to_string())
    }

    /// The VLAN this encapsulation maps to on a device, if any.
    ///
    /// VXLAN VNIs fold into the VLAN range as `vni mod 4094 + 1`.
    pub fn vlan(&self) -> Option<VlanId> {
        match self {
            Self::Vlan(id) => Some(*id),
            Self::Vxlan(vni) => VlanId::new((vni % 4094) as u16 + 1),
            Self::Unknown | Self::Invalid(_) => None,
        }
    }
}

/// An inclusive L4 port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn single(port: u16) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }
}

impl Display for PortRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Outcome of reading one port token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortToken {
    /// Empty, `any`, `unspecified`, or `0`: imposes no constraint.
    Unconstrained,
    Range(PortRange),
    /// Unparseable, out of range, or inverted; carries the reason.
    Invalid(&'static str),
}

fn is_placeholder_port(token: &str) -> bool {
    let t = token.trim();
    t.is_empty()
        || t.eq_ignore_ascii_case("unspecified")
        || t.eq_ignore_ascii_case("any")
        || t == "0"
}

fn parse_port_number(token: &str) -> Option<u16> {
    let t = token.trim();
    if t.eq_ignore_ascii_case("unspecified") {
        return None;
    }
    // ACI exports well-known ports by name in some versions.
    match t.to_ascii_lowercase().as_str() {
        "ftpdata" | "ftp-data" => Some(20),
        "smtp" => Some(25),
        "dns" => Some(53),
        "http" => Some(80),
        "pop3" => Some(110),
        "https" => Some(443),
        "rtsp" => Some(554),
        _ => t.parse::<u32>().ok().and_then(|p| u16::try_from(p).ok()),
    }
}

/// Parse a port token: a bare number or `start-end`.
pub fn parse_port_token(token: &str) -> PortToken {
    let t = token.trim();
    if is_placeholder_port(t) {
        return PortToken::Unconstrained;
    }
    let Some((start, end)) = t.split_once('-') else {
        return match parse_port_number(t) {
            Some(port) => PortToken::Range(PortRange::single(port)),
            None => PortToken::Invalid("must be 0-65535"),
        };
    };
    if is_placeholder_port(start) || is_placeholder_port(end) {
        return PortToken::Unconstrained;
    }
    match (parse_port_number(start), parse_port_number(end)) {
        (Some(s), Some(e)) if s <= e => PortToken::Range(PortRange { start: s, end: e }),
        (Some(_), Some(_)) => PortToken::Invalid("start > end"),
        _ => PortToken::Invalid("ports must be 0-65535"),
    }
}

/// Collapse a single-port field and a from/to pair into one token.
///
/// A usable single port wins; otherwise `from`/`to` form a range, with a
/// lone endpoint standing for itself.
pub fn port_spec(single: Option<&str>, from: Option<&str>, to: Option<&str>) -> Option<String> {
    let usable = |s: &&str| !is_placeholder_port(s);
    if let Some(port) = single.filter(usable) {
        return Some(port.trim().to_string());
    }
    match (from.filter(usable), to.filter(usable)) {
        (Some(f), Some(t)) if f.trim() == t.trim() => Some(f.trim().to_string()),
        (Some(f), Some(t)) => Some(format!("{}-{}", f.trim(), t.trim())),
        (Some(p), None) | (None, Some(p)) => Some(p.trim().to_string()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_single_homed_path() {
        let path = PodNodeIface::parse("topology/pod-1/paths-101/pathep-[eth1/33]").expect("path");
        assert_eq!(path.pod_id.as_deref(), Some("1"));
        assert_eq!(path.node_id, "101");
        assert_eq!(path.peer_node_id, None);
        assert_eq!(path.interface, "Ethernet1/33");
    }

    #[test]
    fn vpc_path_lands_on_both_members() {
        let path =
            PodNodeIface::parse("topology/pod-1/protpaths-101-102/pathep-[eth1/1]").expect("path");
        assert_eq!(path.node_ids().collect::<Vec<_>>(), vec!["101", "102"]);
        assert_eq!(path.interface, "Ethernet1/1");
    }

    #[test]
    fn path_without_interface_is_rejected() {
        assert_eq!(PodNodeIface::parse("topology/pod-1/paths-101"), None);
        assert_eq!(PodNodeIface::parse("topology/pod-1/pathep-[eth1/1]"), None);
    }

    #[test]
    fn interface_normalization_table() {
        assert_eq!(normalize_interface_name("eth1/1"), "Ethernet1/1");
        assert_eq!(normalize_interface_name("eth1/1/3"), "Ethernet1/1/3");
        assert_eq!(normalize_interface_name("po7"), "port-channel7");
        assert_eq!(normalize_interface_name("lo0"), "Loopback0");
        assert_eq!(normalize_interface_name("vlan10"), "Vlan10");
        assert_eq!(normalize_interface_name("vl10"), "Vlan10");
        assert_eq!(normalize_interface_name("vpc-web"), "Vpc-web");
        assert_eq!(normalize_interface_name("Ethernet1/2"), "Ethernet1/2");
    }

    #[test]
    fn node_tdn_extracts_node_and_pod() {
        let node = PodNode::parse("topology/pod-2/node-1208").expect("node");
        assert_eq!(node.node_id, "1208");
        assert_eq!(node.pod_id.as_deref(), Some("2"));
        assert_eq!(PodNode::parse("topology/pod-2"), None);
    }

    #[test]
    fn encapsulation_forms() {
        assert_eq!(Encap::parse("vlan-100").vlan().map(VlanId::get), Some(100));
        assert_eq!(Encap::parse("vxlan-5000").vlan().map(VlanId::get), Some(5000 % 4094 + 1));
        assert_eq!(Encap::parse("unknown"), Encap::Unknown);
        assert_eq!(Encap::parse("vlan-0"), Encap::Invalid("vlan-0".to_string()));
        assert_eq!(Encap::parse("vlan-abc").vlan(), None);
    }

    #[test]
    fn name_hash_vlan_is_stable_and_in_range() {
        let a = VlanId::from_name_hash("prod:web-bd");
        let b = VlanId::from_name_hash("prod:web-bd");
        assert_eq!(a, b);
        assert!((1..=4094).contains(&a.get()));
        // "a" hashes to 97.
        assert_eq!(VlanId::from_name_hash("a").get(), 98);
    }

    #[test]
    fn placeholder_port_tokens_are_unconstrained() {
        for token in ["", "any", "ANY", "unspecified", "0"] {
            assert_eq!(parse_port_token(token), PortToken::Unconstrained, "{token:?}");
        }
    }

    #[test]
    fn port_range_is_inclusive() {
        let PortToken::Range(range) = parse_port_token("8080-8090") else {
            panic!("expected range");
        };
        assert_eq!(range.len(), 11);
        assert!(range.contains(8080) && range.contains(8090));
    }

    #[test]
    fn inverted_and_garbage_ranges_are_invalid() {
        assert_eq!(parse_port_token("90-80"), PortToken::Invalid("start > end"));
        assert!(matches!(parse_port_token("70000"), PortToken::Invalid(_)));
        assert!(matches!(parse_port_token("x-y"), PortToken::Invalid(_)));
    }

    #[test]
    fn single_port_wins_over_range_fields() {
        assert_eq!(port_spec(Some("22"), Some("80"), Some("90")).as_deref(), Some("22"));
        assert_eq!(port_spec(Some("unspecified"), Some("80"), Some("90")).as_deref(), Some("80-90"));
        assert_eq!(port_spec(None, Some("443"), Some("443")).as_deref(), Some("443"));
        assert_eq!(port_spec(None, Some("unspecified"), Some("unspecified")), None);
    }
}
