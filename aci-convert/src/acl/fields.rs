//! Field-level translation of filter entries into match terms.
//!
//! Every function returns `None` for "no constraint". Values that cannot be
//! represented in an IPv4 ACL are recorded as diagnostics.

use std::fmt::{self, Display, Formatter};
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use crate::device::{AddressMatch, MatchExpr};
use crate::diagnostics::Diagnostics;
use crate::ids::PortToken;
use crate::model::PortField;

/// Where a line came from, for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    pub contract: &'a str,
    pub filter: &'a str,
    pub entry: Option<&'a str>,
}

impl Display for LineContext<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "contract {} filter {}", self.contract, self.filter)?;
        if let Some(entry) = self.entry {
            write!(f, " entry {entry}")?;
        }
        Ok(())
    }
}

const ETHERTYPE_IPV4: u32 = 0x0800;
const ETHERTYPE_ARP: u32 = 0x0806;
const ETHERTYPE_IPV6: u32 = 0x86dd;
const ETHERTYPE_MPLS_UNICAST: u32 = 0x8847;
const ETHERTYPE_MPLS_MULTICAST: u32 = 0x8848;

fn ether_type_value(raw: &str) -> Result<u32, String> {
    let et = raw.trim().to_ascii_lowercase();
    if let Some(hex) = et.strip_prefix("0x") {
        return match u32::from_str_radix(hex, 16) {
            Ok(v) if v <= 0xffff => Ok(v),
            _ => Err(format!("Invalid etherType {raw}")),
        };
    }
    if !et.is_empty() && et.bytes().all(|b| b.is_ascii_hexdigit()) {
        return u32::from_str_radix(&et, 16)
            .ok()
            .filter(|v| *v <= 0xffff)
            .ok_or_else(|| format!("Invalid etherType {raw}"));
    }
    match et.as_str() {
        "ip" | "ipv4" => Ok(ETHERTYPE_IPV4),
        "arp" => Ok(ETHERTYPE_ARP),
        "ipv6" => Ok(ETHERTYPE_IPV6),
        "mpls" | "mpls_unicast" | "mpls-unicast" => Ok(ETHERTYPE_MPLS_UNICAST),
        "mpls_multicast" | "mpls-multicast" => Ok(ETHERTYPE_MPLS_MULTICAST),
        "trill" => Ok(0x22f3),
        "macsec" => Ok(0x88e5),
        "fcoe" => Ok(0x8906),
        "lldp" => Ok(0x88cc),
        _ => Err(format!("Unknown etherType {raw}")),
    }
}

/// Ether-type constraint. IPv4 imposes none; any other L2 protocol can never
/// match an IPv4 packet, so it becomes [`MatchExpr::False`].
pub fn ether_type(raw: &str, ctx: LineContext<'_>, diagnostics: &mut Diagnostics) -> Option<MatchExpr> {
    let value = match ether_type_value(raw) {
        Ok(v) => v,
        Err(message) => {
            diagnostics.value(format!("{message} in {ctx}"));
            return None;
        }
    };
    let label = match value {
        ETHERTYPE_IPV4 => return None,
        ETHERTYPE_IPV6 => "IPv6",
        ETHERTYPE_ARP => "ARP",
        ETHERTYPE_MPLS_UNICAST | ETHERTYPE_MPLS_MULTICAST => "MPLS",
        other => {
            diagnostics.value(format!(
                "Non-IP etherType (0x{other:04x}) specified in {ctx}: This will not match IP traffic"
            ));
            return Some(MatchExpr::False);
        }
    };
    diagnostics.value(format!(
        "{label} etherType specified in {ctx}: {label} filtering has limited effect in IPv4 ACLs"
    ));
    Some(MatchExpr::False)
}

/// IP protocol number for a name or a raw 0-255 value. `ip`/`ipv4` mean any.
pub fn ip_protocol(raw: &str, diagnostics: &mut Diagnostics) -> Option<u8> {
    let p = raw.trim().to_ascii_lowercase();
    let number = match p.as_str() {
        "ip" | "ipv4" => return None,
        "icmp" => 1,
        "igmp" => 2,
        "ipinip" => 4,
        "tcp" => 6,
        "udp" => 17,
        "gre" => 47,
        "icmpv6" => 58,
        "ospf" | "ospfigp" => 89,
        "pim" => 103,
        "sctp" => 132,
        other => match other.parse::<u32>() {
            Ok(n) => match u8::try_from(n) {
                Ok(n) => n,
                Err(_) => {
                    diagnostics.value(format!("Invalid IP protocol number: {raw} (must be 0-255)"));
                    return None;
                }
            },
            Err(_) => {
                diagnostics.value(format!("Unknown IP protocol: {raw}"));
                return None;
            }
        },
    };
    Some(number)
}

pub const IP_PROTOCOL_ICMP: u8 = 1;
pub const IP_PROTOCOL_ICMPV6: u8 = 58;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpFamily {
    V4,
    V6,
}

fn icmp_type_by_name(name: &str, family: IcmpFamily) -> Option<u8> {
    let n = name.trim().to_ascii_lowercase();
    match family {
        IcmpFamily::V4 => match n.as_str() {
            "echo-reply" | "echo-rep" => Some(0),
            "destination-unreachable" | "dest-unreachable" | "dst-unreach" => Some(3),
            "source-quench" | "src-quench" => Some(4),
            "redirect" => Some(5),
            "alternate-host-address" => Some(6),
            "echo-request" | "echo" => Some(8),
            "router-advertisement" | "router-advert" => Some(9),
            "router-solicitation" | "router-solicit" => Some(10),
            "time-exceeded" | "ttl-exceeded" => Some(11),
            "parameter-problem" | "parameter-prob" => Some(12),
            "timestamp-request" | "timestamp" => Some(13),
            "timestamp-reply" => Some(14),
            "information-request" | "info-request" => Some(15),
            "information-reply" | "info-reply" => Some(16),
            "address-mask-request" | "mask-request" => Some(17),
            "address-mask-reply" | "mask-reply" => Some(18),
            _ => None,
        },
        IcmpFamily::V6 => match n.as_str() {
            "destination-unreachable" | "dst-unreach" => Some(1),
            "time-exceeded" => Some(3),
            "echo-request" | "echo" => Some(128),
            "echo-reply" | "echo-rep" => Some(129),
            "nbr-solicit" => Some(135),
            "nbr-advert" => Some(136),
            _ => None,
        },
    }
}

/// ICMP type, and code when one is given.
pub fn icmp(
    icmp_type: &str,
    icmp_code: Option<&str>,
    family: IcmpFamily,
    diagnostics: &mut Diagnostics,
) -> Option<MatchExpr> {
    let type_value = match icmp_type_by_name(icmp_type, family) {
        Some(v) => v,
        None => match icmp_type.trim().parse::<u32>() {
            Ok(n) => match u8::try_from(n) {
                Ok(v) => v,
                Err(_) => {
                    diagnostics.value(format!("Invalid ICMP type: {icmp_type} (must be 0-255)"));
                    return None;
                }
            },
            Err(_) => {
                diagnostics.value(format!("Invalid ICMP type: {icmp_type}"));
                return None;
            }
        },
    };

    let code = icmp_code.and_then(|raw| match raw.trim().parse::<u32>() {
        Ok(n) if n <= 255 => u8::try_from(n).ok(),
        Ok(_) => {
            diagnostics.value(format!("Invalid ICMP code: {raw} (must be 0-255)"));
            None
        }
        Err(_) => {
            diagnostics.value(format!("Invalid ICMP code: {raw}"));
            None
        }
    });

    Some(match code {
        Some(code) => MatchExpr::And(vec![MatchExpr::IcmpType(type_value), MatchExpr::IcmpCode(code)]),
        None => MatchExpr::IcmpType(type_value),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Source,
    Destination,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Destination => "destination",
        })
    }
}

/// Port constraint from a parsed port field.
pub fn ports(
    field: &PortField,
    direction: Direction,
    ctx: LineContext<'_>,
    diagnostics: &mut Diagnostics,
) -> Option<MatchExpr> {
    match &field.token {
        PortToken::Unconstrained => None,
        PortToken::Range(range) => Some(match direction {
            Direction::Source => MatchExpr::SrcPorts(vec![*range]),
            Direction::Destination => MatchExpr::DstPorts(vec![*range]),
        }),
        PortToken::Invalid(reason) => {
            let what = if field.raw.contains('-') { "port range" } else { "port" };
            diagnostics.value(format!(
                "Invalid {direction} {what} in {ctx}: {} ({reason})",
                field.raw
            ));
            None
        }
    }
}

/// Address constraint: CIDR prefix, single IP, or `ip/wildcard`.
pub fn address(raw: &str, diagnostics: &mut Diagnostics) -> Option<AddressMatch> {
    let spec = raw.trim();
    if spec.is_empty() || spec.eq_ignore_ascii_case("any") || spec == "0.0.0.0/0" {
        return None;
    }

    if let Some((ip, rest)) = spec.split_once('/') {
        if let Ok(ip) = ip.trim().parse::<Ipv4Addr>() {
            let rest = rest.trim();
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                if let Some(prefix) = rest
                    .parse::<u8>()
                    .ok()
                    .and_then(|len| Ipv4Network::new(ip, len).ok())
                {
                    return Some(AddressMatch::Prefix { prefix });
                }
            } else if let Ok(wildcard) = rest.parse::<Ipv4Addr>() {
                return Some(AddressMatch::Wildcard { ip, wildcard });
            }
        }
    } else if let Ok(ip) = spec.parse::<Ipv4Addr>() {
        if let Ok(prefix) = Ipv4Network::new(ip, 32) {
            return Some(AddressMatch::Prefix { prefix });
        }
    }

    diagnostics.value(format!("Invalid IP address specification: {raw}"));
    None
}

/// ARP opcodes mean nothing in an IP ACL; only real values are reported.
pub fn is_meaningful_arp_opcode(raw: Option<&str>) -> bool {
    raw.map(|r| r.trim().to_ascii_lowercase())
        .is_some_and(|r| !r.is_empty() && r != "unspecified" && r != "any")
}
