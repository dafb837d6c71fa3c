//! Topology type definitions.
//!
//! Identifiers for the three kinds of things the controller tracks
//! (switches, hosts and the graph nodes built from them) plus the
//! per-edge attributes stored for links.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Datapath identifier of a switch.
pub type SwitchId = u64;

/// Switch port number.
pub type PortNo = u32;

/// Link-layer (MAC) address of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MacAddr(pub [u8; 6]);

/// Error returned when a MAC address string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid MAC address '{0}'")]
pub struct MacParseError(pub String);

impl FromStr for MacAddr {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(MacParseError(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (slot, part) in bytes.iter_mut().zip(&parts) {
            if part.len() != 2 {
                return Err(MacParseError(s.to_string()));
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| MacParseError(s.to_string()))?;
        }
        Ok(MacAddr(bytes))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A vertex of the routing graph.
///
/// Variant order matters: switches sort before hosts, which is part of
/// the deterministic tie-breaking used by path computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeId {
    Switch(SwitchId),
    Host(MacAddr),
}

impl NodeId {
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host(_))
    }

    /// Returns the switch id if this node is a switch
    pub fn as_switch(&self) -> Option<SwitchId> {
        match self {
            Self::Switch(id) => Some(*id),
            Self::Host(_) => None,
        }
    }

    /// Returns the MAC address if this node is a host
    pub fn as_host(&self) -> Option<MacAddr> {
        match self {
            Self::Host(mac) => Some(*mac),
            Self::Switch(_) => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Switch(id) => write!(f, "{}", id),
            Self::Host(mac) => write!(f, "host-{}", mac),
        }
    }
}

/// Switches serialize as bare datapath ids, hosts as `"host-<mac>"`.
impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Switch(id) => serializer.serialize_u64(*id),
            Self::Host(_) => serializer.collect_str(self),
        }
    }
}

/// An end device and the switch port it hangs off.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Host {
    pub mac: MacAddr,
    pub switch: SwitchId,
    pub port: PortNo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpAddr>,
}

/// Attributes of one directed switch-to-switch edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkAttrs {
    pub bandwidth: f64,
    /// Port on the edge's source switch that leads to its destination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub egress_port: Option<PortNo>,
}
