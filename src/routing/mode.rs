//! Routing mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The active edge-weighting policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoutingMode {
    /// Links cost `1 / bandwidth`
    #[default]
    #[serde(rename = "dijkstra_bw")]
    BandwidthWeighted,
    /// Every inter-switch link costs one hop
    #[serde(rename = "shortest_hops")]
    HopCount,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid mode '{0}'")]
pub struct ModeParseError(pub String);

impl RoutingMode {
    /// Name used on the northbound API and in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BandwidthWeighted => "dijkstra_bw",
            Self::HopCount => "shortest_hops",
        }
    }
}

impl FromStr for RoutingMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dijkstra_bw" => Ok(Self::BandwidthWeighted),
            "shortest_hops" => Ok(Self::HopCount),
            other => Err(ModeParseError(other.to_string())),
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
