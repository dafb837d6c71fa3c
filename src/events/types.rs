//! Topology event shapes.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::topology::{MacAddr, PortNo, SwitchId, TopologyError};

/// A topology notification as delivered by the discovery layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TopologyEvent {
    SwitchJoined {
        id: SwitchId,
    },
    LinkAdded {
        src: SwitchId,
        dst: SwitchId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bandwidth: Option<f64>,
        /// Port on `src` facing `dst`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src_port: Option<PortNo>,
        /// Port on `dst` facing `src`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst_port: Option<PortNo>,
    },
    HostAdded {
        mac: MacAddr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        switch_id: Option<SwitchId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<PortNo>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<IpAddr>,
    },
}

impl TopologyEvent {
    /// Short name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SwitchJoined { .. } => "switch_joined",
            Self::LinkAdded { .. } => "link_added",
            Self::HostAdded { .. } => "host_added",
        }
    }
}

/// Reasons an event is discarded instead of applied
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    #[error("host {mac} has no attachment point")]
    MissingAttachment { mac: MacAddr },
    #[error(transparent)]
    Topology(#[from] TopologyError),
}
