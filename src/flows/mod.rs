//! Flow installation.
//!
//! Turns computed routes into per-switch forwarding rules and dispatches
//! them through a southbound capability.

pub mod install;
pub mod southbound;

use serde::Serialize;

use crate::topology::{MacAddr, NodeId, PortNo, SwitchId};

pub use install::{FlowInstaller, FlowPlan, InstallReport};
pub use southbound::{JsonLinesSouthbound, LoggingSouthbound, Southbound};

/// Match on destination MAC at `switch`, output on `out_port`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowRule {
    pub switch: SwitchId,
    pub dst_mac: MacAddr,
    pub out_port: PortNo,
    pub priority: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("no known port on switch {switch} towards {next}")]
    PortUnresolved { switch: SwitchId, next: NodeId },
    #[error("dispatch to switch {switch} failed: {reason}")]
    Dispatch { switch: SwitchId, reason: String },
}
