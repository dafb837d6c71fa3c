//! Path-to-flow translation.
//!
//! Every route is walked in both directions. Each transit switch gets one
//! rule matching the far endpoint's MAC and forwarding out of the port that
//! leads to the next node on the path. Ports come from the topology
//! snapshot; a hop whose port is unknown is skipped without aborting the
//! batch.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;

use super::{FlowError, FlowRule, Southbound};
use crate::routing::RouteTable;
use crate::topology::{MacAddr, NodeId, SwitchId, TopologyStore};

/// Outcome of one installation batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub rules_sent: usize,
    pub hops_skipped: usize,
    pub dispatch_failures: usize,
}

/// Rules derived from a route table, one per `(switch, destination)`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowPlan {
    pub rules: Vec<FlowRule>,
    pub hops_skipped: usize,
}

pub struct FlowInstaller {
    southbound: Arc<dyn Southbound>,
    priority: u16,
}

impl FlowInstaller {
    pub fn new(southbound: Arc<dyn Southbound>, priority: u16) -> Self {
        Self {
            southbound,
            priority,
        }
    }

    /// Translate routes into rules without dispatching anything
    pub fn plan(&self, topo: &TopologyStore, routes: &RouteTable) -> FlowPlan {
        let mut rules: BTreeMap<(SwitchId, MacAddr), FlowRule> = BTreeMap::new();
        let mut hops_skipped = 0;

        for route in routes.iter() {
            let reversed: Vec<NodeId> = route.path.iter().rev().copied().collect();
            for (path, dst_mac) in [(&route.path, route.dst), (&reversed, route.src)] {
                for hop in path.windows(2).skip(1) {
                    let (node, next) = (hop[0], hop[1]);
                    let Some(switch) = node.as_switch() else {
                        continue;
                    };
                    let out_port = match topo.egress_port(switch, &next) {
                        Some(port) => port,
                        None => {
                            hops_skipped += 1;
                            warn!(
                                "Skipping hop for dst_mac={}: {}",
                                dst_mac,
                                FlowError::PortUnresolved { switch, next }
                            );
                            continue;
                        }
                    };

                    match rules.entry((switch, dst_mac)) {
                        Entry::Vacant(slot) => {
                            slot.insert(FlowRule {
                                switch,
                                dst_mac,
                                out_port,
                                priority: self.priority,
                            });
                        }
                        Entry::Occupied(existing) if existing.get().out_port != out_port => {
                            debug!(
                                "Switch {} already forwards {} to port {}, ignoring port {}",
                                switch,
                                dst_mac,
                                existing.get().out_port,
                                out_port
                            );
                        }
                        Entry::Occupied(_) => {}
                    }
                }
            }
        }

        FlowPlan {
            rules: rules.into_values().collect(),
            hops_skipped,
        }
    }

    /// Plan and dispatch rules for every route.
    ///
    /// Dispatch failures are logged and counted; the batch always runs to
    /// completion.
    pub fn install(&self, topo: &TopologyStore, routes: &RouteTable) -> InstallReport {
        let plan = self.plan(topo, routes);
        let mut report = InstallReport {
            hops_skipped: plan.hops_skipped,
            ..InstallReport::default()
        };

        for rule in &plan.rules {
            match self.southbound.send_flow_rule(rule) {
                Ok(()) => report.rules_sent += 1,
                Err(err) => {
                    report.dispatch_failures += 1;
                    error!("{}", err);
                }
            }
        }

        info!(
            "Installed flows for {} routes: {} rules sent, {} hops skipped, {} dispatch failures",
            routes.len(),
            report.rules_sent,
            report.hops_skipped,
            report.dispatch_failures
        );
        report
    }
}
