//! Topology store.
//!
//! The authoritative in-memory graph of switches, directed inter-switch
//! links and attached hosts. The store only grows; every mutation is
//! idempotent so repeated announcements converge on last-write-wins.
//!
//! The store itself is not synchronised. The controller wraps it in a
//! single mutex and hands out cloned snapshots for path computation.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use serde::Serialize;

use super::types::{Host, LinkAttrs, MacAddr, NodeId, PortNo, SwitchId};
use crate::routing::RoutingMode;

/// Edge weight parameters shared by every link in the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightPolicy {
    /// Bandwidth assumed for links announced without one
    pub default_bandwidth: f64,
    /// Weight used for links whose bandwidth is zero
    pub fallback_weight: f64,
}

impl Default for WeightPolicy {
    fn default() -> Self {
        Self {
            default_bandwidth: 100.0,
            fallback_weight: 1.0,
        }
    }
}

/// Outcome of a store mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Added,
    Updated,
    Unchanged,
    /// The mutation was a no-op because required data was missing
    Skipped,
}

impl Change {
    /// True when the graph differs from before the mutation
    pub fn is_change(self) -> bool {
        matches!(self, Self::Added | Self::Updated)
    }
}

/// Rejected store mutations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("link from switch {0} to itself")]
    SelfLoop(SwitchId),
    #[error("invalid bandwidth {bandwidth} on link {src} <-> {dst}")]
    InvalidBandwidth {
        src: SwitchId,
        dst: SwitchId,
        bandwidth: f64,
    },
}

/// Serializable view of one directed link
#[derive(Debug, Clone, Serialize)]
pub struct LinkView {
    pub src: SwitchId,
    pub dst: SwitchId,
    #[serde(flatten)]
    pub attrs: LinkAttrs,
}

/// Serializable view of the whole store
#[derive(Debug, Clone, Serialize)]
pub struct TopologySummary {
    pub switches: Vec<SwitchId>,
    pub links: Vec<LinkView>,
    pub hosts: Vec<Host>,
}

#[derive(Debug, Clone, Default)]
pub struct TopologyStore {
    policy: WeightPolicy,
    switches: BTreeSet<SwitchId>,
    /// src -> dst -> attributes; always holds both directions of a link
    links: BTreeMap<SwitchId, BTreeMap<SwitchId, LinkAttrs>>,
    hosts: BTreeMap<MacAddr, Host>,
    /// switch -> hosts attached to it
    attached: BTreeMap<SwitchId, BTreeSet<MacAddr>>,
}

impl TopologyStore {
    pub fn new(policy: WeightPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> WeightPolicy {
        self.policy
    }

    /// Register a switch. Re-joining a known switch is a no-op.
    pub fn add_switch(&mut self, id: SwitchId) -> Change {
        if self.switches.insert(id) {
            Change::Added
        } else {
            Change::Unchanged
        }
    }

    /// Add or refresh a bidirectional link without port information
    pub fn add_link(
        &mut self,
        a: SwitchId,
        b: SwitchId,
        bandwidth: Option<f64>,
    ) -> Result<Change, TopologyError> {
        self.add_link_with_ports(a, b, bandwidth, None, None)
    }

    /// Add or refresh a bidirectional link.
    ///
    /// Both directed edges always carry the same bandwidth. `a_port` is the
    /// egress port on `a` towards `b` and `b_port` the reverse; a missing
    /// port keeps whatever was learned from an earlier announcement.
    pub fn add_link_with_ports(
        &mut self,
        a: SwitchId,
        b: SwitchId,
        bandwidth: Option<f64>,
        a_port: Option<PortNo>,
        b_port: Option<PortNo>,
    ) -> Result<Change, TopologyError> {
        if a == b {
            return Err(TopologyError::SelfLoop(a));
        }
        let bandwidth = bandwidth.unwrap_or(self.policy.default_bandwidth);
        if !bandwidth.is_finite() || bandwidth < 0.0 {
            return Err(TopologyError::InvalidBandwidth {
                src: a,
                dst: b,
                bandwidth,
            });
        }

        self.switches.insert(a);
        self.switches.insert(b);

        let forward = self.upsert_edge(a, b, bandwidth, a_port);
        let reverse = self.upsert_edge(b, a, bandwidth, b_port);

        Ok(match (forward, reverse) {
            (Change::Added, _) | (_, Change::Added) => Change::Added,
            (Change::Unchanged, Change::Unchanged) => Change::Unchanged,
            _ => Change::Updated,
        })
    }

    fn upsert_edge(
        &mut self,
        src: SwitchId,
        dst: SwitchId,
        bandwidth: f64,
        port: Option<PortNo>,
    ) -> Change {
        let edges = self.links.entry(src).or_default();
        match edges.get_mut(&dst) {
            Some(existing) => {
                let updated = LinkAttrs {
                    bandwidth,
                    egress_port: port.or(existing.egress_port),
                };
                if *existing == updated {
                    Change::Unchanged
                } else {
                    *existing = updated;
                    Change::Updated
                }
            }
            None => {
                edges.insert(
                    dst,
                    LinkAttrs {
                        bandwidth,
                        egress_port: port,
                    },
                );
                Change::Added
            }
        }
    }

    /// Attach a host to the graph.
    ///
    /// A host without an attachment point is skipped, not buffered. A known
    /// MAC seen at a new attachment point moves there.
    pub fn add_host(
        &mut self,
        mac: MacAddr,
        attachment: Option<(SwitchId, PortNo)>,
        ip: Option<IpAddr>,
    ) -> Change {
        let Some((switch, port)) = attachment else {
            return Change::Skipped;
        };

        self.switches.insert(switch);
        let host = Host {
            mac,
            switch,
            port,
            ip,
        };

        let previous = self.hosts.insert(mac, host.clone());
        match previous {
            Some(old) if old == host => Change::Unchanged,
            Some(old) => {
                if old.switch != switch {
                    if let Some(set) = self.attached.get_mut(&old.switch) {
                        set.remove(&mac);
                    }
                }
                self.attached.entry(switch).or_default().insert(mac);
                Change::Updated
            }
            None => {
                self.attached.entry(switch).or_default().insert(mac);
                Change::Added
            }
        }
    }

    /// All hosts, ordered by MAC
    pub fn all_hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn host(&self, mac: &MacAddr) -> Option<&Host> {
        self.hosts.get(mac)
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn switches(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.switches.iter().copied()
    }

    pub fn switch_count(&self) -> usize {
        self.switches.len()
    }

    /// Number of directed switch-to-switch edges
    pub fn link_count(&self) -> usize {
        self.links.values().map(BTreeMap::len).sum()
    }

    pub fn link(&self, src: SwitchId, dst: SwitchId) -> Option<&LinkAttrs> {
        self.links.get(&src).and_then(|edges| edges.get(&dst))
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        match node {
            NodeId::Switch(id) => self.switches.contains(id),
            NodeId::Host(mac) => self.hosts.contains_key(mac),
        }
    }

    /// Adjacent nodes in ascending `NodeId` order (switches, then hosts)
    pub fn neighbors(&self, node: &NodeId) -> Vec<NodeId> {
        match node {
            NodeId::Host(mac) => self
                .hosts
                .get(mac)
                .map(|h| vec![NodeId::Switch(h.switch)])
                .unwrap_or_default(),
            NodeId::Switch(id) => {
                let switches = self
                    .links
                    .get(id)
                    .into_iter()
                    .flat_map(|edges| edges.keys().copied().map(NodeId::Switch));
                let hosts = self
                    .attached
                    .get(id)
                    .into_iter()
                    .flat_map(|macs| macs.iter().copied().map(NodeId::Host));
                switches.chain(hosts).collect()
            }
        }
    }

    /// Cost of traversing the directed edge `a -> b` under `mode`.
    ///
    /// Returns `None` when no such edge exists. Host attachment edges cost
    /// nothing in either mode.
    pub fn edge_weight(&self, a: &NodeId, b: &NodeId, mode: RoutingMode) -> Option<f64> {
        match (a, b) {
            (NodeId::Switch(src), NodeId::Switch(dst)) => {
                let attrs = self.link(*src, *dst)?;
                Some(match mode {
                    RoutingMode::HopCount => 1.0,
                    RoutingMode::BandwidthWeighted if attrs.bandwidth > 0.0 => {
                        1.0 / attrs.bandwidth
                    }
                    RoutingMode::BandwidthWeighted => self.policy.fallback_weight,
                })
            }
            (NodeId::Host(mac), NodeId::Switch(sw)) | (NodeId::Switch(sw), NodeId::Host(mac)) => {
                self.hosts
                    .get(mac)
                    .filter(|h| h.switch == *sw)
                    .map(|_| 0.0)
            }
            (NodeId::Host(_), NodeId::Host(_)) => None,
        }
    }

    /// Port on `switch` that leads to the adjacent node `next`
    pub fn egress_port(&self, switch: SwitchId, next: &NodeId) -> Option<PortNo> {
        match next {
            NodeId::Switch(dst) => self.link(switch, *dst)?.egress_port,
            NodeId::Host(mac) => self
                .hosts
                .get(mac)
                .filter(|h| h.switch == switch)
                .map(|h| h.port),
        }
    }

    pub fn summary(&self) -> TopologySummary {
        let links = self
            .links
            .iter()
            .flat_map(|(src, edges)| {
                edges.iter().map(move |(dst, attrs)| LinkView {
                    src: *src,
                    dst: *dst,
                    attrs: *attrs,
                })
            })
            .collect();

        TopologySummary {
            switches: self.switches.iter().copied().collect(),
            links,
            hosts: self.hosts.values().cloned().collect(),
        }
    }
}
