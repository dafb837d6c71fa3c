//! Path computation engine.
//!
//! Runs a binary-heap Dijkstra from every host and keeps the path to each
//! host with a larger MAC, giving one route per unordered host pair.
//! Sources are processed in parallel; the merged table is ordered, so
//! results do not depend on scheduling.
//!
//! Tie-breaking is deterministic: the heap pops `(cost, node)` in
//! ascending order, neighbors are visited in ascending order, and among
//! equal-cost predecessors the smaller `NodeId` wins. Hosts terminate
//! paths and are never used as transit nodes.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use log::{debug, warn};
use rayon::prelude::*;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::RoutingMode;
use crate::topology::{MacAddr, NodeId, TopologyStore};

/// A computed path between two hosts
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub src: MacAddr,
    pub dst: MacAddr,
    /// host, switch, ..., switch, host
    pub path: Vec<NodeId>,
    pub cost: f64,
}

impl Route {
    /// Switches strictly between the two host endpoints
    pub fn transit_switches(&self) -> impl Iterator<Item = &NodeId> {
        let inner = self.path.len().saturating_sub(2);
        self.path.iter().skip(1).take(inner)
    }

    /// Number of inter-switch links traversed
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(3)
    }
}

/// Routes keyed by `(lower MAC, higher MAC)`.
///
/// Serializes as the status map `{"host-<a>->host-<b>": [path...]}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    routes: BTreeMap<(MacAddr, MacAddr), Route>,
}

impl RouteTable {
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Look up the route for a pair in either order
    pub fn get(&self, a: MacAddr, b: MacAddr) -> Option<&Route> {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.routes.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    fn insert(&mut self, route: Route) {
        self.routes.insert((route.src, route.dst), route);
    }
}

impl Serialize for RouteTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.routes.len()))?;
        for route in self.routes.values() {
            let key = format!("{}->{}", NodeId::Host(route.src), NodeId::Host(route.dst));
            map.serialize_entry(&key, &route.path)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cost(f64);

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Single-source shortest paths from one host
struct ShortestPathTree {
    source: NodeId,
    dist: HashMap<NodeId, f64>,
    prev: HashMap<NodeId, NodeId>,
}

impl ShortestPathTree {
    fn build(topo: &TopologyStore, source: NodeId, mode: RoutingMode) -> Self {
        let mut dist = HashMap::new();
        let mut prev: HashMap<NodeId, NodeId> = HashMap::new();
        let mut settled = HashSet::new();
        let mut heap = BinaryHeap::new();

        dist.insert(source, 0.0);
        heap.push(Reverse((Cost(0.0), source)));

        while let Some(Reverse((Cost(cost), node))) = heap.pop() {
            if !settled.insert(node) {
                continue;
            }
            if node.is_host() && node != source {
                continue;
            }

            for next in topo.neighbors(&node) {
                if settled.contains(&next) {
                    continue;
                }
                let Some(weight) = topo.edge_weight(&node, &next, mode) else {
                    continue;
                };
                let candidate = cost + weight;
                match dist.get(&next).copied() {
                    Some(known) if candidate > known => {}
                    Some(known) if candidate == known => {
                        if prev.get(&next).map_or(true, |p| node < *p) {
                            prev.insert(next, node);
                        }
                    }
                    _ => {
                        dist.insert(next, candidate);
                        prev.insert(next, node);
                        heap.push(Reverse((Cost(candidate), next)));
                    }
                }
            }
        }

        Self { source, dist, prev }
    }

    fn path_to(&self, target: NodeId) -> Option<(Vec<NodeId>, f64)> {
        let cost = *self.dist.get(&target)?;
        let mut path = vec![target];
        let mut cursor = target;
        while cursor != self.source {
            cursor = *self.prev.get(&cursor)?;
            path.push(cursor);
        }
        path.reverse();
        Some((path, cost))
    }
}

/// Shortest route between two hosts, if they are connected
pub fn shortest_route(
    topo: &TopologyStore,
    src: MacAddr,
    dst: MacAddr,
    mode: RoutingMode,
) -> Option<Route> {
    if src == dst || topo.host(&src).is_none() || topo.host(&dst).is_none() {
        return None;
    }
    let tree = ShortestPathTree::build(topo, NodeId::Host(src), mode);
    let (path, cost) = tree.path_to(NodeId::Host(dst))?;
    Some(Route {
        src,
        dst,
        path,
        cost,
    })
}

/// Compute a route for every unordered pair of distinct known hosts.
///
/// Disconnected pairs are left out of the table and logged.
pub fn compute_all_pairs(topo: &TopologyStore, mode: RoutingMode) -> RouteTable {
    let hosts: Vec<MacAddr> = topo.all_hosts().map(|h| h.mac).collect();

    let per_source: Vec<Vec<Result<Route, (MacAddr, MacAddr)>>> = hosts
        .par_iter()
        .enumerate()
        .map(|(i, &src)| {
            let tree = ShortestPathTree::build(topo, NodeId::Host(src), mode);
            hosts[i + 1..]
                .iter()
                .map(|&dst| match tree.path_to(NodeId::Host(dst)) {
                    Some((path, cost)) => Ok(Route {
                        src,
                        dst,
                        path,
                        cost,
                    }),
                    None => Err((src, dst)),
                })
                .collect()
        })
        .collect();

    let mut table = RouteTable::default();
    let mut unreachable = 0usize;
    for result in per_source.into_iter().flatten() {
        match result {
            Ok(route) => table.insert(route),
            Err((src, dst)) => {
                unreachable += 1;
                warn!("No path host-{} -> host-{}", src, dst);
            }
        }
    }

    debug!(
        "Computed {} routes under {} ({} unreachable pairs)",
        table.len(),
        mode,
        unreachable
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddr {
        MacAddr([0, 0, 0, 0, 0, last])
    }

    /// S1-S2-S4 and S1-S3-S4 diamond, equal cost in both modes
    fn diamond() -> TopologyStore {
        let mut topo = TopologyStore::default();
        topo.add_link(1, 2, Some(10.0)).unwrap();
        topo.add_link(2, 4, Some(10.0)).unwrap();
        topo.add_link(1, 3, Some(10.0)).unwrap();
        topo.add_link(3, 4, Some(10.0)).unwrap();
        topo.add_host(mac(1), Some((1, 1)), None);
        topo.add_host(mac(2), Some((4, 1)), None);
        topo
    }

    #[test]
    fn test_equal_cost_paths_prefer_smaller_ids() {
        let topo = diamond();
        for mode in [RoutingMode::BandwidthWeighted, RoutingMode::HopCount] {
            let route = shortest_route(&topo, mac(1), mac(2), mode).unwrap();
            assert_eq!(
                route.path,
                vec![
                    NodeId::Host(mac(1)),
                    NodeId::Switch(1),
                    NodeId::Switch(2),
                    NodeId::Switch(4),
                    NodeId::Host(mac(2)),
                ]
            );
        }
    }

    #[test]
    fn test_hop_count_ignores_bandwidth() {
        let mut topo = TopologyStore::default();
        // direct but thin, versus two fat hops
        topo.add_link(1, 3, Some(1.0)).unwrap();
        topo.add_link(1, 2, Some(1000.0)).unwrap();
        topo.add_link(2, 3, Some(1000.0)).unwrap();
        topo.add_host(mac(1), Some((1, 1)), None);
        topo.add_host(mac(2), Some((3, 1)), None);

        let hops = shortest_route(&topo, mac(1), mac(2), RoutingMode::HopCount).unwrap();
        assert_eq!(hops.hop_count(), 1);
        assert_eq!(hops.cost, 1.0);

        let bw = shortest_route(&topo, mac(1), mac(2), RoutingMode::BandwidthWeighted).unwrap();
        assert_eq!(bw.hop_count(), 2);
        assert!((bw.cost - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_hosts_on_same_switch() {
        let mut topo = TopologyStore::default();
        topo.add_switch(1);
        topo.add_host(mac(1), Some((1, 1)), None);
        topo.add_host(mac(2), Some((1, 2)), None);

        let table = compute_all_pairs(&topo, RoutingMode::BandwidthWeighted);
        let route = table.get(mac(2), mac(1)).unwrap();
        assert_eq!(route.path.len(), 3);
        assert_eq!(route.cost, 0.0);
        assert_eq!(route.transit_switches().collect::<Vec<_>>(), vec![&NodeId::Switch(1)]);
    }

    #[test]
    fn test_hosts_are_not_transit_nodes() {
        let mut topo = TopologyStore::default();
        topo.add_switch(1);
        topo.add_switch(2);
        // no link between 1 and 2; a host cannot bridge them
        topo.add_host(mac(1), Some((1, 1)), None);
        topo.add_host(mac(2), Some((2, 1)), None);

        let table = compute_all_pairs(&topo, RoutingMode::HopCount);
        assert!(table.is_empty());
    }

    #[test]
    fn test_all_pairs_covers_every_connected_pair() {
        let mut topo = diamond();
        topo.add_host(mac(3), Some((2, 5)), None);

        let table = compute_all_pairs(&topo, RoutingMode::BandwidthWeighted);
        assert_eq!(table.len(), 3);
        for route in table.iter() {
            assert!(route.src < route.dst);
            assert_eq!(route.path.first(), Some(&NodeId::Host(route.src)));
            assert_eq!(route.path.last(), Some(&NodeId::Host(route.dst)));
        }
    }

    #[test]
    fn test_route_table_serializes_as_status_map() {
        let topo = diamond();
        let table = compute_all_pairs(&topo, RoutingMode::HopCount);
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(
            json["host-00:00:00:00:00:01->host-00:00:00:00:00:02"],
            serde_json::json!(["host-00:00:00:00:00:01", 1, 2, 4, "host-00:00:00:00:00:02"])
        );
    }

    #[test]
    fn test_unknown_or_identical_hosts_have_no_route() {
        let topo = diamond();
        assert!(shortest_route(&topo, mac(1), mac(1), RoutingMode::HopCount).is_none());
        assert!(shortest_route(&topo, mac(1), mac(9), RoutingMode::HopCount).is_none());
    }
}
