//! Network topology module.
//!
//! This module contains the topology store that owns the routing graph,
//! the identifier types it is built from, and the GML seed loader.

pub mod gml;
pub mod store;
pub mod types;

use std::sync::Arc;

use tokio::sync::Mutex;

// Re-export key types for easier access
pub use store::{Change, TopologyError, TopologyStore, TopologySummary, WeightPolicy};
pub use types::{Host, LinkAttrs, MacAddr, NodeId, PortNo, SwitchId};

/// The single lock every mutation and every computation snapshot goes through
pub type SharedTopology = Arc<Mutex<TopologyStore>>;

/// Wrap a store for sharing between ingestion and the controller
pub fn shared(store: TopologyStore) -> SharedTopology {
    Arc::new(Mutex::new(store))
}
