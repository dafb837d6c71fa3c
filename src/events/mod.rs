//! Topology events and their ingestion.
//!
//! Discovery (or the GML seed, or the HTTP ingress endpoint) pushes
//! [`TopologyEvent`]s onto a bounded queue; [`EventIngestor::run`] is the
//! only consumer and applies them to the topology store in order.

pub mod ingest;
pub mod types;

use tokio::sync::mpsc;

pub use ingest::{EventIngestor, IngestStats};
pub use types::{EventError, TopologyEvent};

/// Producer side of the inbound event queue
pub type EventSender = mpsc::Sender<TopologyEvent>;

/// Create the bounded inbound event queue
pub fn event_queue(capacity: usize) -> (EventSender, mpsc::Receiver<TopologyEvent>) {
    mpsc::channel(capacity)
}
