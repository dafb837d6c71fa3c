//! Event ingestion.
//!
//! A single loop drains the inbound event queue and applies each event to
//! the topology store under the store lock, in arrival order. One event
//! is one store mutation; a bad event is logged and dropped.

use std::net::IpAddr;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{mpsc, Notify};

use super::types::{EventError, TopologyEvent};
use crate::topology::{Change, MacAddr, PortNo, SharedTopology, SwitchId};

/// Counters reported when the ingestion loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub applied: usize,
    pub unchanged: usize,
    pub discarded: usize,
}

#[derive(Clone)]
pub struct EventIngestor {
    store: SharedTopology,
    on_change: Option<Arc<Notify>>,
}

impl EventIngestor {
    pub fn new(store: SharedTopology) -> Self {
        Self {
            store,
            on_change: None,
        }
    }

    /// Signal `notify` after every event that changed the graph
    pub fn with_change_signal(mut self, notify: Arc<Notify>) -> Self {
        self.on_change = Some(notify);
        self
    }

    pub async fn on_switch_joined(&self, id: SwitchId) -> Result<Change, EventError> {
        let change = self.store.lock().await.add_switch(id);
        if change.is_change() {
            info!("Switch enter: {}", id);
        }
        Ok(change)
    }

    pub async fn on_link_added(
        &self,
        src: SwitchId,
        dst: SwitchId,
        bandwidth: Option<f64>,
        src_port: Option<PortNo>,
        dst_port: Option<PortNo>,
    ) -> Result<Change, EventError> {
        let change = self
            .store
            .lock()
            .await
            .add_link_with_ports(src, dst, bandwidth, src_port, dst_port)?;
        if change.is_change() {
            info!(
                "Link added: {} <-> {} bw={} ports={:?}/{:?}",
                src,
                dst,
                bandwidth.map_or_else(|| "default".to_string(), |bw| bw.to_string()),
                src_port,
                dst_port
            );
        }
        Ok(change)
    }

    pub async fn on_host_added(
        &self,
        mac: MacAddr,
        switch_id: Option<SwitchId>,
        port: Option<PortNo>,
        address: Option<IpAddr>,
    ) -> Result<Change, EventError> {
        let attachment = switch_id.zip(port);
        let change = self.store.lock().await.add_host(mac, attachment, address);
        match change {
            Change::Skipped => Err(EventError::MissingAttachment { mac }),
            change => {
                if change.is_change() {
                    if let Some((switch, port)) = attachment {
                        info!(
                            "Host added: {} at {}:{} ip={}",
                            mac,
                            switch,
                            port,
                            address.map_or_else(|| "none".to_string(), |ip| ip.to_string())
                        );
                    }
                }
                Ok(change)
            }
        }
    }

    /// Route an event to its handler
    pub async fn apply(&self, event: TopologyEvent) -> Result<Change, EventError> {
        match event {
            TopologyEvent::SwitchJoined { id } => self.on_switch_joined(id).await,
            TopologyEvent::LinkAdded {
                src,
                dst,
                bandwidth,
                src_port,
                dst_port,
            } => {
                self.on_link_added(src, dst, bandwidth, src_port, dst_port)
                    .await
            }
            TopologyEvent::HostAdded {
                mac,
                switch_id,
                port,
                address,
            } => self.on_host_added(mac, switch_id, port, address).await,
        }
    }

    /// Apply one event, logging and discarding it on failure
    pub async fn handle(&self, event: TopologyEvent, stats: &mut IngestStats) {
        let kind = event.kind();
        match self.apply(event).await {
            Ok(change) if change.is_change() => {
                stats.applied += 1;
                if let Some(notify) = &self.on_change {
                    notify.notify_one();
                }
            }
            Ok(_) => {
                stats.unchanged += 1;
                debug!("{} event changed nothing", kind);
            }
            Err(err) => {
                stats.discarded += 1;
                warn!("Discarding {} event: {}", kind, err);
            }
        }
    }

    /// Drain `rx` until every sender is dropped
    pub async fn run(self, mut rx: mpsc::Receiver<TopologyEvent>) -> IngestStats {
        let mut stats = IngestStats::default();
        while let Some(event) = rx.recv().await {
            self.handle(event, &mut stats).await;
        }
        info!(
            "Event ingestion stopped: {} applied, {} unchanged, {} discarded",
            stats.applied, stats.unchanged, stats.discarded
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{shared, NodeId, TopologyStore};

    fn mac(last: u8) -> MacAddr {
        MacAddr([0, 0, 0, 0, 0, last])
    }

    #[tokio::test]
    async fn test_run_applies_events_in_order() {
        let store = shared(TopologyStore::default());
        let ingestor = EventIngestor::new(store.clone());
        let (tx, rx) = mpsc::channel(16);

        let events = vec![
            TopologyEvent::SwitchJoined { id: 1 },
            TopologyEvent::LinkAdded {
                src: 1,
                dst: 2,
                bandwidth: Some(50.0),
                src_port: Some(2),
                dst_port: Some(1),
            },
            TopologyEvent::LinkAdded {
                src: 2,
                dst: 1,
                bandwidth: Some(10.0),
                src_port: None,
                dst_port: None,
            },
            TopologyEvent::HostAdded {
                mac: mac(1),
                switch_id: Some(1),
                port: Some(1),
                address: None,
            },
        ];
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        let stats = ingestor.run(rx).await;
        assert_eq!(stats.applied, 4);
        assert_eq!(stats.discarded, 0);

        let store = store.lock().await;
        // the later announcement wins on both directions
        assert_eq!(store.link(1, 2).unwrap().bandwidth, 10.0);
        assert_eq!(store.link(2, 1).unwrap().bandwidth, 10.0);
        assert_eq!(store.egress_port(1, &NodeId::Switch(2)), Some(2));
        assert_eq!(store.host_count(), 1);
    }

    #[tokio::test]
    async fn test_incomplete_and_malformed_events_are_discarded() {
        let store = shared(TopologyStore::default());
        let ingestor = EventIngestor::new(store.clone());
        let mut stats = IngestStats::default();

        let host_without_port = TopologyEvent::HostAdded {
            mac: mac(2),
            switch_id: Some(1),
            port: None,
            address: None,
        };
        assert_eq!(
            ingestor.apply(host_without_port.clone()).await,
            Err(EventError::MissingAttachment { mac: mac(2) })
        );
        ingestor.handle(host_without_port, &mut stats).await;
        ingestor
            .handle(
                TopologyEvent::LinkAdded {
                    src: 4,
                    dst: 4,
                    bandwidth: None,
                    src_port: None,
                    dst_port: None,
                },
                &mut stats,
            )
            .await;

        assert_eq!(stats.discarded, 2);
        let store = store.lock().await;
        assert_eq!(store.host_count(), 0);
        assert_eq!(store.switch_count(), 0);
    }

    #[tokio::test]
    async fn test_change_signal_only_fires_on_change() {
        let store = shared(TopologyStore::default());
        let notify = Arc::new(Notify::new());
        let ingestor = EventIngestor::new(store).with_change_signal(notify.clone());
        let mut stats = IngestStats::default();

        ingestor
            .handle(TopologyEvent::SwitchJoined { id: 7 }, &mut stats)
            .await;
        // permit stored by notify_one
        tokio::time::timeout(std::time::Duration::from_secs(1), notify.notified())
            .await
            .unwrap();

        ingestor
            .handle(TopologyEvent::SwitchJoined { id: 7 }, &mut stats)
            .await;
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.unchanged, 1);
        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(50), notify.notified()).await;
        assert!(pending.is_err());
    }
}
