#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sdn_router::config::Config;
use sdn_router::controller::Controller;
use sdn_router::flows::{FlowError, FlowInstaller, FlowRule, Southbound};
use sdn_router::orchestrator::{self, ControllerApp};
use sdn_router::routing::RoutingMode;
use sdn_router::topology::{shared, MacAddr, TopologyStore};

/// Southbound sink that keeps every rule it receives
#[derive(Default)]
pub struct Recorder {
    rules: Mutex<Vec<FlowRule>>,
}

impl Recorder {
    pub fn rules(&self) -> Vec<FlowRule> {
        self.rules.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.rules.lock().unwrap().clear();
    }
}

impl Southbound for Recorder {
    fn send_flow_rule(&self, rule: &FlowRule) -> Result<(), FlowError> {
        self.rules.lock().unwrap().push(rule.clone());
        Ok(())
    }
}

pub fn mac(last: u8) -> MacAddr {
    MacAddr([0, 0, 0, 0, 0, last])
}

/// Controller over a fixed store, dispatching into a recorder
pub fn controller_with(store: TopologyStore, mode: RoutingMode) -> (Controller, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let installer = FlowInstaller::new(recorder.clone(), 100);
    (Controller::new(shared(store), installer, mode), recorder)
}

/// S1-S2 bw 50, S2-S3 bw 10, S1-S3 bw 10; H1 on S1, H2 on S3
pub fn triangle() -> TopologyStore {
    let mut topo = TopologyStore::default();
    topo.add_link_with_ports(1, 2, Some(50.0), Some(2), Some(2)).unwrap();
    topo.add_link_with_ports(2, 3, Some(10.0), Some(3), Some(2)).unwrap();
    topo.add_link_with_ports(1, 3, Some(10.0), Some(3), Some(3)).unwrap();
    topo.add_host(mac(1), Some((1, 1)), None);
    topo.add_host(mac(2), Some((3, 1)), None);
    topo
}

/// A full controller started from configuration with a recording sink
pub struct TestApp {
    pub app: ControllerApp,
    pub recorder: Arc<Recorder>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let recorder = Arc::new(Recorder::default());
        let app = orchestrator::start(&config, recorder.clone()).await.unwrap();
        Self { app, recorder }
    }

    pub async fn cleanup(self) {
        self.app.shutdown().await;
    }
}
