//! Controller orchestrator.
//!
//! Wires the topology store, event ingestion, controller and southbound
//! sink together from a [`Config`], replays the GML seed, and starts the
//! background tasks. The HTTP listener is left to the caller.

use std::sync::Arc;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{error, info};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::api::ApiState;
use crate::config::Config;
use crate::controller::{Controller, RoutingStatus};
use crate::events::{event_queue, EventIngestor, EventSender, IngestStats};
use crate::flows::{FlowInstaller, FlowPlan, JsonLinesSouthbound, LoggingSouthbound, Southbound};
use crate::routing::{compute_all_pairs, RoutingMode};
use crate::topology::{gml, shared, SharedTopology, TopologyStore};

/// A running controller and handles to its background tasks
pub struct ControllerApp {
    pub controller: Arc<Controller>,
    pub events: EventSender,
    ingest: JoinHandle<IngestStats>,
    reconcile: Option<JoinHandle<()>>,
}

impl ControllerApp {
    /// State for [`crate::api::router`]
    pub fn api_state(&self) -> ApiState {
        ApiState {
            controller: Arc::clone(&self.controller),
            events: self.events.clone(),
        }
    }

    /// Stop background tasks. Ingestion drains what is already queued.
    pub async fn shutdown(self) {
        let Self {
            events,
            ingest,
            reconcile,
            ..
        } = self;
        if let Some(reconcile) = reconcile {
            reconcile.abort();
        }
        drop(events);
        match ingest.await {
            Ok(stats) => info!("Ingestion finished with {:?}", stats),
            Err(err) => error!("Ingestion task failed: {}", err),
        }
    }
}

/// Pick the southbound sink named by the configuration
pub fn build_southbound(config: &Config) -> Result<Arc<dyn Southbound>> {
    match &config.flows.sink_file {
        Some(path) => {
            let sink = JsonLinesSouthbound::open(path)
                .wrap_err_with(|| format!("Failed to open flow sink '{}'", path.display()))?;
            info!("Dispatching flow rules to {}", path.display());
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(LoggingSouthbound)),
    }
}

/// Apply the configured GML seed, if any, straight through the ingestion handlers
async fn replay_seed(config: &Config, ingestor: &EventIngestor) -> Result<IngestStats> {
    let mut stats = IngestStats::default();
    if let Some(path) = &config.topology.seed {
        for event in gml::load_seed(path)? {
            ingestor.handle(event, &mut stats).await;
        }
        info!(
            "Seed applied: {} events applied, {} discarded",
            stats.applied, stats.discarded
        );
    }
    Ok(stats)
}

/// Build every component and start ingestion and reconciliation.
///
/// The seed is applied before the event queue opens, so live events always
/// land after it. Routes are computed and installed once before returning.
pub async fn start(config: &Config, southbound: Arc<dyn Southbound>) -> Result<ControllerApp> {
    let topology: SharedTopology = shared(TopologyStore::new(config.weight_policy()));
    let installer = FlowInstaller::new(southbound, config.flows.priority);
    let controller = Arc::new(Controller::new(
        topology.clone(),
        installer,
        config.controller.initial_mode,
    ));

    let mut ingestor = EventIngestor::new(topology);
    replay_seed(config, &ingestor).await?;
    controller.reconcile().await;

    let changed = Arc::new(Notify::new());
    if config.routing.reinstall_on_topology_change {
        ingestor = ingestor.with_change_signal(Arc::clone(&changed));
    }

    let (events, rx) = event_queue(config.topology.event_queue_capacity);
    let ingest = tokio::spawn(ingestor.run(rx));
    let reconcile = config.routing.reinstall_on_topology_change.then(|| {
        tokio::spawn(
            Arc::clone(&controller).run_reconciler(changed, config.routing.reconcile_delay),
        )
    });

    info!(
        "Controller started in {} mode (reinstall on topology change: {})",
        config.controller.initial_mode, config.routing.reinstall_on_topology_change
    );

    Ok(ControllerApp {
        controller,
        events,
        ingest,
        reconcile,
    })
}

/// Routes and flow rules for the seed topology, computed without serving
#[derive(Debug, Serialize)]
pub struct Preview {
    #[serde(flatten)]
    pub status: RoutingStatus,
    pub flows: FlowPlan,
}

/// Compute routes and the flow plan for the configured seed and mode
pub async fn preview(config: &Config, mode: RoutingMode) -> Result<Preview> {
    let topology = shared(TopologyStore::new(config.weight_policy()));
    let ingestor = EventIngestor::new(topology.clone());
    replay_seed(config, &ingestor).await?;

    let snapshot = topology.lock().await.clone();
    let routes = compute_all_pairs(&snapshot, mode);
    let installer = FlowInstaller::new(Arc::new(LoggingSouthbound), config.flows.priority);
    let flows = installer.plan(&snapshot, &routes);

    Ok(Preview {
        status: RoutingStatus { mode, routes },
        flows,
    })
}
