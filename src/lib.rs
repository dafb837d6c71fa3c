//! # sdn-router - Proactive routing controller for software-defined networks
//!
//! This library holds the control-plane logic of an SDN routing
//! controller: it keeps a live model of the network topology, computes a
//! path between every pair of known hosts under a selectable routing
//! policy, and turns those paths into per-switch forwarding rules.
//!
//! ## Overview
//!
//! Topology notifications (switch joined, link added, host discovered)
//! arrive on an event queue and are applied, in order, to a single
//! lock-guarded topology store. Whenever the routing mode or the topology
//! changes, the controller snapshots the store, runs Dijkstra from every
//! host, and dispatches the resulting flow rules through a southbound sink.
//!
//! ## Key Features
//!
//! - **Two routing modes**: bandwidth-weighted (`1 / bandwidth` per link)
//!   or hop-count
//! - **Deterministic paths**: equal-cost ties always resolve the same way
//! - **Real egress ports**: resolved from link and host attachment metadata
//! - **Proactive full-mesh installation** in both directions per host pair
//! - **REST control surface** compatible with the original controller
//! - **GML seeding** of a known topology at startup
//!
//! ## Architecture
//!
//! - `topology`: identifiers, the topology store and the GML seed loader
//! - `events`: topology event shapes and the ingestion loop
//! - `routing`: routing mode and the path computation engine
//! - `flows`: path-to-rule translation and southbound sinks
//! - `controller`: mode state machine and recomputation
//! - `api`: northbound HTTP routes
//! - `config` / `config_loader`: YAML configuration and CLI overrides
//! - `orchestrator`: wiring and background task startup
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use sdn_router::{config_loader, orchestrator};
//!
//! # async fn run() -> color_eyre::Result<()> {
//! let config = config_loader::load_config("controller.yaml".as_ref())?;
//! let southbound = orchestrator::build_southbound(&config)?;
//! let app = orchestrator::start(&config, southbound).await?;
//!
//! let router = sdn_router::api::router(app.api_state());
//! let listener = tokio::net::TcpListener::bind(config.controller.listen).await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! controller:
//!   listen: "0.0.0.0:8080"
//!   initial_mode: dijkstra_bw     # or shortest_hops
//! routing:
//!   default_bandwidth: 100.0
//!   fallback_weight: 1.0
//!   reinstall_on_topology_change: true
//!   reconcile_delay: 200ms
//! flows:
//!   priority: 100
//!   sink_file: flows.jsonl        # optional
//! topology:
//!   seed: topologies/nsfnet.gml   # optional
//!   event_queue_capacity: 1024
//! ```
//!
//! ## Error Handling
//!
//! Component errors are `thiserror` enums; application plumbing returns
//! `color_eyre::Result`. Nothing in the routing core terminates the
//! process: bad events are discarded, unreachable pairs are left out,
//! unresolvable hops are skipped, and failed dispatches are logged.

pub mod api;
pub mod config;
pub mod config_loader;
pub mod controller;
pub mod events;
pub mod flows;
pub mod orchestrator;
pub mod routing;
pub mod topology;
