use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::routing::RoutingMode;
use crate::topology::WeightPolicy;

/// Controller configuration. Every section is optional.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub controller: ControllerConfig,
    pub routing: RoutingConfig,
    pub flows: FlowsConfig,
    pub topology: TopologyConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let routing = &self.routing;
        if !(routing.default_bandwidth.is_finite() && routing.default_bandwidth > 0.0) {
            return Err(ValidationError::InvalidRouting(format!(
                "default_bandwidth must be a positive number, got {}",
                routing.default_bandwidth
            )));
        }
        if !(routing.fallback_weight.is_finite() && routing.fallback_weight > 0.0) {
            return Err(ValidationError::InvalidRouting(format!(
                "fallback_weight must be a positive number, got {}",
                routing.fallback_weight
            )));
        }

        if self.topology.event_queue_capacity == 0 {
            return Err(ValidationError::InvalidTopology(
                "event_queue_capacity must be at least 1".to_string(),
            ));
        }
        if let Some(seed) = &self.topology.seed {
            if seed.as_os_str().is_empty() {
                return Err(ValidationError::InvalidTopology(
                    "seed path cannot be empty".to_string(),
                ));
            }
        }

        if let Some(sink) = &self.flows.sink_file {
            if sink.as_os_str().is_empty() {
                return Err(ValidationError::InvalidFlows(
                    "sink_file path cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Edge weight parameters for the topology store
    pub fn weight_policy(&self) -> WeightPolicy {
        WeightPolicy {
            default_bandwidth: self.routing.default_bandwidth,
            fallback_weight: self.routing.fallback_weight,
        }
    }
}

/// Northbound listener and startup mode
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    pub listen: SocketAddr,
    pub initial_mode: RoutingMode,
}

/// Path computation settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RoutingConfig {
    /// Bandwidth assumed for links announced without one
    pub default_bandwidth: f64,
    /// Weight of a zero-bandwidth link in bandwidth-weighted mode
    pub fallback_weight: f64,
    /// Recompute and reinstall routes whenever the topology changes
    pub reinstall_on_topology_change: bool,
    /// Quiet period after a topology change before recomputing
    #[serde(with = "humantime_serde")]
    pub reconcile_delay: Duration,
}

/// Flow rule settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FlowsConfig {
    pub priority: u16,
    /// Append dispatched rules as JSON lines to this file instead of only logging them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink_file: Option<PathBuf>,
}

/// Topology input settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TopologyConfig {
    /// GML file replayed through ingestion at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<PathBuf>,
    pub event_queue_capacity: usize,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid routing configuration: {0}")]
    InvalidRouting(String),
    #[error("Invalid topology configuration: {0}")]
    InvalidTopology(String),
    #[error("Invalid flows configuration: {0}")]
    InvalidFlows(String),
}

/// Default implementations
impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            initial_mode: RoutingMode::BandwidthWeighted,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        let policy = WeightPolicy::default();
        Self {
            default_bandwidth: policy.default_bandwidth,
            fallback_weight: policy.fallback_weight,
            reinstall_on_topology_change: true,
            reconcile_delay: Duration::ZERO,
        }
    }
}

impl Default for FlowsConfig {
    fn default() -> Self {
        Self {
            priority: 100,
            sink_file: None,
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            seed: None,
            event_queue_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let yaml = r#"
controller:
  listen: "127.0.0.1:9090"
  initial_mode: shortest_hops
routing:
  default_bandwidth: 1000
  fallback_weight: 2.5
  reinstall_on_topology_change: false
  reconcile_delay: 250ms
flows:
  priority: 200
  sink_file: /tmp/flows.jsonl
topology:
  seed: topologies/nsfnet.gml
  event_queue_capacity: 64
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.controller.listen.port(), 9090);
        assert_eq!(config.controller.initial_mode, RoutingMode::HopCount);
        assert_eq!(config.routing.default_bandwidth, 1000.0);
        assert_eq!(config.routing.reconcile_delay, Duration::from_millis(250));
        assert!(!config.routing.reinstall_on_topology_change);
        assert_eq!(config.flows.priority, 200);
        assert_eq!(config.topology.seed, Some(PathBuf::from("topologies/nsfnet.gml")));
        assert_eq!(config.weight_policy().fallback_weight, 2.5);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.controller.initial_mode, RoutingMode::BandwidthWeighted);
        assert_eq!(config.routing.default_bandwidth, 100.0);
        assert!(config.routing.reinstall_on_topology_change);
        assert_eq!(config.flows.priority, 100);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.routing.default_bandwidth = 0.0;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidRouting(_))));

        let mut config = Config::default();
        config.routing.fallback_weight = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.topology.event_queue_capacity = 0;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidTopology(_))));

        let mut config = Config::default();
        config.flows.sink_file = Some(PathBuf::new());
        assert!(matches!(config.validate(), Err(ValidationError::InvalidFlows(_))));
    }

    #[test]
    fn test_unknown_mode_and_fields_rejected() {
        let bad_mode = "controller:\n  initial_mode: fastest\n";
        assert!(serde_yaml::from_str::<Config>(bad_mode).is_err());

        let bad_field = "routing:\n  weight: 3\n";
        assert!(serde_yaml::from_str::<Config>(bad_field).is_err());
    }
}
