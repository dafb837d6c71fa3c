use crate::config::Config;
use crate::routing::RoutingMode;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open config file '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse config file '{}'", config_path.display()))?;

    config.validate()?;

    Ok(config)
}

/// Load the configuration file if one was given, otherwise use defaults
pub fn load_or_default(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => load_config(path),
        None => {
            info!("No configuration file given, using defaults");
            Ok(Config::default())
        }
    }
}

/// CLI arguments that override YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub listen: Option<SocketAddr>,
    pub mode: Option<RoutingMode>,
    pub seed: Option<PathBuf>,
}

/// Apply CLI overrides to a loaded configuration
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    if let Some(listen) = overrides.listen {
        info!("Listen address overridden from command line: {}", listen);
        config.controller.listen = listen;
    }

    if let Some(mode) = overrides.mode {
        info!("Initial routing mode overridden from command line: {}", mode);
        config.controller.initial_mode = mode;
    }

    if let Some(seed) = &overrides.seed {
        info!("Topology seed overridden from command line: {:?}", seed);
        config.topology.seed = Some(seed.clone());
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}
