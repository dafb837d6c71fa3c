use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::{error, info};
use std::net::SocketAddr;
use std::path::PathBuf;

use sdn_router::config_loader::{self, CliOverrides};
use sdn_router::routing::RoutingMode;
use sdn_router::{api, orchestrator};

/// Proactive SDN routing controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the controller configuration YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address for the northbound HTTP API (overrides the config file)
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Initial routing mode: dijkstra_bw or shortest_hops
    #[arg(long)]
    mode: Option<RoutingMode>,

    /// GML topology seed (overrides the config file)
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print routes and flow rules for the seed topology, then exit
    #[arg(long)]
    print_routes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&args.log_level)).init();

    info!("Starting sdn-router");

    let mut config = config_loader::load_or_default(args.config.as_deref())?;
    let overrides = CliOverrides {
        listen: args.listen,
        mode: args.mode,
        seed: args.seed.clone(),
    };
    config_loader::apply_overrides(&mut config, &overrides)?;

    if args.print_routes {
        let preview = orchestrator::preview(&config, config.controller.initial_mode).await?;
        let json = serde_json::to_string_pretty(&preview).wrap_err("Failed to encode routes")?;
        println!("{}", json);
        return Ok(());
    }

    let southbound = orchestrator::build_southbound(&config)?;
    let app = orchestrator::start(&config, southbound).await?;

    let listener = tokio::net::TcpListener::bind(config.controller.listen)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", config.controller.listen))?;
    info!("Northbound API listening on {}", config.controller.listen);

    let served = axum::serve(listener, api::router(app.api_state()))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    app.shutdown().await;
    served.wrap_err("HTTP server failed")?;

    info!("sdn-router stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(err) => error!("Failed to listen for Ctrl-C: {}", err),
    }
}
