mod auth;
mod command;
mod config;
mod server;
mod vehicle;

use anyhow::{Context, Result};
use command::{Dispatcher, COMMANDS};
use config::{find_config_file, ConfigWatcher, LiveConfig, Settings};
use server::RelayServer;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use vehicle::{SimulatedConnector, VehicleConnector};

use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    if let Err(e) = run().await {
        error!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = find_config_file(std::env::args_os().nth(1).map(PathBuf::from))?;
    let settings = Settings::load(&path).await?;

    info!("Vehicle relay starting");
    info!("  Config: {}", path.display());
    info!("  Listen: {}", settings.listen_address());
    info!(
        "  Retries: {} ({}ms apart), metric: {}",
        settings.retries, settings.retry_delay_ms, settings.metric
    );

    let live = LiveConfig::new(settings);
    let settings = live.snapshot().await;
    info!("  Tokens: {}", settings.auth_tokens.len());

    // Spawn config watcher
    let watcher = ConfigWatcher::new(path, live.clone());
    tokio::spawn(async move {
        watcher.run().await;
    });

    let connector = SimulatedConnector::new(settings.simulated_vehicles);
    let vehicles = connector
        .connect(&settings.credentials)
        .await
        .with_context(|| format!("{} login failed", connector.name()))?;
    for (index, vehicle) in vehicles.iter().enumerate() {
        info!("  Vehicle {}: {}", index, vehicle.display_name());
    }
    for descriptor in COMMANDS {
        debug!("  Route POST {}", descriptor.pattern());
    }

    let address = settings.listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    let dispatcher = Arc::new(Dispatcher::new(live, vehicles));
    RelayServer::new(dispatcher)
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}
