//! Service entry-point: loads settings, wires adapters and runs the HTTP server.

mod server;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use ridepool::inbound::http::health::HealthState;
use ridepool::outbound::directory::InMemoryDirectory;
use ridepool::settings::ServiceSettings;
use server::{ServerConfig, create_server};

fn build_server_config(settings: &ServiceSettings) -> std::io::Result<ServerConfig> {
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;
    let response_window = settings.response_window().map_err(std::io::Error::other)?;
    let mut config = ServerConfig::new(bind_addr, response_window)
        .with_sweep_interval(settings.expiry_sweep_interval());

    match settings.directory_seed_path() {
        Some(path) => {
            let directory = InMemoryDirectory::load(path).map_err(std::io::Error::other)?;
            config = config.with_directory(directory);
        }
        None => warn!("no directory seed configured; directories start empty"),
    }
    Ok(config)
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServiceSettings::load()
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;
    let config = build_server_config(&settings)?;
    info!(bind_addr = %config.bind_addr(), "starting trip service");

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    server.await
}
