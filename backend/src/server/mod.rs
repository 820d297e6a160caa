//! Server construction and middleware wiring.

mod config;
mod sweeper;

pub use config::ServerConfig;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::DefaultClock;

use ridepool::Trace;
use ridepool::domain::ports::{TripCommand, TripQuery};
use ridepool::domain::{TripService, TripServicePorts};
use ridepool::inbound::http::configure_api;
use ridepool::inbound::http::health::{HealthState, live, ready};
use ridepool::inbound::http::state::HttpState;
use ridepool::outbound::directory::InMemoryDirectory;
use ridepool::outbound::persistence::InMemoryTripRepository;

use std::sync::Arc;

/// Wire the trip service to the in-memory adapters.
fn build_trip_service(config: &mut ServerConfig) -> Arc<TripService<InMemoryTripRepository>> {
    let directory = Arc::new(config.directory.take().unwrap_or_default());
    let ports = TripServicePorts {
        trips: Arc::new(InMemoryTripRepository::new()),
        patients: directory.clone(),
        vehicles: directory.clone(),
        drivers: directory.clone(),
        companions: directory,
    };
    Arc::new(TripService::new(
        ports,
        Arc::new(DefaultClock),
        config.response_window,
    ))
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;

    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(web::scope("/api/v1").configure(configure_api))
        .service(ready)
        .service(live)
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// When the configuration carries a sweep interval, the expiry sweep is
/// spawned on the current runtime before the listener starts.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket or starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    mut config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let service = build_trip_service(&mut config);
    let command: Arc<dyn TripCommand> = service.clone();
    let query: Arc<dyn TripQuery> = service;
    let http_state = web::Data::new(HttpState::new(command.clone(), query));

    if let Some(period) = config.sweep_interval {
        sweeper::spawn_expiry_sweep(command, period);
    }

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
        })
    })
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
