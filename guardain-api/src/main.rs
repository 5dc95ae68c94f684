mod handlers;
mod state;

use axum::{Router, routing::get};
use log::{debug, info};

use anyhow::Context;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    result::Result as StdResult,
};

use state::AppState;

type Result<T = (), E = anyhow::Error> = StdResult<T, E>;

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/threat", get(handlers::threat))
        .route("/api/police-station", get(handlers::police_station))
        .route("/api/crime-summary", get(handlers::crime_summary))
        .route("/api/hotspots", get(handlers::hotspots))
        .route("/api/crime-types", get(handlers::crime_types))
        .route("/api/time-periods", get(handlers::time_periods))
        .route("/api/weather", get(handlers::weather))
        .route("/api/time-context", get(handlers::time_context))
        .route("/api/routes", get(handlers::routes))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result {
    colog::init();

    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(why) => debug!("No .env loaded: {why}"),
    }

    let args = std::env::args().collect::<Vec<_>>();
    let socket_addr = args
        .get(1)
        .map(|raw_binding| raw_binding.parse::<SocketAddr>())
        .transpose()
        .context("Invalid socket addr passed")?
        .unwrap_or(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 3537));

    let state = AppState::from_env().context("Failed to set up upstream clients")?;

    let listener = tokio::net::TcpListener::bind(socket_addr)
        .await
        .with_context(|| format!("Failed to bind {socket_addr}"))?;

    info!(
        "Starting GuardAIn API {} on {socket_addr}",
        env!("CARGO_PKG_VERSION")
    );

    axum::serve(listener, router(state))
        .await
        .context("Error while running server")
}
