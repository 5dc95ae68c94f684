use std::sync::Arc;

use guardain_logic::prelude::*;
use guardain_transport::{PoliceClient, RoutingClient, WeatherClient, build_client};
use log::{info, warn};

/// Upstream services every request handler can reach
pub struct Services {
    pub police: PoliceClient,
    pub weather: WeatherClient,
    pub routing: RoutingClient,
}

#[derive(Clone)]
pub struct AppState(Arc<Services>);

impl AppState {
    /// Build clients from the environment, `OPENROUTE_API_KEY` enables real routing
    pub fn from_env() -> Result<Self> {
        let client = build_client()?;
        let routing = RoutingClient::from_env(client.clone());
        if routing.has_key() {
            info!("OpenRouteService key found, using real routing");
        } else {
            warn!("OPENROUTE_API_KEY not set, routes will be direct estimates");
        }

        Ok(Self(Arc::new(Services {
            police: PoliceClient::new(client.clone()),
            weather: WeatherClient::new(client),
            routing,
        })))
    }
}

impl std::ops::Deref for AppState {
    type Target = Services;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
