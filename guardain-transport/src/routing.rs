use futures::future::try_join_all;
use guardain_logic::{
    Location, RouteOption, RouteOptions, RouteSafety, TravelMode, decode_polyline, prelude::*,
};
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::police::PoliceClient;

const ORS_DIRECTIONS_URL: &str = "https://api.openrouteservice.org/v2/directions";
const MAX_ROUTES: usize = 3;

#[derive(Serialize)]
struct AlternativeRoutes {
    target_count: u8,
}

#[derive(Serialize)]
struct DirectionsRequest {
    /// `[long, lat]` pairs
    coordinates: [[f64; 2]; 2],
    alternative_routes: AlternativeRoutes,
    instructions: bool,
}

impl DirectionsRequest {
    fn new(start: Location, end: Location) -> Self {
        Self {
            coordinates: [[start.long, start.lat], [end.long, end.lat]],
            alternative_routes: AlternativeRoutes {
                target_count: MAX_ROUTES as u8,
            },
            instructions: false,
        }
    }
}

#[derive(Deserialize)]
struct RawSummary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Deserialize)]
struct RawRoute {
    geometry: String,
    summary: RawSummary,
}

#[derive(Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<RawRoute>,
}

impl DirectionsResponse {
    fn into_options(
        self,
        start: Location,
        end: Location,
        mode: TravelMode,
    ) -> Result<Vec<RouteOption>> {
        self.routes
            .into_iter()
            .take(MAX_ROUTES)
            .enumerate()
            .map(|(i, route)| {
                let geometry = decode_polyline(&route.geometry)
                    .with_context(|| format!("Bad geometry for route {}", i + 1))?;
                Ok(RouteOption::from_geometry(
                    i as u32 + 1,
                    mode,
                    route.summary.distance,
                    route.summary.duration,
                    &geometry,
                    start,
                    end,
                ))
            })
            .collect()
    }
}

/// Alternative routes from OpenRouteService, degrading to a straight line estimate
pub struct RoutingClient {
    client: Client,
    api_key: Option<String>,
}

impl RoutingClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Read the key from `OPENROUTE_API_KEY`
    pub fn from_env(client: Client) -> Self {
        Self::new(client, std::env::var("OPENROUTE_API_KEY").ok())
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(
        &self,
        key: &str,
        start: Location,
        end: Location,
        mode: TravelMode,
    ) -> Result<Vec<RouteOption>> {
        let url = format!("{ORS_DIRECTIONS_URL}/{}", mode.profile());
        debug!("POST {url}");
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, key)
            .json(&DirectionsRequest::new(start, end))
            .send()
            .await
            .context("Could not send request")?
            .error_for_status()
            .context("Routing service returned error")?
            .json::<DirectionsResponse>()
            .await
            .context("Failed to parse routes")?;

        let options = resp.into_options(start, end, mode)?;
        if options.is_empty() {
            bail!("Routing service found no routes");
        }
        Ok(options)
    }

    /// Up to three routes between two points. Never fails, any problem with the routing
    /// service yields a single direct route with a note saying why.
    pub async fn route_options(
        &self,
        start: Location,
        end: Location,
        mode: TravelMode,
    ) -> RouteOptions {
        let Some(key) = self.api_key.as_deref() else {
            return RouteOptions::direct(
                start,
                end,
                "Using estimated direct route. Set OPENROUTE_API_KEY for real routing.",
            );
        };

        match self.fetch(key, start, end, mode).await {
            Ok(routes) => RouteOptions { routes, note: None },
            Err(why) => {
                warn!("Routing failed, falling back to a direct route: {why:?}");
                RouteOptions::direct(start, end, format!("Using fallback routing: {why:#}"))
            }
        }
    }
}

/// Look up the crimes around every waypoint of a route and summarize them
pub async fn analyze_route(police: &PoliceClient, route: &RouteOption) -> Result<RouteSafety> {
    let crimes = try_join_all(route.waypoints.iter().map(|wp| police.street_crimes(*wp)))
        .await
        .with_context(|| format!("Failed to analyze route {}", route.route_id))?;
    Ok(RouteSafety::analyze(
        route.route_id,
        route.waypoints.iter().copied().zip(crimes),
    ))
}
