use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    UtcDT,
    bearing::{Bearing, CompassPoint},
    indicator::DirectionIndicator,
    location::{Location, LocationService, PoliceStation},
    prelude::*,
    threat::ThreatReport,
};

/// Notified whenever the dashboard state changes so the view can re-render
pub trait StateUpdateSender: Send + Sync {
    fn send_update(&self);
}

/// The aggregation service the dashboard pulls its data from
pub trait SafetyApi: Send + Sync {
    /// Current threat level at a location
    fn threat_report(
        &self,
        at: Location,
        now: UtcDT,
    ) -> impl Future<Output = Result<ThreatReport>> + Send;
    /// Closest police station to a location, if any are known
    fn nearest_station(
        &self,
        at: Location,
    ) -> impl Future<Output = Result<Option<PoliceStation>>> + Send;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationDirections {
    pub station: PoliceStation,
    pub bearing: Bearing,
    pub compass_point: CompassPoint,
}

impl StationDirections {
    pub fn new(from: Location, station: PoliceStation) -> Self {
        let bearing = from.bearing_to(&station.location);
        Self {
            compass_point: bearing.compass_point(),
            bearing,
            station,
        }
    }

    /// An arrow pointing at the station, ready to be fed headings
    pub fn indicator(&self) -> DirectionIndicator {
        DirectionIndicator::new(self.bearing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyOverview {
    pub location: Location,
    pub threat: ThreatReport,
    pub station: Option<StationDirections>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DashboardState {
    Locating,
    /// Location was denied or couldn't be found, nothing else is fetched
    NoPermission,
    Failed(String),
    Ready(Box<SafetyOverview>),
}

/// Drives the main safety screen: location fix, threat level and nearest station
pub struct Dashboard<L: LocationService, A: SafetyApi, U: StateUpdateSender> {
    location: L,
    api: A,
    updates: U,
    state: RwLock<DashboardState>,
}

impl<L: LocationService, A: SafetyApi, U: StateUpdateSender> Dashboard<L, A, U> {
    pub fn new(location: L, api: A, updates: U) -> Self {
        Self {
            location,
            api,
            updates,
            state: RwLock::new(DashboardState::Locating),
        }
    }

    pub async fn state(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    async fn set_state(&self, state: DashboardState) {
        *self.state.write().await = state;
        self.updates.send_update();
    }

    async fn load(&self, at: Location, now: UtcDT) -> Result<SafetyOverview> {
        let (threat, station) =
            tokio::join!(self.api.threat_report(at, now), self.api.nearest_station(at));

        Ok(SafetyOverview {
            location: at,
            threat: threat.context("Failed to get threat level")?,
            station: station
                .context("Failed to find nearest police station")?
                .map(|station| StationDirections::new(at, station)),
        })
    }

    /// Fetch everything again. Once location access has been refused this does nothing.
    pub async fn refresh(&self, now: UtcDT) -> DashboardState {
        if *self.state.read().await == DashboardState::NoPermission {
            return DashboardState::NoPermission;
        }

        self.set_state(DashboardState::Locating).await;

        let next = match self.location.get_loc().await {
            Err(why) => {
                info!("No location, giving up: {why}");
                DashboardState::NoPermission
            }
            Ok(at) => match self.load(at, now).await {
                Ok(overview) => DashboardState::Ready(Box::new(overview)),
                Err(why) => {
                    error!("Failed to load dashboard: {why:?}");
                    DashboardState::Failed(format!("{why:#}"))
                }
            },
        };

        self.set_state(next.clone()).await;
        next
    }

    /// Indicator for the nearest station once the dashboard is ready
    pub async fn compass(&self) -> Option<DirectionIndicator> {
        match &*self.state.read().await {
            DashboardState::Ready(overview) => overview.station.as_ref().map(|s| s.indicator()),
            _ => None,
        }
    }
}
