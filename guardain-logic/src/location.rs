use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bearing::{Bearing, bearing};

/// A "part" of a location
pub type LocationComponent = f64;

const EARTH_RADIUS_KM: f64 = 6371.0;
const EARTH_RADIUS_MILES: f64 = 3959.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Some location in the world as gotten from a Geolocation API
pub struct Location {
    /// Latitude
    pub lat: LocationComponent,
    /// Longitude
    pub long: LocationComponent,
}

impl Location {
    pub const fn new(lat: LocationComponent, long: LocationComponent) -> Self {
        Self { lat, long }
    }

    /// Initial great-circle bearing from this location towards `target`
    pub fn bearing_to(&self, target: &Location) -> Bearing {
        Bearing::from_degrees(bearing(self.lat, self.long, target.lat, target.long))
    }

    /// Central angle between two points using the haversine formula, in radians
    fn central_angle(&self, other: &Location) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.long - self.long).to_radians();

        let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * a.sqrt().atan2((1.0 - a).sqrt())
    }

    pub fn distance_km(&self, other: &Location) -> f64 {
        EARTH_RADIUS_KM * self.central_angle(other)
    }

    pub fn distance_miles(&self, other: &Location) -> f64 {
        EARTH_RADIUS_MILES * self.central_angle(other)
    }

    /// Naive coordinate average, only meaningful for nearby points
    pub fn midpoint(&self, other: &Location) -> Location {
        Location::new((self.lat + other.lat) / 2.0, (self.long + other.long) / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user refused to share their location, this is terminal until they change it
    #[error("Location permission was denied")]
    PermissionDenied,
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

pub trait LocationService: Send + Sync {
    /// Request a single position fix
    fn get_loc(&self) -> impl Future<Output = Result<Location, LocationError>> + Send;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A police station with its distance from whoever looked it up
pub struct PoliceStation {
    pub name: String,
    pub location: Location,
    pub distance_km: f64,
}

impl PoliceStation {
    /// Pick the candidate closest to `origin`
    pub fn nearest(
        origin: Location,
        candidates: impl IntoIterator<Item = (String, Location)>,
    ) -> Option<Self> {
        candidates
            .into_iter()
            .map(|(name, location)| Self {
                distance_km: origin.distance_km(&location),
                name,
                location,
            })
            .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_degree_latitude() {
        let a = Location::new(35.0, 139.0);
        let b = Location::new(36.0, 139.0);
        let km = a.distance_km(&b);
        assert!((km - 111.19).abs() < 0.1, "Got {km}");
        let miles = a.distance_miles(&b);
        assert!((miles - 69.1).abs() < 0.1, "Got {miles}");
    }

    #[test]
    fn test_distance_to_self() {
        let a = Location::new(52.2, 0.12);
        assert_eq!(a.distance_km(&a), 0.0);
    }

    #[test]
    fn test_bearing_to() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(0.0, 90.0);
        assert!((a.bearing_to(&b).degrees() - 90.0).abs() < 1e-9);
        assert!((b.bearing_to(&a).degrees() - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_station() {
        let origin = Location::new(52.2053, 0.1218);
        let candidates = vec![
            ("Far".to_string(), Location::new(52.5, 0.5)),
            ("Parkside".to_string(), Location::new(52.2024, 0.1319)),
            ("Middle".to_string(), Location::new(52.3, 0.2)),
        ];
        let station = PoliceStation::nearest(origin, candidates).expect("No station");
        assert_eq!(station.name, "Parkside");
        assert!(station.distance_km < 1.0);
    }

    #[test]
    fn test_nearest_station_empty() {
        assert!(PoliceStation::nearest(Location::new(0.0, 0.0), vec![]).is_none());
    }
}
