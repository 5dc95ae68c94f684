use serde::{Deserialize, Serialize};

const FULL_TURN: f64 = 360.0;

/// Wrap any finite angle in degrees into `[0, 360)`
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees - (degrees / FULL_TURN).floor() * FULL_TURN;
    // The floor can land one turn off when the quotient rounds
    match wrapped {
        w if w < 0.0 => (w + FULL_TURN) % FULL_TURN,
        w if w >= FULL_TURN => w % FULL_TURN,
        w => w,
    }
}

/// Initial great-circle bearing from the observer to the target, in degrees clockwise from true
/// north.
///
/// Inputs are decimal degrees and are not validated, out of range values produce a defined but
/// meaningless result. The output is always in `[0, 360)` for finite inputs. Two identical
/// points yield `0`.
pub fn bearing(observer_lat: f64, observer_lon: f64, target_lat: f64, target_lon: f64) -> f64 {
    let phi1 = observer_lat.to_radians();
    let phi2 = target_lat.to_radians();
    let delta_lambda = (target_lon - observer_lon).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();
    let theta = y.atan2(x).to_degrees();

    (theta + FULL_TURN) % FULL_TURN
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "f64", from = "f64")]
/// A direction in degrees clockwise from true north, kept in `[0, 360)`
pub struct Bearing(f64);

impl Bearing {
    pub fn from_degrees(degrees: f64) -> Self {
        Self(normalize_degrees(degrees))
    }

    pub fn degrees(self) -> f64 {
        self.0
    }

    pub fn compass_point(self) -> CompassPoint {
        CompassPoint::from_degrees(self.0)
    }
}

impl From<f64> for Bearing {
    fn from(value: f64) -> Self {
        Self::from_degrees(value)
    }
}

impl From<Bearing> for f64 {
    fn from(value: Bearing) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// One of the eight principal compass points
pub enum CompassPoint {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl CompassPoint {
    const ALL: [Self; 8] = [
        Self::N,
        Self::NE,
        Self::E,
        Self::SE,
        Self::S,
        Self::SW,
        Self::W,
        Self::NW,
    ];

    /// Each point covers a 45° sector centered on it
    pub fn from_degrees(degrees: f64) -> Self {
        let sector = ((normalize_degrees(degrees) + 22.5) / 45.0).floor() as usize % 8;
        Self::ALL[sector]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::N => "north",
            Self::NE => "north-east",
            Self::E => "east",
            Self::SE => "south-east",
            Self::S => "south",
            Self::SW => "south-west",
            Self::W => "west",
            Self::NW => "north-west",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "Expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(bearing(51.5074, -0.1278, 51.5074, -0.1278), 0.0);
        assert_eq!(bearing(-33.86, 151.2, -33.86, 151.2), 0.0);
    }

    #[test]
    fn test_due_east_on_equator() {
        assert_close(bearing(0.0, 0.0, 0.0, 90.0), 90.0);
    }

    #[test]
    fn test_due_north_to_pole() {
        assert_close(bearing(0.0, 0.0, 90.0, 0.0), 0.0);
    }

    #[test]
    fn test_cardinal_directions() {
        assert_close(bearing(10.0, 10.0, 0.0, 10.0), 180.0);
        assert_close(bearing(0.0, 10.0, 0.0, 0.0), 270.0);
    }

    #[test]
    fn test_great_circle_not_rhumb() {
        // Heading east along a parallel starts north of east on a great circle
        let brg = bearing(52.2, 0.12, 52.2, 10.0);
        assert!(brg < 90.0 && brg > 80.0, "Got {brg}");
    }

    #[test]
    fn test_known_city_pair() {
        // Cambridge to London is roughly south-south-west
        let brg = bearing(52.20641, 0.12185, 51.5074, -0.1278);
        assert!((brg - 193.0).abs() < 2.0, "Got {brg}");
    }

    #[test]
    fn test_normalize_degrees() {
        assert_close(normalize_degrees(-90.0), 270.0);
        assert_close(normalize_degrees(720.0), 0.0);
        assert_close(normalize_degrees(365.0), 5.0);
        assert_eq!(normalize_degrees(-1e-20), 0.0);
    }

    #[test]
    fn test_compass_points() {
        assert_eq!(CompassPoint::from_degrees(0.0), CompassPoint::N);
        assert_eq!(CompassPoint::from_degrees(359.0), CompassPoint::N);
        assert_eq!(CompassPoint::from_degrees(90.0), CompassPoint::E);
        assert_eq!(CompassPoint::from_degrees(200.0), CompassPoint::S);
        assert_eq!(CompassPoint::from_degrees(-45.0), CompassPoint::NW);
        assert_eq!(Bearing::from_degrees(135.0).compass_point().label(), "south-east");
    }

    proptest! {
        #[test]
        fn prop_bearing_in_range(
            lat1 in -1000.0f64..1000.0,
            lon1 in -1000.0f64..1000.0,
            lat2 in -1000.0f64..1000.0,
            lon2 in -1000.0f64..1000.0,
        ) {
            let brg = bearing(lat1, lon1, lat2, lon2);
            prop_assert!((0.0..360.0).contains(&brg), "{brg} out of range");
        }

        #[test]
        fn prop_normalize_in_range(deg in -1e9f64..1e9) {
            let wrapped = normalize_degrees(deg);
            prop_assert!((0.0..360.0).contains(&wrapped), "{wrapped} out of range");
        }
    }
}
