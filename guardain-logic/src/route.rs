use serde::{Deserialize, Serialize};

use crate::{
    crime::{CrimeCount, CrimeRecord, dominant_categories},
    location::Location,
    prelude::*,
};

const METERS_PER_MILE: f64 = 1609.34;
/// Walking pace used when estimating a route without a routing service
const MINUTES_PER_MILE: f64 = 20.0;
const TARGET_WAYPOINTS: usize = 5;
const POLYLINE_PRECISION: f64 = 1e5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Walking,
    Cycling,
    Driving,
}

impl TravelMode {
    /// OpenRouteService profile for this mode
    pub fn profile(self) -> &'static str {
        match self {
            Self::Walking => "foot-walking",
            Self::Cycling => "cycling-regular",
            Self::Driving => "driving-car",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Cycling => "cycling",
            Self::Driving => "driving",
        }
    }
}

/// Read one zig-zag encoded varint from the front of `bytes`
fn next_value(bytes: &mut impl Iterator<Item = u8>) -> Result<i64> {
    let mut result = 0_i64;
    let mut shift = 0;
    loop {
        let byte = bytes.next().context("Polyline ended part way through a value")?;
        let chunk = i64::from(byte.checked_sub(63).context("Invalid polyline character")?);
        if shift > 60 {
            bail!("Polyline value too long");
        }
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Ok(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Decode an encoded polyline (precision 5) into its points
pub fn decode_polyline(encoded: &str) -> Result<Vec<Location>> {
    let mut bytes = encoded.bytes().peekable();
    let mut points = Vec::new();
    let (mut lat, mut long) = (0_i64, 0_i64);

    while bytes.peek().is_some() {
        let d_lat = next_value(&mut bytes)?;
        let d_long = next_value(&mut bytes).context("Polyline has a latitude with no longitude")?;
        lat = lat.checked_add(d_lat).context("Polyline coordinate overflow")?;
        long = long.checked_add(d_long).context("Polyline coordinate overflow")?;
        points.push(Location::new(
            lat as f64 / POLYLINE_PRECISION,
            long as f64 / POLYLINE_PRECISION,
        ));
    }

    Ok(points)
}

/// Thin a route geometry down to about five points, always starting at `start` and ending
/// at `end`
pub fn sample_waypoints(geometry: &[Location], start: Location, end: Location) -> Vec<Location> {
    let step = (geometry.len() / TARGET_WAYPOINTS).max(1);
    let mut waypoints = geometry.iter().copied().step_by(step).collect::<Vec<_>>();

    if waypoints.first() != Some(&start) {
        waypoints.insert(0, start);
    }
    if waypoints.last() != Some(&end) {
        waypoints.push(end);
    }

    waypoints
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOption {
    pub route_id: u32,
    pub distance_meters: u64,
    pub duration_minutes: u64,
    pub description: String,
    pub route_type: String,
    pub waypoints: Vec<Location>,
}

impl RouteOption {
    /// Build an option from a routing service result
    pub fn from_geometry(
        route_id: u32,
        mode: TravelMode,
        distance_meters: f64,
        duration_seconds: f64,
        geometry: &[Location],
        start: Location,
        end: Location,
    ) -> Self {
        let profile_name = mode.profile().split('-').next().unwrap_or_default();
        Self {
            route_id,
            distance_meters: distance_meters.max(0.0) as u64,
            duration_minutes: (duration_seconds / 60.0).max(0.0) as u64,
            description: format!("Route {route_id} ({profile_name})"),
            route_type: mode.name().to_string(),
            waypoints: sample_waypoints(geometry, start, end),
        }
    }
}

/// Straight line estimate between two points at walking pace
pub fn direct_route(start: Location, end: Location) -> RouteOption {
    let miles = start.distance_miles(&end);
    RouteOption {
        route_id: 1,
        distance_meters: (miles * METERS_PER_MILE) as u64,
        duration_minutes: (miles * MINUTES_PER_MILE) as u64,
        description: "Direct route (estimated)".to_string(),
        route_type: "direct".to_string(),
        waypoints: vec![start, start.midpoint(&end), end],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOptions {
    pub routes: Vec<RouteOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RouteOptions {
    /// Single direct route with a note explaining why real routing wasn't used
    pub fn direct(start: Location, end: Location, note: impl Into<String>) -> Self {
        Self {
            routes: vec![direct_route(start, end)],
            note: Some(note.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAnalysis {
    pub segment_number: usize,
    pub location: Location,
    pub crime_count: usize,
    pub dominant_crimes: Vec<CrimeCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighestRiskSegment {
    pub segment_number: usize,
    pub crime_count: usize,
    pub dominant_crimes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Crime exposure along one route
pub struct RouteSafety {
    pub route_id: u32,
    pub overall_crime_count: usize,
    pub average_crime_per_segment: f64,
    pub segment_analyses: Vec<SegmentAnalysis>,
    pub highest_risk_segment: Option<HighestRiskSegment>,
}

impl RouteSafety {
    /// Summarize the crimes recorded around each waypoint of a route
    pub fn analyze(
        route_id: u32,
        segments: impl IntoIterator<Item = (Location, Vec<CrimeRecord>)>,
    ) -> Self {
        let segment_analyses = segments
            .into_iter()
            .enumerate()
            .map(|(i, (location, records))| SegmentAnalysis {
                segment_number: i + 1,
                location,
                crime_count: records.len(),
                dominant_crimes: dominant_categories(&records, 2),
            })
            .collect::<Vec<_>>();

        let overall_crime_count = segment_analyses.iter().map(|s| s.crime_count).sum::<usize>();
        let average_crime_per_segment = if segment_analyses.is_empty() {
            0.0
        } else {
            let avg = overall_crime_count as f64 / segment_analyses.len() as f64;
            (avg * 10.0).round() / 10.0
        };

        // Earliest segment wins ties
        let highest_risk_segment = segment_analyses
            .iter()
            .rev()
            .max_by_key(|s| s.crime_count)
            .map(|s| HighestRiskSegment {
                segment_number: s.segment_number,
                crime_count: s.crime_count,
                dominant_crimes: s.dominant_crimes.iter().map(|c| c.category.clone()).collect(),
            });

        Self {
            route_id,
            overall_crime_count,
            average_crime_per_segment,
            segment_analyses,
            highest_risk_segment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteScore {
    pub route_id: u32,
    /// 0 for the most crime-exposed route, up to 100 for none at all
    pub safety_score: u8,
    pub crime_count: usize,
    pub avg_crime_per_segment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteComparison {
    pub recommendation: u32,
    pub comparison: Vec<RouteScore>,
    pub reasoning: String,
}

/// Rank analyzed routes by safety score, `None` if there's nothing to compare
pub fn compare_routes(analyses: &[RouteSafety]) -> Option<RouteComparison> {
    let max_crimes = analyses.iter().map(|r| r.overall_crime_count).max()?.max(1);

    let mut comparison = analyses
        .iter()
        .map(|r| RouteScore {
            route_id: r.route_id,
            safety_score: (100.0 * (1.0 - r.overall_crime_count as f64 / max_crimes as f64)) as u8,
            crime_count: r.overall_crime_count,
            avg_crime_per_segment: r.average_crime_per_segment,
        })
        .collect::<Vec<_>>();
    comparison.sort_by(|a, b| b.safety_score.cmp(&a.safety_score));

    let recommendation = comparison.first()?.route_id;
    Some(RouteComparison {
        recommendation,
        reasoning: format!("Route {recommendation} has the lowest crime exposure"),
        comparison,
    })
}
