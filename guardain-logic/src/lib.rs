mod bearing;
mod crime;
mod dashboard;
mod indicator;
mod location;
mod orientation;
mod risk;
mod route;
mod threat;
mod time_context;
mod weather;

pub use bearing::{Bearing, CompassPoint, bearing, normalize_degrees};
pub use crime::{
    AverageComparison, CrimeCount, CrimeLocation, CrimeRecord, CrimeSummary, Hotspot,
    HotspotReport, TimePeriodComparison, TypeBreakdown, TypeSample, crimes_by_types,
};
pub use dashboard::{
    Dashboard, DashboardState, SafetyApi, SafetyOverview, StateUpdateSender, StationDirections,
};
pub use indicator::{DirectionIndicator, IndicatorStatus, IndicatorView, rotation};
pub use location::{Location, LocationComponent, LocationError, LocationService, PoliceStation};
pub use orientation::{
    Arbitration, EventSender, Heading, HeadingSink, InvalidHeading, ListenerId, OrientationEvent,
    OrientationPlatform, OrientationSession, SessionGuard, SessionState, SourceArbiter,
    SourceKind, absolute_heading,
};
pub use risk::{Environment, RiskAssessment, crime_score, density_coefficient, time_decay};
pub use route::{
    HighestRiskSegment, RouteComparison, RouteOption, RouteOptions, RouteSafety, RouteScore,
    SegmentAnalysis, TravelMode, compare_routes, decode_polyline, direct_route, sample_waypoints,
};
pub use threat::{ReplyParseError, ThreatLevel, ThreatLevelError, ThreatReport};
pub use time_context::{TimeContext, TimePeriod, sun_times};
pub use weather::{CurrentWeather, VisibilityLevel, WeatherConditions, describe_weather_code};

/// Convenience alias for UTC DT
pub type UtcDT = chrono::DateTime<chrono::Utc>;

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::{Context, anyhow, bail};
}
