use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime};
use futures::future::try_join_all;
use guardain_logic::{
    AverageComparison, CrimeRecord, CrimeSummary, Environment, HotspotReport, Location,
    PoliceStation, RiskAssessment, RouteComparison, RouteOptions, RouteSafety, ThreatReport,
    TimeContext, TimePeriod, TimePeriodComparison, TravelMode, TypeBreakdown, WeatherConditions,
    compare_routes, crimes_by_types,
};
use guardain_transport::analyze_route;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(&'static str),
    /// One of the services we depend on failed
    Upstream(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(why: anyhow::Error) -> Self {
        Self::Upstream(why)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match self {
            Self::BadRequest(msg) => msg,
            Self::NotFound(what) => what.to_string(),
            Self::Upstream(why) => {
                error!("Upstream failure: {why:?}");
                format!("{why:#}")
            }
        };
        (status, msg).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn location(lat: f64, lon: f64) -> Result<Location, ApiError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(ApiError::BadRequest(format!(
            "Coordinates out of range: {lat},{lon}"
        )));
    }
    Ok(Location::new(lat, lon))
}

/// Accepts RFC 3339, a naive ISO timestamp (taken as UTC) or unix milliseconds
fn parse_time(
    raw: Option<&str>,
    fallback: DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(fallback);
    };

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.and_utc().fixed_offset())
        })
        .or_else(|| {
            raw.parse::<i64>()
                .ok()
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.fixed_offset())
        })
        .ok_or_else(|| ApiError::BadRequest(format!("Unrecognized timestamp {raw:?}")))
}

/// Score an area, weather being unknown counts as fair weather
fn assess_threat(
    records: &[CrimeRecord],
    weather: Option<&WeatherConditions>,
    time: &TimeContext,
    today: NaiveDate,
) -> ThreatReport {
    let environment = Environment {
        night: time.is_night(),
        bad_weather: weather.is_some_and(WeatherConditions::is_bad),
    };
    RiskAssessment::assess(records, today, environment).into_report()
}

#[derive(Debug, Deserialize)]
pub struct PointQuery {
    lat: f64,
    lon: f64,
    t: Option<String>,
}

impl PointQuery {
    fn location(&self) -> Result<Location, ApiError> {
        location(self.lat, self.lon)
    }

    /// Requested time, or the server's local time when none was given
    fn time(&self) -> Result<DateTime<FixedOffset>, ApiError> {
        parse_time(self.t.as_deref(), Local::now().fixed_offset())
    }
}

pub async fn threat(
    State(state): State<AppState>,
    Query(query): Query<PointQuery>,
) -> ApiResult<ThreatReport> {
    let at = query.location()?;
    let now = query.time()?;

    let (crimes, weather) = tokio::join!(state.police.street_crimes(at), state.weather.current(at));
    let crimes = crimes?;
    let weather = weather
        .inspect_err(|why| warn!("Weather unavailable, assuming fair weather: {why:?}"))
        .ok();

    let time = TimeContext::new(at, now);
    let report = assess_threat(&crimes, weather.as_ref(), &time, now.date_naive());
    info!("Threat at {},{} is {}", at.lat, at.long, report.level);
    Ok(Json(report))
}

pub async fn police_station(
    State(state): State<AppState>,
    Query(query): Query<PointQuery>,
) -> ApiResult<PoliceStation> {
    let at = query.location()?;
    state
        .police
        .nearest_station(at)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("No police station found nearby"))
}

#[derive(Debug, Serialize)]
pub struct CrimeSummaryResponse {
    #[serde(flatten)]
    summary: CrimeSummary,
    comparison: AverageComparison,
}

pub async fn crime_summary(
    State(state): State<AppState>,
    Query(query): Query<PointQuery>,
) -> ApiResult<CrimeSummaryResponse> {
    let at = query.location()?;
    let crimes = state.police.street_crimes(at).await?;
    let summary = CrimeSummary::new(at, &crimes);
    Ok(Json(CrimeSummaryResponse {
        comparison: summary.compare_to_average(),
        summary,
    }))
}

pub async fn hotspots(
    State(state): State<AppState>,
    Query(query): Query<PointQuery>,
) -> ApiResult<HotspotReport> {
    let at = query.location()?;
    let crimes = state.police.street_crimes(at).await?;
    Ok(Json(HotspotReport::find(at, &crimes)))
}

#[derive(Debug, Deserialize)]
pub struct CrimeTypesQuery {
    lat: f64,
    lon: f64,
    /// Comma separated categories
    types: String,
}

fn split_types(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

pub async fn crime_types(
    State(state): State<AppState>,
    Query(query): Query<CrimeTypesQuery>,
) -> ApiResult<BTreeMap<String, TypeBreakdown>> {
    let at = location(query.lat, query.lon)?;
    let types = split_types(&query.types);
    if types.is_empty() {
        return Err(ApiError::BadRequest("No crime types given".to_string()));
    }
    let crimes = state.police.street_crimes(at).await?;
    Ok(Json(crimes_by_types(at, &crimes, &types)))
}

#[derive(Debug, Deserialize)]
pub struct TimePeriodQuery {
    lat: f64,
    lon: f64,
    period: TimePeriod,
}

pub async fn time_periods(
    State(state): State<AppState>,
    Query(query): Query<TimePeriodQuery>,
) -> ApiResult<TimePeriodComparison> {
    let at = location(query.lat, query.lon)?;
    let crimes = state.police.street_crimes(at).await?;
    Ok(Json(TimePeriodComparison::new(query.period, &crimes)))
}

pub async fn weather(
    State(state): State<AppState>,
    Query(query): Query<PointQuery>,
) -> ApiResult<WeatherConditions> {
    let at = query.location()?;
    Ok(Json(state.weather.current(at).await?))
}

pub async fn time_context(Query(query): Query<PointQuery>) -> ApiResult<TimeContext> {
    let at = query.location()?;
    Ok(Json(TimeContext::new(at, query.time()?)))
}

#[derive(Debug, Deserialize)]
pub struct RoutesQuery {
    from_lat: f64,
    from_lon: f64,
    to_lat: f64,
    to_lon: f64,
    #[serde(default)]
    mode: TravelMode,
    /// Also look up crime along every route and rank them
    #[serde(default)]
    analyze: bool,
}

#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    #[serde(flatten)]
    options: RouteOptions,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety: Vec<RouteSafety>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison: Option<RouteComparison>,
}

pub async fn routes(
    State(state): State<AppState>,
    Query(query): Query<RoutesQuery>,
) -> ApiResult<RoutesResponse> {
    let start = location(query.from_lat, query.from_lon)?;
    let end = location(query.to_lat, query.to_lon)?;
    let options = state.routing.route_options(start, end, query.mode).await;

    let safety = if query.analyze {
        try_join_all(
            options
                .routes
                .iter()
                .map(|route| analyze_route(&state.police, route)),
        )
        .await?
    } else {
        Vec::new()
    };

    Ok(Json(RoutesResponse {
        comparison: compare_routes(&safety),
        options,
        safety,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::Uri;
    use guardain_logic::ThreatLevel;

    use super::*;

    fn fallback() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").expect("Invalid timestamp")
    }

    #[test]
    fn test_location_bounds() {
        assert!(location(52.2, 0.12).is_ok());
        assert!(matches!(location(91.0, 0.0), Err(ApiError::BadRequest(_))));
        assert!(location(0.0, -181.0).is_err());
        assert!(location(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time(None, fallback()).expect("Failed to parse"), fallback());
        assert_eq!(parse_time(Some(" "), fallback()).expect("Failed to parse"), fallback());

        let rfc = parse_time(Some("2024-11-15T21:30:00+01:00"), fallback()).expect("Failed to parse");
        assert_eq!(rfc.offset().local_minus_utc(), 3600);

        let naive = parse_time(Some("2024-11-15T21:30:00"), fallback()).expect("Failed to parse");
        assert_eq!(naive.to_rfc3339(), "2024-11-15T21:30:00+00:00");

        let millis = parse_time(Some("1731706200000"), fallback()).expect("Failed to parse");
        assert_eq!(millis.to_rfc3339(), "2024-11-15T21:30:00+00:00");

        assert!(matches!(
            parse_time(Some("yesterday"), fallback()),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_missing_time_is_server_local() {
        let query = PointQuery {
            lat: 52.2,
            lon: 0.12,
            t: None,
        };
        let before = Local::now();
        let time = query.time().expect("Failed to parse");
        assert_eq!(
            time.offset().local_minus_utc(),
            before.offset().local_minus_utc()
        );
        assert!(time >= before.fixed_offset());

        let query = PointQuery {
            t: Some("2024-11-15T21:30:00+01:00".to_string()),
            ..query
        };
        assert_eq!(
            query.time().expect("Failed to parse").to_rfc3339(),
            "2024-11-15T21:30:00+01:00"
        );
    }

    #[test]
    fn test_error_status() {
        assert_eq!(
            ApiError::NotFound("x").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(anyhow::anyhow!("Police API down"))
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::BadRequest("bad".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_assess_threat_ignores_missing_weather() {
        let at = Location::new(52.2053, 0.1218);
        let now = DateTime::parse_from_rfc3339("2024-11-16T12:00:00+00:00").expect("Invalid timestamp");
        let time = TimeContext::new(at, now);
        let report = assess_threat(&[], None, &time, now.date_naive());
        assert_eq!(report.level, ThreatLevel::LOW);
        assert_eq!(report.reason, "No recent crime recorded nearby.");
    }

    #[test]
    fn test_split_types() {
        assert_eq!(
            split_types("burglary, robbery,,"),
            vec!["burglary".to_string(), "robbery".to_string()]
        );
        assert!(split_types(" , ").is_empty());
    }

    #[test]
    fn test_routes_query_defaults() {
        let uri = "http://localhost/api/routes?from_lat=52.2&from_lon=0.12&to_lat=52.21&to_lon=0.13"
            .parse::<Uri>()
            .expect("Invalid URI");
        let Query(query) = Query::<RoutesQuery>::try_from_uri(&uri).expect("Failed to parse");
        assert_eq!(query.mode, TravelMode::Walking);
        assert!(!query.analyze);

        let uri = "http://localhost/api/routes?from_lat=52.2&from_lon=0.12&to_lat=52.21&to_lon=0.13&mode=cycling&analyze=true"
            .parse::<Uri>()
            .expect("Invalid URI");
        let Query(query) = Query::<RoutesQuery>::try_from_uri(&uri).expect("Failed to parse");
        assert_eq!(query.mode, TravelMode::Cycling);
        assert!(query.analyze);
    }

    #[test]
    fn test_time_period_query() {
        let uri = "http://localhost/api/time-periods?lat=52.2&lon=0.12&period=night"
            .parse::<Uri>()
            .expect("Invalid URI");
        let Query(query) = Query::<TimePeriodQuery>::try_from_uri(&uri).expect("Failed to parse");
        assert_eq!(query.period, TimePeriod::Night);
    }

    #[test]
    fn test_routes_response_shape() {
        let start = Location::new(52.2, 0.12);
        let end = Location::new(52.21, 0.13);
        let resp = RoutesResponse {
            options: RouteOptions::direct(start, end, "No key"),
            safety: Vec::new(),
            comparison: None,
        };
        let json = serde_json::to_value(&resp).expect("Failed to serialize");
        assert_eq!(json["note"], "No key");
        assert_eq!(json["routes"][0]["route_type"], "direct");
        assert!(json.get("safety").is_none());
        assert!(json.get("comparison").is_none());
    }
}
