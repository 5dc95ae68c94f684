//! Client for the UK Police open data API.

use guardain_logic::{CrimeLocation, CrimeRecord, Location, PoliceStation, prelude::*};
use log::{debug, info};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::http::{get_json, get_json_opt, url_with_params};

const POLICE_API_BASE: &str = "https://data.police.uk/api";

#[derive(Deserialize)]
struct RawStreet {
    name: String,
}

#[derive(Deserialize)]
struct RawCrimeLocation {
    latitude: String,
    longitude: String,
    street: RawStreet,
}

#[derive(Deserialize)]
struct RawCrime {
    #[serde(default = "unknown_category")]
    category: String,
    #[serde(default)]
    month: String,
    location: Option<RawCrimeLocation>,
}

fn unknown_category() -> String {
    "unknown".to_string()
}

/// The API sends coordinates as strings
fn parse_coords(lat: &str, long: &str) -> Option<Location> {
    Some(Location::new(lat.trim().parse().ok()?, long.trim().parse().ok()?))
}

impl From<RawCrime> for CrimeRecord {
    fn from(raw: RawCrime) -> Self {
        let location = raw.location.and_then(|loc| {
            parse_coords(&loc.latitude, &loc.longitude).map(|location| CrimeLocation {
                location,
                street: loc.street.name,
            })
        });
        Self {
            category: raw.category,
            month: raw.month,
            location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// A police force and one of its neighbourhood teams
pub struct Neighbourhood {
    pub force: String,
    pub neighbourhood: String,
}

#[derive(Deserialize)]
struct RawStation {
    name: Option<String>,
    address: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
}

impl RawStation {
    fn into_candidate(self) -> Option<(String, Location)> {
        if self.kind.as_deref().is_some_and(|kind| kind != "station") {
            return None;
        }
        let location = parse_coords(self.latitude.as_deref()?, self.longitude.as_deref()?)?;
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .or(self.address)
            .unwrap_or_else(|| "Police station".to_string());
        Some((name, location))
    }
}

pub struct PoliceClient {
    client: Client,
    base: String,
}

impl PoliceClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base: POLICE_API_BASE.to_string(),
        }
    }

    /// All street level crimes recorded around a point in the latest month available
    pub async fn street_crimes(&self, at: Location) -> Result<Vec<CrimeRecord>> {
        let url = url_with_params(
            &format!("{}/crimes-street/all-crime", self.base),
            &[("lat", at.lat.to_string()), ("lng", at.long.to_string())],
        )?;
        let raw = get_json::<Vec<RawCrime>>(&self.client, url)
            .await
            .context("Failed to fetch street crimes")?;
        debug!("{} crimes near {},{}", raw.len(), at.lat, at.long);
        Ok(raw.into_iter().map(CrimeRecord::from).collect())
    }

    /// The neighbourhood team covering a point, `None` outside the API's coverage
    pub async fn locate_neighbourhood(&self, at: Location) -> Result<Option<Neighbourhood>> {
        let url = url_with_params(
            &format!("{}/locate-neighbourhood", self.base),
            &[("q", format!("{},{}", at.lat, at.long))],
        )?;
        get_json_opt(&self.client, url)
            .await
            .context("Failed to locate neighbourhood")
    }

    /// Stations listed for a neighbourhood that have usable coordinates
    pub async fn stations(&self, area: &Neighbourhood) -> Result<Vec<(String, Location)>> {
        let url = format!("{}/{}/{}/locations", self.base, area.force, area.neighbourhood);
        let url = Url::parse(&url).with_context(|| format!("Invalid URL {url}"))?;
        let raw = get_json::<Vec<RawStation>>(&self.client, url)
            .await
            .context("Failed to fetch neighbourhood locations")?;
        Ok(raw.into_iter().filter_map(RawStation::into_candidate).collect())
    }

    pub async fn nearest_station(&self, at: Location) -> Result<Option<PoliceStation>> {
        let Some(area) = self.locate_neighbourhood(at).await? else {
            info!("No neighbourhood covers {},{}", at.lat, at.long);
            return Ok(None);
        };
        let candidates = self.stations(&area).await?;
        Ok(PoliceStation::nearest(at, candidates))
    }
}
