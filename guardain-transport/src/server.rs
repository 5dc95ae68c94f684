use guardain_logic::{Location, PoliceStation, SafetyApi, ThreatReport, UtcDT, prelude::*};
use reqwest::{Client, Url};

use crate::http::{get_json, get_json_opt, url_with_params};

const fn server_host() -> &'static str {
    if let Some(host) = option_env!("GUARDAIN_API_HOST") {
        host
    } else {
        "localhost"
    }
}

const fn server_port() -> u16 {
    if let Some(port) = option_env!("GUARDAIN_API_PORT") {
        const_str::parse!(port, u16)
    } else {
        3537
    }
}

const fn server_secure() -> bool {
    if let Some(secure) = option_env!("GUARDAIN_API_SECURE") {
        const_str::eq_ignore_ascii_case!(secure, "true") || const_str::equal!(secure, "1")
    } else {
        false
    }
}

const fn server_http_proto() -> &'static str {
    if server_secure() { "https" } else { "http" }
}

const SERVER_HOST: &str = server_host();
const SERVER_PORT: u16 = server_port();
const SERVER_HTTP_PROTO: &str = server_http_proto();

const SERVER_SOCKET: &str = const_str::concat!(SERVER_HOST, ":", SERVER_PORT);

pub const SERVER_HTTP_URL: &str = const_str::concat!(SERVER_HTTP_PROTO, "://", SERVER_SOCKET);

fn location_params(at: Location) -> Vec<(&'static str, String)> {
    vec![("lat", at.lat.to_string()), ("lon", at.long.to_string())]
}

fn threat_url(base: &str, at: Location, now: UtcDT) -> Result<Url> {
    let mut params = location_params(at);
    params.push(("t", now.to_rfc3339()));
    url_with_params(&format!("{base}/api/threat"), &params)
}

fn station_url(base: &str, at: Location) -> Result<Url> {
    url_with_params(&format!("{base}/api/police-station"), &location_params(at))
}

/// Client for the GuardAIn API service
pub struct ApiClient {
    client: Client,
    base: String,
}

impl ApiClient {
    /// Talk to the server configured at build time
    pub fn new(client: Client) -> Self {
        Self::with_base(client, SERVER_HTTP_URL)
    }

    pub fn with_base(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl SafetyApi for ApiClient {
    async fn threat_report(&self, at: Location, now: UtcDT) -> Result<ThreatReport> {
        let url = threat_url(&self.base, at, now)?;
        get_json(&self.client, url).await
    }

    async fn nearest_station(&self, at: Location) -> Result<Option<PoliceStation>> {
        let url = station_url(&self.base, at)?;
        get_json_opt(&self.client, url).await
    }
}
