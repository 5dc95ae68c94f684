use guardain_logic::prelude::*;
use log::debug;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

const USER_AGENT: &str = const_str::concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Client shared by every service, built once per process
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

pub(crate) fn url_with_params(base: &str, params: &[(&str, String)]) -> Result<Url> {
    Url::parse_with_params(base, params).with_context(|| format!("Invalid URL {base}"))
}

pub(crate) async fn get_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T> {
    debug!("GET {url}");
    client
        .get(url)
        .send()
        .await
        .context("Could not send request")?
        .error_for_status()
        .context("Server returned error")?
        .json::<T>()
        .await
        .context("Failed to parse response")
}

/// Same as [get_json] but a 404 means there's nothing there rather than an error
pub(crate) async fn get_json_opt<T: DeserializeOwned>(client: &Client, url: Url) -> Result<Option<T>> {
    debug!("GET {url}");
    let resp = client
        .get(url)
        .send()
        .await
        .context("Could not send request")?;

    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    resp.error_for_status()
        .context("Server returned error")?
        .json::<T>()
        .await
        .map(Some)
        .context("Failed to parse response")
}
