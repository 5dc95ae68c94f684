use guardain_logic::prelude::*;
use reqwest::Url;

const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/";

/// Link that opens the user's maps app searching for the given place
pub fn directions_url(place: &str) -> Result<Url> {
    Url::parse_with_params(MAPS_SEARCH_URL, &[("api", "1"), ("query", place)])
        .context("Failed to build maps link")
}
