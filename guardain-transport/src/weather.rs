use guardain_logic::{CurrentWeather, Location, WeatherConditions, prelude::*};
use reqwest::Client;
use serde::Deserialize;

use crate::http::{get_json, url_with_params};

const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
const CURRENT_FIELDS: &str = "temperature_2m,apparent_temperature,precipitation,weather_code,cloud_cover,wind_speed_10m,relative_humidity_2m,visibility";

#[derive(Deserialize)]
struct ForecastResponse {
    current: RawCurrent,
}

#[derive(Deserialize)]
struct RawCurrent {
    #[serde(default)]
    temperature_2m: f64,
    apparent_temperature: Option<f64>,
    #[serde(default)]
    precipitation: f64,
    #[serde(default)]
    weather_code: u16,
    #[serde(default)]
    cloud_cover: f64,
    #[serde(default)]
    wind_speed_10m: f64,
    #[serde(default)]
    relative_humidity_2m: f64,
    visibility: Option<f64>,
}

impl From<RawCurrent> for CurrentWeather {
    fn from(raw: RawCurrent) -> Self {
        Self {
            temperature: raw.temperature_2m,
            apparent_temperature: raw.apparent_temperature,
            precipitation: raw.precipitation,
            weather_code: raw.weather_code,
            cloud_cover: raw.cloud_cover,
            wind_speed: raw.wind_speed_10m,
            humidity: raw.relative_humidity_2m,
            visibility: raw.visibility,
        }
    }
}

/// Current conditions from Open-Meteo, no key needed
pub struct WeatherClient {
    client: Client,
}

impl WeatherClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn current(&self, at: Location) -> Result<WeatherConditions> {
        let url = url_with_params(
            OPEN_METEO_URL,
            &[
                ("latitude", at.lat.to_string()),
                ("longitude", at.long.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("wind_speed_unit", "ms".to_string()),
                ("timezone", "auto".to_string()),
            ],
        )?;
        let resp = get_json::<ForecastResponse>(&self.client, url)
            .await
            .context("Failed to fetch weather")?;
        Ok(WeatherConditions::from_current(resp.current.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forecast() {
        let resp = serde_json::from_str::<ForecastResponse>(
            r#"{
                "latitude": 52.2,
                "longitude": 0.12,
                "timezone": "Europe/London",
                "current_units": {"temperature_2m": "°C"},
                "current": {
                    "time": "2024-11-15T21:30",
                    "interval": 900,
                    "temperature_2m": 8.46,
                    "apparent_temperature": 6.24,
                    "precipitation": 0.2,
                    "weather_code": 61,
                    "cloud_cover": 100,
                    "wind_speed_10m": 3.21,
                    "relative_humidity_2m": 91,
                    "visibility": 4500.0
                }
            }"#,
        )
        .expect("Failed to parse");

        let weather = WeatherConditions::from_current(resp.current.into());
        assert_eq!(weather.temperature, 8.5);
        assert_eq!(weather.conditions, "Slight rain");
        assert!(weather.is_raining);
        assert_eq!(weather.wind_speed_ms, 3.2);
        assert_eq!(weather.humidity, 91);
        assert_eq!(weather.cloud_cover, 100);
        assert!(!weather.is_bad());
    }

    #[test]
    fn test_parse_sparse_forecast() {
        let resp = serde_json::from_str::<ForecastResponse>(
            r#"{"current": {"temperature_2m": 1.0, "weather_code": 45}}"#,
        )
        .expect("Failed to parse");
        let weather = WeatherConditions::from_current(resp.current.into());
        assert_eq!(weather.feels_like, 1.0);
        assert_eq!(weather.visibility_meters, None);
        assert!(weather.is_bad());
    }
}
