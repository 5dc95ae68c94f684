use serde::{Deserialize, Serialize};

/// WMO codes that mean water is falling
const RAIN_CODES: [u16; 13] = [51, 53, 55, 56, 57, 61, 63, 65, 66, 67, 80, 81, 82];

/// Human readable description of a WMO weather interpretation code
pub fn describe_weather_code(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Foggy",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

/// Codes severe enough to matter for personal safety: fog, heavy rain, snow and storms
fn is_severe_code(code: u16) -> bool {
    matches!(code, 45 | 48 | 65 | 67 | 71..=77 | 82 | 85 | 86 | 95..=99)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityLevel {
    VeryPoor,
    Poor,
    Moderate,
    Good,
}

impl VisibilityLevel {
    pub fn from_meters(meters: f64) -> Self {
        if meters < 1000.0 {
            Self::VeryPoor
        } else if meters < 5000.0 {
            Self::Poor
        } else if meters < 8000.0 {
            Self::Moderate
        } else {
            Self::Good
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
/// Raw current conditions as reported by the forecast service
pub struct CurrentWeather {
    pub temperature: f64,
    pub apparent_temperature: Option<f64>,
    pub precipitation: f64,
    pub weather_code: u16,
    pub cloud_cover: f64,
    pub wind_speed: f64,
    pub humidity: f64,
    pub visibility: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConditions {
    pub temperature: f64,
    pub feels_like: f64,
    pub conditions: String,
    pub visibility_meters: Option<f64>,
    pub visibility_level: Option<VisibilityLevel>,
    pub is_raining: bool,
    pub precipitation: f64,
    pub wind_speed_ms: f64,
    pub humidity: u8,
    pub cloud_cover: u8,
    weather_code: u16,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl WeatherConditions {
    pub fn from_current(current: CurrentWeather) -> Self {
        Self {
            temperature: round1(current.temperature),
            feels_like: round1(current.apparent_temperature.unwrap_or(current.temperature)),
            conditions: describe_weather_code(current.weather_code).to_string(),
            visibility_meters: current.visibility,
            visibility_level: current.visibility.map(VisibilityLevel::from_meters),
            is_raining: current.precipitation > 0.0 || RAIN_CODES.contains(&current.weather_code),
            precipitation: round1(current.precipitation),
            wind_speed_ms: round1(current.wind_speed),
            humidity: current.humidity.clamp(0.0, 100.0) as u8,
            cloud_cover: current.cloud_cover.clamp(0.0, 100.0) as u8,
            weather_code: current.weather_code,
        }
    }

    pub fn weather_code(&self) -> u16 {
        self.weather_code
    }

    /// Whether the weather is bad enough to raise the risk of being out
    pub fn is_bad(&self) -> bool {
        is_severe_code(self.weather_code)
            || self.visibility_level == Some(VisibilityLevel::VeryPoor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(describe_weather_code(2), "Partly cloudy");
        assert_eq!(describe_weather_code(99), "Thunderstorm with heavy hail");
        assert_eq!(describe_weather_code(42), "Unknown");
    }

    #[test]
    fn test_visibility_levels() {
        assert_eq!(VisibilityLevel::from_meters(500.0), VisibilityLevel::VeryPoor);
        assert_eq!(VisibilityLevel::from_meters(1000.0), VisibilityLevel::Poor);
        assert_eq!(VisibilityLevel::from_meters(7999.0), VisibilityLevel::Moderate);
        assert_eq!(VisibilityLevel::from_meters(24140.0), VisibilityLevel::Good);
    }

    #[test]
    fn test_light_drizzle_is_raining_but_not_bad() {
        let weather = WeatherConditions::from_current(CurrentWeather {
            temperature: 8.46,
            apparent_temperature: Some(6.24),
            weather_code: 51,
            visibility: Some(9000.0),
            humidity: 75.0,
            cloud_cover: 50.0,
            ..Default::default()
        });
        assert!(weather.is_raining);
        assert!(!weather.is_bad());
        assert_eq!(weather.temperature, 8.5);
        assert_eq!(weather.feels_like, 6.2);
        assert_eq!(weather.conditions, "Light drizzle");
        assert_eq!(weather.humidity, 75);
    }

    #[test]
    fn test_bad_weather() {
        let fog = WeatherConditions::from_current(CurrentWeather {
            weather_code: 45,
            ..Default::default()
        });
        assert!(fog.is_bad());
        assert!(!fog.is_raining);

        let murky = WeatherConditions::from_current(CurrentWeather {
            weather_code: 3,
            visibility: Some(800.0),
            ..Default::default()
        });
        assert!(murky.is_bad());
    }

    #[test]
    fn test_feels_like_defaults_to_temperature() {
        let weather = WeatherConditions::from_current(CurrentWeather {
            temperature: 12.0,
            ..Default::default()
        });
        assert_eq!(weather.feels_like, 12.0);
        assert_eq!(weather.visibility_level, None);
    }
}
