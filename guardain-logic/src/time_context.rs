use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Julian date of the J2000 epoch
const J2000: f64 = 2451545.0;
/// Julian date of the unix epoch
const UNIX_EPOCH_JD: f64 = 2440587.5;
/// Sun altitude at rise/set, accounting for refraction and the solar disc
const SUNRISE_ALTITUDE: f64 = -0.833;
const EARTH_TILT: f64 = 23.4397;

const FALLBACK_SUNRISE_HOUR: u32 = 7;
const FALLBACK_SUNSET_HOUR: u32 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimePeriod {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=20 => Self::Evening,
            _ => Self::Night,
        }
    }
}

/// Sunrise and sunset (UTC) on `date` at `location` using the sunrise equation. `None` when the
/// sun doesn't rise or set that day (polar day/night).
pub fn sun_times(location: Location, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let epoch = NaiveDate::from_ymd_opt(2000, 1, 1)?;
    let n = (date - epoch).num_days() as f64;

    let mean_solar_noon = n - location.long / 360.0;
    let anomaly = (357.5291 + 0.98560028 * mean_solar_noon).rem_euclid(360.0);
    let m = anomaly.to_radians();
    let center = 1.9148 * m.sin() + 0.0200 * (2.0 * m).sin() + 0.0003 * (3.0 * m).sin();
    let ecliptic_long = (anomaly + center + 180.0 + 102.9372).rem_euclid(360.0).to_radians();
    let transit =
        J2000 + mean_solar_noon + 0.0053 * m.sin() - 0.0069 * (2.0 * ecliptic_long).sin();

    let declination = (ecliptic_long.sin() * EARTH_TILT.to_radians().sin()).asin();
    let phi = location.lat.to_radians();
    let cos_hour_angle = (SUNRISE_ALTITUDE.to_radians().sin() - phi.sin() * declination.sin())
        / (phi.cos() * declination.cos());

    if !(-1.0..=1.0).contains(&cos_hour_angle) {
        return None;
    }

    let hour_angle = cos_hour_angle.acos().to_degrees();
    let rise = julian_to_utc(transit - hour_angle / 360.0)?;
    let set = julian_to_utc(transit + hour_angle / 360.0)?;
    Some((rise, set))
}

fn julian_to_utc(jd: f64) -> Option<DateTime<Utc>> {
    let secs = (jd - UNIX_EPOCH_JD) * 86400.0;
    DateTime::from_timestamp(secs.floor() as i64, 0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Time of day and lighting conditions at a place
pub struct TimeContext {
    pub current_time: String,
    pub local_time: String,
    pub day_of_week: String,
    pub is_weekend: bool,
    pub sunrise: String,
    pub sunset: String,
    pub is_daylight: bool,
    pub hours_after_sunset: f64,
    pub time_period: TimePeriod,
    /// Local hour of day, 0-23
    pub hour: u32,
}

impl TimeContext {
    pub fn new(location: Location, now: DateTime<FixedOffset>) -> Self {
        let offset = *now.offset();
        let hour = now.hour();

        let (sunrise, sunset, is_daylight, hours_after_sunset) =
            match sun_times(location, now.date_naive()) {
                Some((rise, set)) => {
                    let rise = rise.with_timezone(&offset);
                    let set = set.with_timezone(&offset);
                    let after = if now > set {
                        (now - set).num_seconds() as f64 / 3600.0
                    } else {
                        0.0
                    };
                    (rise, set, rise < now && now < set, after)
                }
                None => {
                    let at = |h| {
                        NaiveTime::from_hms_opt(h, 0, 0)
                            .map(|t| now.date_naive().and_time(t))
                            .and_then(|dt| offset.from_local_datetime(&dt).single())
                            .unwrap_or(now)
                    };
                    (
                        at(FALLBACK_SUNRISE_HOUR),
                        at(FALLBACK_SUNSET_HOUR),
                        (FALLBACK_SUNRISE_HOUR..FALLBACK_SUNSET_HOUR).contains(&hour),
                        hour.saturating_sub(FALLBACK_SUNSET_HOUR) as f64,
                    )
                }
            };

        Self {
            current_time: now.to_rfc3339(),
            local_time: now.format("%I:%M %p").to_string(),
            day_of_week: now.format("%A").to_string(),
            is_weekend: now.weekday().number_from_monday() >= 6,
            sunrise: sunrise.format("%H:%M").to_string(),
            sunset: sunset.format("%H:%M").to_string(),
            is_daylight,
            hours_after_sunset: (hours_after_sunset * 10.0).round() / 10.0,
            time_period: TimePeriod::from_hour(hour),
            hour,
        }
    }

    /// Night for risk purposes: dark, or between 20:00 and 06:00 local time
    pub fn is_night(&self) -> bool {
        !self.is_daylight || self.hour >= 20 || self.hour < 6
    }
}
