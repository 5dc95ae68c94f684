//! Deterministic risk index used to turn crime, time and weather context into a threat level.
//!
//! Each incident scores by category severity, decayed by how long ago it was recorded. The
//! average incident score is scaled by how dense crime is in the area and by the environment
//! (night, bad weather) before being bucketed into a [ThreatLevel].

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    crime::{CrimeRecord, dominant_categories},
    threat::{ThreatLevel, ThreatReport},
};

/// Severity score for a UK Police crime category
pub fn crime_score(category: &str) -> f64 {
    match category {
        "violent-crime" | "robbery" => 9.0,
        "burglary" | "possession-of-weapons" => 7.0,
        "vehicle-crime" | "theft-from-the-person" => 5.0,
        "shoplifting" | "bicycle-theft" | "other-theft" => 3.0,
        "anti-social-behaviour" => 2.0,
        _ => 3.0,
    }
}

/// Weight of an incident recorded `months_ago` months before the assessment
pub fn time_decay(months_ago: u32) -> f64 {
    match months_ago {
        0..=1 => 1.0,
        2..=3 => 0.75,
        4..=6 => 0.5,
        _ => 0.25,
    }
}

/// Scale factor for how many incidents were found
pub fn density_coefficient(incidents: usize) -> f64 {
    match incidents {
        0..=5 => 1.0,
        6..=15 => 1.2,
        16..=30 => 1.4,
        _ => 1.6,
    }
}

/// Whole months between a `YYYY-MM` record month and `today`, `None` if unparseable
fn months_between(month: &str, today: NaiveDate) -> Option<u32> {
    let recorded = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").ok()?;
    let months = (today.year() - recorded.year()) * 12 + today.month() as i32
        - recorded.month() as i32;
    Some(months.max(0) as u32)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub night: bool,
    pub bad_weather: bool,
}

impl Environment {
    pub fn modifier(self) -> f64 {
        match (self.night, self.bad_weather) {
            (false, false) => 1.0,
            (true, false) => 1.2,
            (false, true) => 1.15,
            (true, true) => 1.38,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub incidents: usize,
    pub average_score: f64,
    pub density_coefficient: f64,
    pub environment: Environment,
    pub index: f64,
    pub level: ThreatLevel,
    /// Most common category, if there were any incidents
    pub dominant_category: Option<String>,
}

impl RiskAssessment {
    /// Score `records` as of `today`. Records with an unreadable month count as recent.
    pub fn assess(records: &[CrimeRecord], today: NaiveDate, environment: Environment) -> Self {
        let total = records
            .iter()
            .map(|r| {
                let age = months_between(&r.month, today).unwrap_or(0);
                crime_score(&r.category) * time_decay(age)
            })
            .sum::<f64>();

        let average_score = if records.is_empty() {
            0.0
        } else {
            total / records.len() as f64
        };
        let density_coefficient = density_coefficient(records.len());
        let index = average_score * density_coefficient * environment.modifier();

        Self {
            incidents: records.len(),
            average_score,
            density_coefficient,
            environment,
            index,
            level: Self::classify(index),
            dominant_category: dominant_categories(records, 1)
                .into_iter()
                .next()
                .map(|c| c.category),
        }
    }

    pub fn classify(index: f64) -> ThreatLevel {
        if index < 2.5 {
            ThreatLevel::LOW
        } else if index < 5.0 {
            ThreatLevel::LOWER
        } else if index < 7.5 {
            ThreatLevel::MODERATE
        } else if index < 10.0 {
            ThreatLevel::HIGHER
        } else {
            ThreatLevel::HIGH
        }
    }

    /// Short explanation naming what drove the level
    pub fn reason(&self) -> String {
        let conditions = match (self.environment.night, self.environment.bad_weather) {
            (true, true) => " at night in poor weather",
            (true, false) => " at night",
            (false, true) => " in poor weather",
            (false, false) => "",
        };

        let mut reason = match &self.dominant_category {
            None => format!("No recent crime recorded nearby{conditions}."),
            Some(category) => format!(
                "{} recent incidents nearby, mostly {}{conditions}.",
                self.incidents,
                category.replace('-', " ")
            ),
        };

        if self.level.needs_advice() {
            reason.push_str(" Stay in well lit, busy areas.");
        }

        reason
    }

    pub fn into_report(self) -> ThreatReport {
        ThreatReport {
            level: self.level,
            reason: self.reason(),
        }
    }
}
