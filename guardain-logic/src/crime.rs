use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
};

use serde::{Deserialize, Serialize};

use crate::{location::Location, time_context::TimePeriod};

/// Rough number of recorded crimes in a typical area per month
const CITY_AVERAGE: usize = 32;
/// A street needs at least this many crimes to count as a hotspot
const HOTSPOT_MIN_CRIMES: usize = 3;
const MAX_HOTSPOTS: usize = 5;
const MAX_TYPE_SAMPLES: usize = 10;

const NIGHT_CATEGORIES: [&str; 3] = ["burglary", "vehicle-crime", "robbery"];
const DAY_CATEGORIES: [&str; 3] = [
    "shoplifting",
    "theft-from-the-person",
    "anti-social-behaviour",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrimeLocation {
    pub location: Location,
    pub street: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A single recorded street-level crime
pub struct CrimeRecord {
    pub category: String,
    /// Month the crime was recorded in, `YYYY-MM`
    pub month: String,
    pub location: Option<CrimeLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrimeCount {
    #[serde(rename = "type")]
    pub category: String,
    pub count: usize,
}

/// Count by category, sorted by count descending then name
fn ranked_counts<'a>(categories: impl IntoIterator<Item = &'a str>) -> Vec<CrimeCount> {
    let mut counts = BTreeMap::<&str, usize>::new();
    for category in categories {
        *counts.entry(category).or_default() += 1;
    }
    let mut ranked = counts
        .into_iter()
        .map(|(category, count)| CrimeCount {
            category: category.to_string(),
            count,
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// The `limit` most common categories among `records`
pub(crate) fn dominant_categories(records: &[CrimeRecord], limit: usize) -> Vec<CrimeCount> {
    let mut ranked = ranked_counts(records.iter().map(|r| r.category.as_str()));
    ranked.truncate(limit);
    ranked
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Aggregated crime statistics around a location
pub struct CrimeSummary {
    pub location: Location,
    pub total_crimes: usize,
    pub crime_counts: BTreeMap<String, usize>,
    pub month: Option<String>,
    pub top_crime_types: Vec<CrimeCount>,
}

impl CrimeSummary {
    pub fn new(location: Location, records: &[CrimeRecord]) -> Self {
        let mut crime_counts = BTreeMap::new();
        for record in records {
            *crime_counts.entry(record.category.clone()).or_default() += 1;
        }

        Self {
            location,
            total_crimes: records.len(),
            crime_counts,
            month: records.first().map(|r| r.month.clone()),
            top_crime_types: dominant_categories(records, 3),
        }
    }

    pub fn compare_to_average(&self) -> AverageComparison {
        AverageComparison::new(self.total_crimes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// How an area compares to the typical crime rate
pub struct AverageComparison {
    pub area_total: usize,
    pub city_average: usize,
    /// Signed percentage difference, e.g. `+12.5`
    pub percentage_difference: f64,
    pub higher: bool,
    pub context: String,
}

impl AverageComparison {
    pub fn new(area_total: usize) -> Self {
        let diff = (area_total as f64 - CITY_AVERAGE as f64) / CITY_AVERAGE as f64 * 100.0;
        let context = match area_total.cmp(&CITY_AVERAGE) {
            Ordering::Equal => "This area has about the same number of crimes as average".to_string(),
            Ordering::Greater => format!("This area has {:.0}% more crimes than average", diff.abs()),
            Ordering::Less => format!("This area has {:.0}% fewer crimes than average", diff.abs()),
        };
        Self {
            area_total,
            city_average: CITY_AVERAGE,
            percentage_difference: (diff * 10.0).round() / 10.0,
            higher: area_total > CITY_AVERAGE,
            context,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hotspot {
    pub street_name: String,
    pub location: Location,
    pub crime_count: usize,
    pub dominant_type: String,
    pub distance_miles: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HotspotReport {
    pub hotspots: Vec<Hotspot>,
    pub total_hotspots_found: usize,
}

impl HotspotReport {
    /// Group crimes by street and keep the busiest streets. Crimes without a location are
    /// attributed to an "Unknown" street at `origin`.
    pub fn find(origin: Location, records: &[CrimeRecord]) -> Self {
        let mut streets = HashMap::<&str, (Location, Vec<&str>)>::new();
        for record in records {
            let (street, location) = match &record.location {
                Some(loc) => (loc.street.as_str(), loc.location),
                None => ("Unknown", origin),
            };
            streets
                .entry(street)
                .or_insert_with(|| (location, Vec::new()))
                .1
                .push(record.category.as_str());
        }

        let mut hotspots = streets
            .into_iter()
            .filter(|(_, (_, crimes))| crimes.len() >= HOTSPOT_MIN_CRIMES)
            .map(|(street, (location, crimes))| {
                let dominant_type = ranked_counts(crimes.iter().copied())
                    .into_iter()
                    .next()
                    .map(|c| c.category)
                    .unwrap_or_default();
                Hotspot {
                    street_name: street.to_string(),
                    location,
                    crime_count: crimes.len(),
                    dominant_type,
                    distance_miles: (origin.distance_miles(&location) * 100.0).round() / 100.0,
                }
            })
            .collect::<Vec<_>>();

        hotspots.sort_by(|a, b| {
            b.crime_count
                .cmp(&a.crime_count)
                .then_with(|| a.street_name.cmp(&b.street_name))
        });

        let total_hotspots_found = hotspots.len();
        hotspots.truncate(MAX_HOTSPOTS);

        Self {
            hotspots,
            total_hotspots_found,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeSample {
    pub location: Location,
    pub street: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeBreakdown {
    pub count: usize,
    pub sample_locations: Vec<TypeSample>,
}

/// Counts and a handful of sample locations for each requested category
pub fn crimes_by_types(
    origin: Location,
    records: &[CrimeRecord],
    categories: &[String],
) -> BTreeMap<String, TypeBreakdown> {
    categories
        .iter()
        .map(|category| {
            let matching = records
                .iter()
                .filter(|r| &r.category == category)
                .collect::<Vec<_>>();
            let sample_locations = matching
                .iter()
                .take(MAX_TYPE_SAMPLES)
                .map(|r| match &r.location {
                    Some(loc) => TypeSample {
                        location: loc.location,
                        street: loc.street.clone(),
                    },
                    None => TypeSample {
                        location: origin,
                        street: "Unknown".to_string(),
                    },
                })
                .collect();
            (
                category.clone(),
                TypeBreakdown {
                    count: matching.len(),
                    sample_locations,
                },
            )
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Estimate of how much of an area's crime falls into one part of the day
pub struct TimePeriodComparison {
    pub requested_time: TimePeriod,
    pub estimated_crime_count: usize,
    pub total_area_crimes: usize,
    pub relevant_crime_types: Vec<String>,
}

impl TimePeriodComparison {
    pub fn new(period: TimePeriod, records: &[CrimeRecord]) -> Self {
        let share = match period {
            TimePeriod::Morning => 0.15,
            TimePeriod::Afternoon => 0.25,
            TimePeriod::Evening => 0.35,
            TimePeriod::Night => 0.25,
        };
        let relevant: &[&str] = match period {
            TimePeriod::Evening | TimePeriod::Night => &NIGHT_CATEGORIES,
            TimePeriod::Morning | TimePeriod::Afternoon => &DAY_CATEGORIES,
        };

        let relevant_crime_types = ranked_counts(
            records
                .iter()
                .map(|r| r.category.as_str())
                .filter(|c| relevant.contains(c)),
        )
        .into_iter()
        .map(|c| c.category)
        .collect();

        Self {
            requested_time: period,
            estimated_crime_count: (records.len() as f64 * share) as usize,
            total_area_crimes: records.len(),
            relevant_crime_types,
        }
    }
}
