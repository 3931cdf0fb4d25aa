//! Day and trip orchestration.
//!
//! [`TripAnalyzer`] runs every concrete analyzer against the same point set
//! for a date and merges the results into one time-sorted list. Analyzers
//! are independent and share no mutable state, so invocation order never
//! affects output - and overlapping classifications of the same window by
//! different analyzers are passed through rather than deduplicated.
//!
//! A day with no points at all is an error ([`AnalysisError::NoLocationData`]),
//! not an empty result: "upstream retrieval produced nothing" and "no
//! activities detected" must stay distinguishable. In trip output the same
//! distinction is carried per-day by [`DayOutcome`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::analyzers::{build_analyzers, ActivityAnalyzer};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::locations::LocationRegistry;
use crate::{ActivitySession, LocationPoint};

/// Per-day result inside a trip analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DayOutcome {
    /// Data was present; zero sessions is a legitimate quiet day
    Sessions { sessions: Vec<ActivitySession> },
    /// No location data was available for the day
    NoData,
}

impl DayOutcome {
    /// The day's sessions, when data was available.
    pub fn sessions(&self) -> Option<&[ActivitySession]> {
        match self {
            DayOutcome::Sessions { sessions } => Some(sessions),
            DayOutcome::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, DayOutcome::NoData)
    }
}

/// Orchestrates all concrete analyzers across days and date ranges.
pub struct TripAnalyzer {
    analyzers: Vec<Box<dyn ActivityAnalyzer>>,
}

impl TripAnalyzer {
    /// Build every analyzer once against a config and registry.
    ///
    /// Fails fast on a missing activity config key or a missing required
    /// named place.
    pub fn new(config: AnalysisConfig, registry: LocationRegistry) -> Result<Self> {
        let analyzers = build_analyzers(&config, Arc::new(registry))?;
        Ok(Self { analyzers })
    }

    /// Run every analyzer over one day's points and merge the results,
    /// sorted by start time (ties broken by activity tag for determinism).
    ///
    /// An empty point set is [`AnalysisError::NoLocationData`]; a day where
    /// nothing was detected returns an empty list.
    pub fn analyze_day(
        &self,
        points: &[LocationPoint],
        date: NaiveDate,
    ) -> Result<Vec<ActivitySession>> {
        if points.is_empty() {
            return Err(AnalysisError::NoLocationData { date });
        }

        let mut sessions = Vec::new();
        for analyzer in &self.analyzers {
            sessions.extend(analyzer.detect_sessions(points, date)?);
        }

        sessions.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.activity_type.cmp(&b.activity_type))
        });
        Ok(sessions)
    }

    /// Analyze every date in the inclusive range.
    ///
    /// Dates missing from `points_by_date` (or present but empty) appear in
    /// the output as [`DayOutcome::NoData`] rather than being skipped.
    pub fn analyze_trip(
        &self,
        points_by_date: &BTreeMap<NaiveDate, Vec<LocationPoint>>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, DayOutcome>> {
        let dates = date_range(start, end)?;

        let mut outcomes = BTreeMap::new();
        for date in dates {
            outcomes.insert(date, self.day_outcome(points_by_date, date)?);
        }
        Ok(outcomes)
    }

    /// Parallel variant of [`TripAnalyzer::analyze_trip`].
    ///
    /// Days are independent pure functions of their inputs, so fanning out
    /// across dates is purely a throughput optimization.
    #[cfg(feature = "parallel")]
    pub fn analyze_trip_parallel(
        &self,
        points_by_date: &BTreeMap<NaiveDate, Vec<LocationPoint>>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, DayOutcome>> {
        let dates = date_range(start, end)?;

        dates
            .par_iter()
            .map(|&date| Ok((date, self.day_outcome(points_by_date, date)?)))
            .collect()
    }

    fn day_outcome(
        &self,
        points_by_date: &BTreeMap<NaiveDate, Vec<LocationPoint>>,
        date: NaiveDate,
    ) -> Result<DayOutcome> {
        match points_by_date.get(&date) {
            Some(points) if !points.is_empty() => Ok(DayOutcome::Sessions {
                sessions: self.analyze_day(points, date)?,
            }),
            _ => Ok(DayOutcome::NoData),
        }
    }
}

fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
    if start > end {
        return Err(AnalysisError::Internal {
            message: format!("invalid date range {} to {}", start, end),
        });
    }
    Ok(start
        .iter_days()
        .take_while(|date| *date <= end)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locations::KnownLocation;
    use crate::Coordinates;
    use chrono::{DateTime, TimeZone, Utc};

    const HOME: (f64, f64) = (51.4500, -0.3000);

    fn analyzer() -> TripAnalyzer {
        let registry = LocationRegistry::from_locations(vec![
            KnownLocation::new("Home", "home", HOME.0, HOME.1),
            KnownLocation::new("Office", "office", 51.5074, -0.1278),
        ])
        .unwrap();
        TripAnalyzer::new(AnalysisConfig::default(), registry).unwrap()
    }

    /// A 35-minute sniffy walk loop near home starting at `start`.
    fn dog_walk(start: DateTime<Utc>) -> Vec<LocationPoint> {
        let loop_radius = 120.0;
        let mut theta: f64 = 0.0;
        (0..=35)
            .map(|minute| {
                if minute > 0 && minute % 5 != 0 {
                    theta += 1.2 * 60.0 / loop_radius;
                }
                let lat = HOME.0 + (loop_radius * theta.cos() - loop_radius) / 111_320.0;
                let lng = HOME.1
                    + (loop_radius * theta.sin()) / (111_320.0 * HOME.0.to_radians().cos());
                LocationPoint::new(
                    start + chrono::Duration::seconds(minute * 60),
                    Coordinates::new(lat, lng),
                )
            })
            .collect()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 18).unwrap()
    }

    #[test]
    fn test_empty_day_is_no_data_not_empty_result() {
        let trip = analyzer();
        let err = trip.analyze_day(&[], date()).unwrap_err();
        assert!(matches!(err, AnalysisError::NoLocationData { .. }));
    }

    #[test]
    fn test_day_sessions_sorted_by_start_time() {
        let trip = analyzer();
        // Two walks: 18:00 first in the input, 08:00 second
        let mut points = dog_walk(Utc.with_ymd_and_hms(2024, 3, 18, 8, 0, 0).unwrap());
        let evening = dog_walk(Utc.with_ymd_and_hms(2024, 3, 18, 18, 0, 0).unwrap());
        points.extend_from_slice(&evening);

        let sessions = trip.analyze_day(&points, date()).unwrap();
        assert!(sessions.len() >= 2);
        for pair in sessions.windows(2) {
            assert!(pair[0].start_time <= pair[1].start_time);
        }
    }

    #[test]
    fn test_quiet_day_with_data_is_empty_result() {
        let trip = analyzer();
        // A stationary afternoon hour away from any known place matches nothing
        let start = Utc.with_ymd_and_hms(2024, 3, 18, 14, 0, 0).unwrap();
        let points: Vec<LocationPoint> = (0..60)
            .map(|i| {
                LocationPoint::new(
                    start + chrono::Duration::seconds(i * 60),
                    Coordinates::new(HOME.0 + 0.05, HOME.1 + 0.05),
                )
            })
            .collect();

        let sessions = trip.analyze_day(&points, date()).unwrap();
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_trip_marks_missing_days_as_no_data() {
        let trip = analyzer();
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 18).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 3, 19).unwrap();
        let d3 = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();

        let mut by_date = BTreeMap::new();
        by_date.insert(
            d1,
            dog_walk(Utc.with_ymd_and_hms(2024, 3, 18, 8, 0, 0).unwrap()),
        );
        by_date.insert(
            d3,
            dog_walk(Utc.with_ymd_and_hms(2024, 3, 20, 8, 0, 0).unwrap()),
        );

        let outcomes = trip.analyze_trip(&by_date, d1, d3).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[&d1].is_no_data());
        assert!(outcomes[&d2].is_no_data());
        assert!(!outcomes[&d3].is_no_data());

        let day_one = outcomes[&d1].sessions().unwrap();
        assert!(day_one.iter().any(|s| s.activity_type == "dog_walking"));
    }

    #[test]
    fn test_reversed_range_rejected() {
        let trip = analyzer();
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 18).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        assert!(trip.analyze_trip(&BTreeMap::new(), d2, d1).is_err());
    }

    #[test]
    fn test_reruns_are_byte_identical() {
        let trip = analyzer();
        let points = dog_walk(Utc.with_ymd_and_hms(2024, 3, 18, 8, 0, 0).unwrap());

        let first = trip.analyze_day(&points, date()).unwrap();
        let second = trip.analyze_day(&points, date()).unwrap();

        let json_first = serde_json::to_string(&first).unwrap();
        let json_second = serde_json::to_string(&second).unwrap();
        assert_eq!(json_first, json_second);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_trip_matches_sequential() {
        let trip = analyzer();
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 18).unwrap();
        let d3 = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();

        let mut by_date = BTreeMap::new();
        by_date.insert(
            d1,
            dog_walk(Utc.with_ymd_and_hms(2024, 3, 18, 8, 0, 0).unwrap()),
        );

        let sequential = trip.analyze_trip(&by_date, d1, d3).unwrap();
        let parallel = trip.analyze_trip_parallel(&by_date, d1, d3).unwrap();
        assert_eq!(sequential, parallel);
    }
}
