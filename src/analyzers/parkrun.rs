//! Parkrun detection.
//!
//! A parkrun is a timed 5 km run from a registered venue on Saturday
//! morning. Detection leans on the venue (runs start at the start line, so
//! the venue is resolved from the session's first fix), the Saturday-morning
//! window, and a running-dominated 5 km of movement.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use crate::config::{ActivityConfig, AnalysisConfig};
use crate::error::Result;
use crate::geo_utils::haversine_distance;
use crate::locations::LocationRegistry;
use crate::scoring::{proximity_score, range_score, FactorScore};
use crate::segmentation::MovementMode;
use crate::{ActivitySession, LocationPoint};

use super::{
    candidate_clusters, detail_number, duration_in_range, finish_session, ActivityAnalyzer,
    ActivityKind,
};

/// Detects parkrun sessions at registered venues.
pub struct ParkrunAnalyzer {
    config: ActivityConfig,
    registry: Arc<LocationRegistry>,
}

impl ParkrunAnalyzer {
    pub fn new(config: &AnalysisConfig, registry: Arc<LocationRegistry>) -> Result<Self> {
        let config = config.activity(ActivityKind::Parkrun.as_str())?.clone();
        Ok(Self { config, registry })
    }

    /// Combined expected-day / expected-window factor value.
    ///
    /// Day and clock window contribute half each, so a Saturday afternoon
    /// run or a weekday morning run both score half marks.
    fn expected_window_value(&self, date: NaiveDate, cluster_start: chrono::DateTime<chrono::Utc>) -> f64 {
        let day_value = match self.config.expected_day {
            Some(day) => {
                if date.weekday() == day {
                    1.0
                } else {
                    0.0
                }
            }
            None => 1.0,
        };
        let window_value = match self.config.expected_window {
            Some(window) => {
                if window.contains_instant(cluster_start) {
                    1.0
                } else {
                    0.0
                }
            }
            None => 1.0,
        };
        0.5 * day_value + 0.5 * window_value
    }
}

impl ActivityAnalyzer for ParkrunAnalyzer {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Parkrun
    }

    fn detect_sessions(
        &self,
        points: &[LocationPoint],
        date: NaiveDate,
    ) -> Result<Vec<ActivitySession>> {
        let clusters = candidate_clusters(points, &self.config)?;
        let mut sessions = Vec::new();

        for cluster in &clusters {
            if !duration_in_range(self.kind(), cluster, &self.config) {
                continue;
            }

            // Runs start at the start line: resolve the venue from the
            // first fix, not the centroid of an out-and-back course
            let start = cluster.start_coords();
            let venue = self.registry.resolve(&start, "parkrun_venue");
            let venue_value = venue
                .map(|v| {
                    let distance = haversine_distance(&start, &v.coords());
                    0.5 + 0.5 * proximity_score(distance, v.radius())
                })
                .unwrap_or(0.0);

            let distance = cluster.total_distance();
            let distance_value = self
                .config
                .distance_range
                .map(|r| range_score(distance, r.min, r.max))
                .unwrap_or(0.0);

            let factors = [
                FactorScore::new(
                    "venue_proximity",
                    self.config.weight("venue_proximity"),
                    venue_value,
                ),
                FactorScore::new(
                    "expected_window",
                    self.config.weight("expected_window"),
                    self.expected_window_value(date, cluster.start_time()),
                ),
                FactorScore::new(
                    "duration_match",
                    self.config.weight("duration_match"),
                    range_score(
                        cluster.duration_seconds(),
                        self.config.duration_range.min,
                        self.config.duration_range.max,
                    ),
                ),
                FactorScore::new(
                    "distance_match",
                    self.config.weight("distance_match"),
                    distance_value,
                ),
                FactorScore::new(
                    "running_fraction",
                    self.config.weight("running_fraction"),
                    cluster.mode_duration_fraction(MovementMode::Running),
                ),
            ];

            let mut details = BTreeMap::new();
            details.insert("distance_m".to_string(), detail_number(distance));
            if distance > 0.0 {
                let pace_min_km = (cluster.moving_seconds() / 60.0) / (distance / 1000.0);
                details.insert("avg_pace_min_km".to_string(), detail_number(pace_min_km));
            }

            if let Some(session) = finish_session(self.kind(), cluster, &factors, venue, details) {
                sessions.push(session);
            }
        }

        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locations::KnownLocation;
    use crate::Coordinates;
    use chrono::{DateTime, TimeZone, Utc};

    const VENUE_LAT: f64 = 51.4123;
    const VENUE_LNG: f64 = -0.3341;

    fn registry() -> Arc<LocationRegistry> {
        Arc::new(
            LocationRegistry::from_locations(vec![KnownLocation::new(
                "Bushy Park parkrun",
                "parkrun_venue",
                VENUE_LAT,
                VENUE_LNG,
            )])
            .unwrap(),
        )
    }

    /// Out-and-back 5 km run from the venue at ~3.47 m/s, fix every 30s.
    fn saturday_run(start: DateTime<Utc>) -> Vec<LocationPoint> {
        let speed = 5000.0 / 1440.0; // 5km in 24 minutes
        (0..=48)
            .map(|i| {
                let elapsed = (i * 30) as f64;
                let along = speed * elapsed;
                // Turn around at 2.5km
                let north = if along <= 2500.0 { along } else { 5000.0 - along };
                LocationPoint::new(
                    start + chrono::Duration::seconds((i * 30) as i64),
                    Coordinates::new(VENUE_LAT + north / 111_320.0, VENUE_LNG),
                )
            })
            .collect()
    }

    #[test]
    fn test_saturday_morning_parkrun_is_high_confidence() {
        let analyzer = ParkrunAnalyzer::new(&AnalysisConfig::default(), registry()).unwrap();
        // 2024-03-16 is a Saturday
        let start = Utc.with_ymd_and_hms(2024, 3, 16, 9, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();

        let sessions = analyzer
            .detect_sessions(&saturday_run(start), date)
            .unwrap();
        assert_eq!(sessions.len(), 1);

        let session = &sessions[0];
        assert_eq!(session.activity_type, "parkrun");
        assert!(session.confidence_score >= 0.8, "score {}", session.confidence_score);
        assert_eq!(session.location_name.as_deref(), Some("Bushy Park parkrun"));

        let distance = session.details.get("distance_m").unwrap().as_f64().unwrap();
        assert!((distance - 5000.0).abs() < 100.0);
        assert!(session.details.contains_key("avg_pace_min_km"));
    }

    #[test]
    fn test_weekday_run_scores_lower() {
        let analyzer = ParkrunAnalyzer::new(&AnalysisConfig::default(), registry()).unwrap();
        // Same run on a Tuesday
        let start = Utc.with_ymd_and_hms(2024, 3, 19, 9, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 19).unwrap();

        let sessions = analyzer
            .detect_sessions(&saturday_run(start), date)
            .unwrap();
        assert_eq!(sessions.len(), 1);
        // Half the expected-window weight gone
        assert!(sessions[0].confidence_score < 0.95);
    }

    #[test]
    fn test_run_far_from_any_venue_is_discarded() {
        let analyzer = ParkrunAnalyzer::new(&AnalysisConfig::default(), registry()).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 16, 9, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();

        // Same shape of run, 50km away from the registered venue
        let points: Vec<LocationPoint> = saturday_run(start)
            .into_iter()
            .map(|p| {
                LocationPoint::new(
                    p.timestamp,
                    Coordinates::new(p.coords.latitude + 0.45, p.coords.longitude),
                )
            })
            .collect();

        let sessions = analyzer.detect_sessions(&points, date).unwrap();
        // venue 0, window 20, duration 15, distance 15, running 10 = 0.60
        // still above the floor; a plausible run, just not venue-confirmed
        if let Some(session) = sessions.first() {
            assert!(session.location_name.is_none());
            assert!(session.confidence_score < 0.8);
        }
    }

    #[test]
    fn test_slow_stroll_is_not_a_parkrun() {
        let analyzer = ParkrunAnalyzer::new(&AnalysisConfig::default(), registry()).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 16, 9, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();

        // 24 minutes of 1.0 m/s walking from the venue: distance and
        // running fraction both miss
        let points: Vec<LocationPoint> = (0..=48)
            .map(|i| {
                let north = 1.0 * (i * 30) as f64;
                LocationPoint::new(
                    start + chrono::Duration::seconds((i * 30) as i64),
                    Coordinates::new(VENUE_LAT + north / 111_320.0, VENUE_LNG),
                )
            })
            .collect();

        let sessions = analyzer.detect_sessions(&points, date).unwrap();
        // venue 40 + window 20 + duration 15 = 0.75 ceiling, but distance
        // (1.4km) scores 0 and running fraction is 0
        for session in &sessions {
            assert!(session.confidence_score < 0.8);
        }
    }
}
