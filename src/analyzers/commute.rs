//! Commute detection.
//!
//! A commute is a home-office transit in one of two clock windows: morning
//! (06:00-10:00, home → office) or evening (16:00-20:00, office → home).
//! Candidates outside both windows are dropped outright. Direction comes
//! from the window plus which named place the session starts near; a
//! train-speed stretch and weekday timing raise confidence.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use log::debug;
use once_cell::sync::Lazy;

use crate::config::{ActivityConfig, AnalysisConfig};
use crate::error::{AnalysisError, Result};
use crate::geo_utils::haversine_distance;
use crate::locations::{KnownLocation, LocationRegistry};
use crate::scoring::{range_score, FactorScore};
use crate::time_utils::ClockWindow;
use crate::{ActivitySession, Coordinates, LocationPoint};

use super::{
    candidate_clusters, detail_number, duration_in_range, finish_session, ActivityAnalyzer,
    ActivityKind,
};

/// Morning commute window, home → office.
static MORNING_WINDOW: Lazy<ClockWindow> =
    Lazy::new(|| ClockWindow::parse("06:00", "10:00").expect("static clock window"));
/// Evening commute window, office → home.
static EVENING_WINDOW: Lazy<ClockWindow> =
    Lazy::new(|| ClockWindow::parse("16:00", "20:00").expect("static clock window"));

/// How close a session endpoint must be to home/office to count as a match.
/// Falls off to zero at twice this radius.
const ENDPOINT_RADIUS_M: f64 = 500.0;

/// Which commute window a candidate starts in.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CommuteDirection {
    ToOffice,
    ToHome,
}

impl CommuteDirection {
    fn as_str(&self) -> &'static str {
        match self {
            CommuteDirection::ToOffice => "to_office",
            CommuteDirection::ToHome => "to_home",
        }
    }
}

/// Endpoint proximity: full marks within the radius, linear falloff to zero
/// at twice the radius.
fn endpoint_score(distance: f64) -> f64 {
    (2.0 - distance / ENDPOINT_RADIUS_M).clamp(0.0, 1.0)
}

/// Detects home-office commutes.
#[derive(Debug)]
pub struct CommuteAnalyzer {
    config: ActivityConfig,
    home: KnownLocation,
    office: KnownLocation,
}

impl CommuteAnalyzer {
    pub fn new(config: &AnalysisConfig, registry: Arc<LocationRegistry>) -> Result<Self> {
        let config = config.activity(ActivityKind::Commute.as_str())?.clone();

        // Home and office are bound eagerly: without both, the analyzer
        // cannot derive direction and must not be constructed
        let home = registry
            .by_category("home")
            .next()
            .cloned()
            .ok_or_else(|| AnalysisError::MissingLocation {
                name: "home".to_string(),
                activity_type: ActivityKind::Commute.as_str().to_string(),
            })?;
        let office = registry
            .by_category("office")
            .next()
            .cloned()
            .ok_or_else(|| AnalysisError::MissingLocation {
                name: "office".to_string(),
                activity_type: ActivityKind::Commute.as_str().to_string(),
            })?;

        Ok(Self {
            config,
            home,
            office,
        })
    }

    /// Origin and destination coordinates for a direction.
    fn endpoints(&self, direction: CommuteDirection) -> (Coordinates, Coordinates) {
        match direction {
            CommuteDirection::ToOffice => (self.home.coords(), self.office.coords()),
            CommuteDirection::ToHome => (self.office.coords(), self.home.coords()),
        }
    }

    fn origin(&self, direction: CommuteDirection) -> &KnownLocation {
        match direction {
            CommuteDirection::ToOffice => &self.home,
            CommuteDirection::ToHome => &self.office,
        }
    }
}

impl ActivityAnalyzer for CommuteAnalyzer {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Commute
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

            // Outside both commute windows the candidate is dropped
            let start_time = cluster.start_time();
            let direction = if MORNING_WINDOW.contains_instant(start_time) {
                CommuteDirection::ToOffice
            } else if EVENING_WINDOW.contains_instant(start_time) {
                CommuteDirection::ToHome
            } else {
                debug!(
                    "commute: candidate at {} outside commute windows",
                    start_time.time()
                );
                continue;
            };

            let (expected_origin, expected_destination) = self.endpoints(direction);
            let start_match =
                endpoint_score(haversine_distance(&cluster.start_coords(), &expected_origin));
            let end_match = endpoint_score(haversine_distance(
                &cluster.end_coords(),
                &expected_destination,
            ));
            let endpoint_value = 0.5 * start_match + 0.5 * end_match;

            let weekday_value = match date.weekday() {
                Weekday::Sat | Weekday::Sun => 0.25,
                _ => 1.0,
            };

            let transit_value =
                (cluster.peak_velocity() / self.config.bands.train_min).clamp(0.0, 1.0);

            let factors = [
                FactorScore::new(
                    "endpoint_match",
                    self.config.weight("endpoint_match"),
                    endpoint_value,
                ),
                FactorScore::new(
                    "commute_window",
                    self.config.weight("commute_window"),
                    weekday_value,
                ),
                FactorScore::new(
                    "transit_velocity",
                    self.config.weight("transit_velocity"),
                    transit_value,
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
            ];

            let mut details = BTreeMap::new();
            details.insert(
                "direction".to_string(),
                serde_json::json!(direction.as_str()),
            );
            details.insert(
                "distance_m".to_string(),
                detail_number(cluster.total_distance()),
            );
            details.insert(
                "max_velocity_ms".to_string(),
                detail_number(cluster.peak_velocity()),
            );

            if let Some(session) = finish_session(
                self.kind(),
                cluster,
                &factors,
                Some(self.origin(direction)),
                details,
            ) {
                sessions.push(session);
            }
        }

        Ok(sessions)
    }
}
