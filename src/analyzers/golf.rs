//! Golf round detection.
//!
//! A golf round reads as several hours of slow walking concentrated around a
//! registered course: long duration, walking-dominated movement, and a total
//! distance matching 9 or 18 holes of ground covered.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

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

/// Total distances that read as 9 holes of walking.
const NINE_HOLE_RANGE: (f64, f64) = (3000.0, 5000.0);
/// Total distances that read as 18 holes.
const EIGHTEEN_HOLE_RANGE: (f64, f64) = (6000.0, 10000.0);

/// Holes played, inferred from total ground distance.
///
/// Distances between the 9- and 18-hole buckets give no inference.
fn holes_for_distance(distance_m: f64) -> Option<u32> {
    if distance_m >= NINE_HOLE_RANGE.0 && distance_m < NINE_HOLE_RANGE.1 {
        Some(9)
    } else if distance_m >= EIGHTEEN_HOLE_RANGE.0 && distance_m <= EIGHTEEN_HOLE_RANGE.1 {
        Some(18)
    } else {
        None
    }
}

/// Detects golf rounds at registered courses.
pub struct GolfAnalyzer {
    config: ActivityConfig,
    registry: Arc<LocationRegistry>,
}

impl GolfAnalyzer {
    pub fn new(config: &AnalysisConfig, registry: Arc<LocationRegistry>) -> Result<Self> {
        let config = config.activity(ActivityKind::Golf.as_str())?.clone();
        Ok(Self { config, registry })
    }
}

impl ActivityAnalyzer for GolfAnalyzer {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Golf
    }

    fn detect_sessions(
        &self,
        points: &[LocationPoint],
        _date: NaiveDate,
    ) -> Result<Vec<ActivitySession>> {
        let clusters = candidate_clusters(points, &self.config)?;
        let mut sessions = Vec::new();

        for cluster in &clusters {
            if !duration_in_range(self.kind(), cluster, &self.config) {
                continue;
            }

            let center = cluster.center();
            let course = self.registry.resolve(&center, "golf_course");
            let venue_value = course
                .map(|c| {
                    let distance = haversine_distance(&center, &c.coords());
                    0.5 + 0.5 * proximity_score(distance, c.radius())
                })
                .unwrap_or(0.0);

            let duration = cluster.duration_seconds();
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
                    "duration_match",
                    self.config.weight("duration_match"),
                    range_score(
                        duration,
                        self.config.duration_range.min,
                        self.config.duration_range.max,
                    ),
                ),
                FactorScore::new(
                    "walking_fraction",
                    self.config.weight("walking_fraction"),
                    cluster.mode_duration_fraction(MovementMode::Walking),
                ),
                FactorScore::new(
                    "distance_match",
                    self.config.weight("distance_match"),
                    distance_value,
                ),
            ];

            let mut details = BTreeMap::new();
            details.insert("distance_m".to_string(), detail_number(distance));
            if let Some(holes) = holes_for_distance(distance) {
                details.insert("holes".to_string(), serde_json::json!(holes));
            }

            if let Some(session) = finish_session(self.kind(), cluster, &factors, course, details)
            {
                sessions.push(session);
            }
        }

        Ok(sessions)
    }
}
