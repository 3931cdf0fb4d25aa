//! Snowboarding detection.
//!
//! A day on the mountain reads as repeated lift/descent cycles at a
//! registered resort: ascending segments at chairlift speed paired with fast
//! descending segments. Each lift followed by a descent counts as one run;
//! vertical meters come from the altitude lost across descents.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::{ActivityConfig, AnalysisConfig};
use crate::error::Result;
use crate::geo_utils::haversine_distance;
use crate::locations::LocationRegistry;
use crate::scoring::{proximity_score, range_score, FactorScore};
use crate::segmentation::{MovementMode, SegmentCluster};
use crate::{ActivitySession, LocationPoint};

use super::{
    candidate_clusters, detail_number, duration_in_range, finish_session, ActivityAnalyzer,
    ActivityKind,
};

/// Run count at which the run-count factor saturates.
const TARGET_RUN_COUNT: f64 = 5.0;
/// Descent vertical at which the vertical factor saturates, in meters.
const TARGET_VERTICAL_M: f64 = 1000.0;

/// Lift/descent pairing summary for one candidate session.
#[derive(Debug, Default, PartialEq)]
struct RunStats {
    /// Completed lift → descent cycles
    runs: u32,
    /// Altitude lost across descent segments, in meters (positive)
    vertical_m: f64,
    /// Ground distance across descent segments
    descent_distance: f64,
    /// Time spent descending, in seconds
    descent_seconds: f64,
    /// Fastest descent segment velocity
    max_descent_velocity: f64,
}

impl RunStats {
    fn mean_descent_velocity(&self) -> f64 {
        if self.descent_seconds > 0.0 {
            self.descent_distance / self.descent_seconds
        } else {
            0.0
        }
    }
}

/// Pair lift segments with the descents that follow them.
///
/// Walking and stationary segments between a lift and its descent (queueing,
/// strapping in) do not break the pairing; a new lift before any descent
/// does.
fn pair_runs(cluster: &SegmentCluster) -> RunStats {
    let mut stats = RunStats::default();
    let mut lift_pending = false;

    for segment in &cluster.segments {
        match segment.mode {
            MovementMode::Lift => {
                lift_pending = true;
            }
            MovementMode::Descent => {
                if lift_pending {
                    stats.runs += 1;
                    lift_pending = false;
                }
                if let Some(delta) = segment.altitude_delta {
                    if delta < 0.0 {
                        stats.vertical_m += -delta;
                    }
                }
                stats.descent_distance += segment.distance;
                stats.descent_seconds += segment.duration;
                stats.max_descent_velocity = stats.max_descent_velocity.max(segment.velocity);
            }
            _ => {}
        }
    }

    stats
}

/// Detects snowboarding days at registered resorts.
pub struct SnowboardingAnalyzer {
    config: ActivityConfig,
    registry: Arc<LocationRegistry>,
}

impl SnowboardingAnalyzer {
    pub fn new(config: &AnalysisConfig, registry: Arc<LocationRegistry>) -> Result<Self> {
        let config = config.activity(ActivityKind::Snowboarding.as_str())?.clone();
        Ok(Self { config, registry })
    }
}

impl ActivityAnalyzer for SnowboardingAnalyzer {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Snowboarding
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
            let resort = self.registry.resolve(&center, "ski_resort");
            let resort_value = resort
                .map(|r| {
                    let distance = haversine_distance(&center, &r.coords());
                    0.5 + 0.5 * proximity_score(distance, r.radius())
                })
                .unwrap_or(0.0);

            let stats = pair_runs(cluster);

            // No descents at all means no credit, not partial range credit
            let descent_velocity_value = if stats.descent_seconds > 0.0 {
                range_score(
                    stats.mean_descent_velocity(),
                    self.config.bands.descent.min,
                    self.config.bands.descent.max,
                )
            } else {
                0.0
            };

            let factors = [
                FactorScore::new(
                    "resort_proximity",
                    self.config.weight("resort_proximity"),
                    resort_value,
                ),
                FactorScore::new(
                    "run_count",
                    self.config.weight("run_count"),
                    (stats.runs as f64 / TARGET_RUN_COUNT).clamp(0.0, 1.0),
                ),
                FactorScore::new(
                    "vertical_meters",
                    self.config.weight("vertical_meters"),
                    (stats.vertical_m / TARGET_VERTICAL_M).clamp(0.0, 1.0),
                ),
                FactorScore::new(
                    "descent_velocity",
                    self.config.weight("descent_velocity"),
                    descent_velocity_value,
                ),
            ];

            let mut details = BTreeMap::new();
            details.insert("runs".to_string(), serde_json::json!(stats.runs));
            details.insert("vertical_m".to_string(), detail_number(stats.vertical_m));
            details.insert(
                "avg_descent_velocity_ms".to_string(),
                detail_number(stats.mean_descent_velocity()),
            );
            details.insert(
                "max_descent_velocity_ms".to_string(),
                detail_number(stats.max_descent_velocity),
            );

            if let Some(session) = finish_session(self.kind(), cluster, &factors, resort, details)
            {
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

    const RESORT: (f64, f64) = (46.1920, 6.7750);
    const BASE_ALT: f64 = 1800.0;

    fn registry() -> Arc<LocationRegistry> {
        Arc::new(
            LocationRegistry::from_locations(vec![KnownLocation::new(
                "Avoriaz",
                "ski_resort",
                RESORT.0,
                RESORT.1,
            )])
            .unwrap(),
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()
    }

    /// A day of lift/descent cycles with fixes every 30 seconds.
    ///
    /// Each cycle: 8 min lift up (+120m altitude), 2 min descent back down,
    /// then a rest at the base. Total span per cycle is 45 minutes.
    fn resort_day(start: DateTime<Utc>, cycles: usize) -> Vec<LocationPoint> {
        let mut points = Vec::new();
        let mut elapsed: i64 = 0;

        let fix = |elapsed: i64, north_m: f64, altitude: f64| {
            LocationPoint::new(
                start + chrono::Duration::seconds(elapsed),
                Coordinates::new(RESORT.0 + north_m / 111_320.0, RESORT.1),
            )
            .with_altitude(altitude)
        };

        for _ in 0..cycles {
            // Lift: 16 fixes, 75m and +7.5m altitude per 30s (2.5 m/s)
            for i in 0..16 {
                points.push(fix(elapsed, 75.0 * i as f64, BASE_ALT + 7.5 * i as f64));
                elapsed += 30;
            }
            // Descent: 4 fixes, 300m and -30m altitude per 30s (10 m/s)
            for i in 0..4 {
                points.push(fix(
                    elapsed,
                    1200.0 - 300.0 * i as f64,
                    BASE_ALT + 120.0 - 30.0 * i as f64,
                ));
                elapsed += 30;
            }
            // Rest at the base: 70 fixes over 35 minutes
            for _ in 0..70 {
                points.push(fix(elapsed, 0.0, BASE_ALT));
                elapsed += 30;
            }
        }

        points
    }

    #[test]
    fn test_resort_day_detected_with_runs() {
        let analyzer =
            SnowboardingAnalyzer::new(&AnalysisConfig::default(), registry()).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap();

        // Eight cycles over six hours
        let sessions = analyzer
            .detect_sessions(&resort_day(start, 8), date())
            .unwrap();
        assert_eq!(sessions.len(), 1);

        let session = &sessions[0];
        assert_eq!(session.activity_type, "snowboarding");
        assert_eq!(session.location_name.as_deref(), Some("Avoriaz"));
        assert_eq!(session.details.get("runs"), Some(&serde_json::json!(8)));

        let vertical = session.details.get("vertical_m").unwrap().as_f64().unwrap();
        assert!(vertical > 0.0);
        assert!((vertical - 960.0).abs() < 10.0);

        let avg_v = session
            .details
            .get("avg_descent_velocity_ms")
            .unwrap()
            .as_f64()
            .unwrap();
        assert!((avg_v - 10.0).abs() < 1.0);
        assert!(session.confidence_score >= 0.8);
    }

    #[test]
    fn test_flat_walk_at_resort_scores_below_floor() {
        let analyzer =
            SnowboardingAnalyzer::new(&AnalysisConfig::default(), registry()).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap();

        // Ninety minutes of flat walking at the resort: no lifts, no runs
        let points: Vec<LocationPoint> = (0..180)
            .map(|i| {
                LocationPoint::new(
                    start + chrono::Duration::seconds(i * 30),
                    Coordinates::new(RESORT.0 + 1.2 * (i * 30) as f64 / 111_320.0, RESORT.1),
                )
                .with_altitude(BASE_ALT)
            })
            .collect();

        let sessions = analyzer.detect_sessions(&points, date()).unwrap();
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_pair_runs_requires_lift_before_descent() {
        use crate::config::VelocityBands;
        use crate::segmentation::{cluster_segments, segment_points};

        let start = Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap();
        // Descent first, then a lift with no following descent: zero runs
        let mut points = Vec::new();
        for i in 0..4 {
            points.push(
                LocationPoint::new(
                    start + chrono::Duration::seconds(i * 30),
                    Coordinates::new(
                        RESORT.0 + (1200.0 - 300.0 * i as f64) / 111_320.0,
                        RESORT.1,
                    ),
                )
                .with_altitude(BASE_ALT + 120.0 - 30.0 * i as f64),
            );
        }
        for i in 0..16 {
            points.push(
                LocationPoint::new(
                    start + chrono::Duration::seconds(120 + i * 30),
                    Coordinates::new(RESORT.0 + (75.0 * i as f64) / 111_320.0, RESORT.1),
                )
                .with_altitude(BASE_ALT + 7.5 * i as f64),
            );
        }

        let segments = segment_points(&points, &VelocityBands::default(), 300.0).unwrap();
        let clusters = cluster_segments(&segments, 20.0);
        assert_eq!(clusters.len(), 1);

        let stats = pair_runs(&clusters[0]);
        assert_eq!(stats.runs, 0);
        // The unpaired descent still contributes vertical
        assert!(stats.vertical_m > 0.0);
    }
}
