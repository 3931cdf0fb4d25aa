//! Dog-walking detection.
//!
//! A dog walk is a short walking loop close to home with a characteristic
//! stop-start rhythm: mostly walking, with a modest share of stationary time
//! while the dog investigates. Long hikes and brisk point-to-point walks
//! score differently on the stationary fraction.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::{ActivityConfig, AnalysisConfig};
use crate::error::{AnalysisError, Result};
use crate::geo_utils::haversine_distance;
use crate::locations::{KnownLocation, LocationRegistry};
use crate::scoring::{proximity_score, range_score, FactorScore};
use crate::segmentation::MovementMode;
use crate::{ActivitySession, LocationPoint};

use super::{
    candidate_clusters, detail_number, duration_in_range, finish_session, ActivityAnalyzer,
    ActivityKind,
};

/// A dog walk stays within this distance of home.
const HOME_PROXIMITY_RADIUS_M: f64 = 2000.0;
/// Expected share of stationary time while the dog stops and sniffs.
const STATIONARY_FRACTION_MIN: f64 = 0.10;
const STATIONARY_FRACTION_MAX: f64 = 0.30;

/// Detects dog walks around home.
#[derive(Debug)]
pub struct DogWalkingAnalyzer {
    config: ActivityConfig,
    registry: Arc<LocationRegistry>,
    home: KnownLocation,
}

impl DogWalkingAnalyzer {
    pub fn new(config: &AnalysisConfig, registry: Arc<LocationRegistry>) -> Result<Self> {
        let config = config.activity(ActivityKind::DogWalking.as_str())?.clone();

        // Home is bound eagerly at construction; the registry is already
        // loaded, so there is nothing to defer
        let home = registry
            .by_category("home")
            .next()
            .cloned()
            .ok_or_else(|| AnalysisError::MissingLocation {
                name: "home".to_string(),
                activity_type: ActivityKind::DogWalking.as_str().to_string(),
            })?;

        Ok(Self {
            config,
            registry,
            home,
        })
    }
}

impl ActivityAnalyzer for DogWalkingAnalyzer {
    fn kind(&self) -> ActivityKind {
        ActivityKind::DogWalking
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
            let home_distance = haversine_distance(&center, &self.home.coords());
            let home_value = proximity_score(home_distance, HOME_PROXIMITY_RADIUS_M);

            let stationary = cluster.mode_duration_fraction(MovementMode::Stationary);
            let stationary_value =
                range_score(stationary, STATIONARY_FRACTION_MIN, STATIONARY_FRACTION_MAX);

            let factors = [
                FactorScore::new(
                    "home_proximity",
                    self.config.weight("home_proximity"),
                    home_value,
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
                    "stationary_fraction",
                    self.config.weight("stationary_fraction"),
                    stationary_value,
                ),
                FactorScore::new(
                    "walking_fraction",
                    self.config.weight("walking_fraction"),
                    cluster.mode_duration_fraction(MovementMode::Walking),
                ),
            ];

            let mut details = BTreeMap::new();
            details.insert(
                "distance_m".to_string(),
                detail_number(cluster.total_distance()),
            );
            details.insert(
                "stationary_pct".to_string(),
                detail_number(stationary * 100.0),
            );

            // Only name the session "home" when it actually resolves there
            let location = self.registry.resolve(&center, "home");

            if let Some(session) =
                finish_session(self.kind(), cluster, &factors, location, details)
            {
                sessions.push(session);
            }
        }

        Ok(sessions)
    }
}
