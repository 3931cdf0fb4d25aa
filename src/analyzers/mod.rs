//! Concrete activity analyzers.
//!
//! The analyzer set is closed: golf, parkrun, commute, dog walking and
//! snowboarding. Each analyzer consumes the same time-ordered point trace,
//! segments and clusters it with its own gap tolerance, filters candidate
//! sessions by duration, and scores weighted confidence factors. Candidates
//! scoring below the shared floor are silently discarded.
//!
//! Analyzers are independent: they share no mutable state, and invocation
//! order never affects results. Overlapping classifications of the same time
//! window by different analyzers are allowed and left to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{ActivityConfig, AnalysisConfig};
use crate::error::Result;
use crate::locations::{KnownLocation, LocationRegistry};
use crate::scoring::{weighted_score, ConfidenceLabel, FactorScore};
use crate::segmentation::{cluster_segments, segment_points, SegmentCluster};
use crate::{ActivitySession, LocationPoint};

pub mod commute;
pub mod dog_walking;
pub mod golf;
pub mod parkrun;
pub mod snowboarding;

pub use commute::CommuteAnalyzer;
pub use dog_walking::DogWalkingAnalyzer;
pub use golf::GolfAnalyzer;
pub use parkrun::ParkrunAnalyzer;
pub use snowboarding::SnowboardingAnalyzer;

/// The closed set of detectable activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Golf,
    Parkrun,
    Commute,
    DogWalking,
    Snowboarding,
}

impl ActivityKind {
    /// All kinds, in canonical order.
    pub const ALL: [ActivityKind; 5] = [
        ActivityKind::Golf,
        ActivityKind::Parkrun,
        ActivityKind::Commute,
        ActivityKind::DogWalking,
        ActivityKind::Snowboarding,
    ];

    /// Activity tag used in configuration keys and session output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Golf => "golf",
            ActivityKind::Parkrun => "parkrun",
            ActivityKind::Commute => "commute",
            ActivityKind::DogWalking => "dog_walking",
            ActivityKind::Snowboarding => "snowboarding",
        }
    }
}

/// Common contract for all concrete analyzers.
///
/// `detect_sessions` either classifies candidate windows as this activity -
/// at or above the minimum confidence floor - or discards them; a discarded
/// window is simply absent from the output, not an error.
pub trait ActivityAnalyzer: Send + Sync {
    fn kind(&self) -> ActivityKind;

    fn detect_sessions(
        &self,
        points: &[LocationPoint],
        date: NaiveDate,
    ) -> Result<Vec<ActivitySession>>;
}

/// Construct all five analyzers against one config and registry.
///
/// Fails fast if any analyzer's configuration key is absent or a required
/// named place (home, office) is not registered.
pub fn build_analyzers(
    config: &AnalysisConfig,
    registry: Arc<LocationRegistry>,
) -> Result<Vec<Box<dyn ActivityAnalyzer>>> {
    Ok(vec![
        Box::new(GolfAnalyzer::new(config, Arc::clone(&registry))?),
        Box::new(ParkrunAnalyzer::new(config, Arc::clone(&registry))?),
        Box::new(CommuteAnalyzer::new(config, Arc::clone(&registry))?),
        Box::new(DogWalkingAnalyzer::new(config, Arc::clone(&registry))?),
        Box::new(SnowboardingAnalyzer::new(config, registry)?),
    ])
}

/// Segment and cluster a trace using an activity's own thresholds.
pub(crate) fn candidate_clusters(
    points: &[LocationPoint],
    config: &ActivityConfig,
) -> Result<Vec<SegmentCluster>> {
    let segments = segment_points(points, &config.bands, config.max_fix_gap_seconds)?;
    Ok(cluster_segments(&segments, config.gap_tolerance_minutes))
}

/// Apply the duration hard filter; logs and reports whether the candidate
/// survives.
pub(crate) fn duration_in_range(
    kind: ActivityKind,
    cluster: &SegmentCluster,
    config: &ActivityConfig,
) -> bool {
    let duration = cluster.duration_seconds();
    let keep = config.duration_range.contains(duration);
    if !keep {
        debug!(
            "{}: discarding candidate of {:.0}s (range {:.0}-{:.0}s)",
            kind.as_str(),
            duration,
            config.duration_range.min,
            config.duration_range.max
        );
    }
    keep
}

/// Score factors, map through the shared label thresholds, and build the
/// session - or discard the candidate when the score is below the floor.
pub(crate) fn finish_session(
    kind: ActivityKind,
    cluster: &SegmentCluster,
    factors: &[FactorScore],
    location: Option<&KnownLocation>,
    details: BTreeMap<String, serde_json::Value>,
) -> Option<ActivitySession> {
    let score = weighted_score(factors);
    let label = match ConfidenceLabel::from_score(score) {
        Some(label) => label,
        None => {
            debug!(
                "{}: discarding candidate scoring {:.3} (below floor)",
                kind.as_str(),
                score
            );
            return None;
        }
    };

    let duration_hours = cluster.duration_seconds() / 3600.0;
    Some(ActivitySession {
        activity_type: kind.as_str().to_string(),
        start_time: cluster.start_time(),
        end_time: cluster.end_time(),
        duration_hours,
        location_name: location.map(|l| l.name.clone()),
        location_coords: location.map(|l| l.coords()).unwrap_or_else(|| cluster.center()),
        confidence_label: label,
        confidence_score: score,
        details,
    })
}

/// JSON number rounded to one decimal, for stable detail values.
pub(crate) fn detail_number(value: f64) -> serde_json::Value {
    let rounded = (value * 10.0).round() / 10.0;
    serde_json::Number::from_f64(rounded)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
