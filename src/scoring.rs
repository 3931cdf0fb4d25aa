//! Confidence scoring shared by every activity analyzer.
//!
//! This module is the only place the HIGH/MEDIUM/LOW thresholds are defined.
//! Analyzers build a set of weighted [`FactorScore`]s, combine them with
//! [`weighted_score`], and map the result through
//! [`ConfidenceLabel::from_score`] - so a HIGH parkrun means the same thing
//! as a HIGH snowboarding session.
//!
//! Scores below the floor have no label: the candidate window is discarded,
//! which is an absence from the output rather than an error.

use serde::{Deserialize, Serialize};

/// Score at or above which a session is labeled HIGH.
pub const HIGH_THRESHOLD: f64 = 0.8;
/// Score at or above which a session is labeled MEDIUM.
pub const MEDIUM_THRESHOLD: f64 = 0.6;
/// Score at or above which a session is labeled LOW. Below this floor the
/// candidate is discarded.
pub const LOW_THRESHOLD: f64 = 0.4;

/// Confidence label attached to every emitted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl ConfidenceLabel {
    /// Map a normalized score to a label.
    ///
    /// Thresholds are inclusive: exactly 0.4 is LOW and retained, anything
    /// below is `None` and the candidate is dropped.
    pub fn from_score(score: f64) -> Option<Self> {
        if score >= HIGH_THRESHOLD {
            Some(ConfidenceLabel::High)
        } else if score >= MEDIUM_THRESHOLD {
            Some(ConfidenceLabel::Medium)
        } else if score >= LOW_THRESHOLD {
            Some(ConfidenceLabel::Low)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLabel::High => "HIGH",
            ConfidenceLabel::Medium => "MEDIUM",
            ConfidenceLabel::Low => "LOW",
        }
    }
}

/// One weighted criterion contributing to a session's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    /// Factor name, matching a key in the activity's configured weights
    pub name: String,
    /// Weight from configuration (weights sum to 100 per activity)
    pub weight: f64,
    /// How well the factor matched, in [0, 1]
    pub value: f64,
}

impl FactorScore {
    pub fn new(name: &str, weight: f64, value: f64) -> Self {
        Self {
            name: name.to_string(),
            weight,
            value: value.clamp(0.0, 1.0),
        }
    }
}

/// Combine weighted factors into a normalized confidence score.
///
/// Returns the weighted mean of factor values in [0, 1]. Factors with zero
/// weight contribute nothing; an empty or all-zero-weight factor set scores
/// zero.
pub fn weighted_score(factors: &[FactorScore]) -> f64 {
    let total_weight: f64 = factors.iter().map(|f| f.weight).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }

    let weighted_sum: f64 = factors.iter().map(|f| f.weight * f.value).sum();
    (weighted_sum / total_weight).clamp(0.0, 1.0)
}

/// Score how well a value fits inside a target range.
///
/// 1.0 inside the range, falling off linearly to 0.0 at one full
/// range-width outside either edge. A degenerate range scores only exact
/// hits.
pub fn range_score(value: f64, min: f64, max: f64) -> f64 {
    let width = max - min;
    if width <= 0.0 {
        return if value == min { 1.0 } else { 0.0 };
    }

    if value >= min && value <= max {
        1.0
    } else if value < min {
        (1.0 - (min - value) / width).max(0.0)
    } else {
        (1.0 - (value - max) / width).max(0.0)
    }
}

/// Score proximity to a point: 1.0 at zero distance, linearly down to 0.0
/// at or beyond the radius.
pub fn proximity_score(distance: f64, radius: f64) -> f64 {
    if radius <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / radius).clamp(0.0, 1.0)
}
