//! Analysis configuration: per-activity thresholds and scoring weights.
//!
//! The configuration is a static, human-editable JSON document keyed by
//! activity type. It is loaded once at startup, validated eagerly, and passed
//! by reference into each analyzer - there is no global mutable state and no
//! hot reload.
//!
//! ## Example document
//!
//! ```json
//! {
//!   "activities": {
//!     "parkrun": {
//!       "duration_range": { "min": 900.0, "max": 3600.0 },
//!       "distance_range": { "min": 4000.0, "max": 6000.0 },
//!       "gap_tolerance_minutes": 5.0,
//!       "expected_day": "Sat",
//!       "expected_window": { "start": "08:00", "end": "11:00" },
//!       "weights": {
//!         "venue_proximity": 40.0,
//!         "expected_window": 20.0,
//!         "duration_match": 15.0,
//!         "distance_match": 15.0,
//!         "running_fraction": 10.0
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Omitted fields fall back to the built-in defaults below; an activity
//! analyzer whose key is missing entirely fails construction.

use std::collections::BTreeMap;

use chrono::Weekday;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::time_utils::{ClockWindow, PeriodWindows};

/// Tolerance when checking that factor weights sum to 100.
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// An inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check whether a value falls inside the range (inclusive).
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Width of the range.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Velocity thresholds (m/s) used to classify movement modes.
///
/// Lift and descent bands apply only when the slope gate is met; everything
/// else is banded by velocity alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityBands {
    /// At or below: stationary
    pub stationary_max: f64,
    /// At or below (and above stationary): walking
    pub walking_max: f64,
    /// At or below (and above walking): running
    pub running_max: f64,
    /// At or above: train. Velocities between `running_max` and `train_min`
    /// with no slope gate also classify as train (fast, non-ambulatory).
    pub train_min: f64,
    /// Lift band, ascending slope required
    pub lift: Range,
    /// Descent band, descending slope required
    pub descent: Range,
    /// Minimum slope magnitude in degrees to engage the lift/descent bands
    pub min_slope_deg: f64,
}

impl Default for VelocityBands {
    fn default() -> Self {
        Self {
            stationary_max: 0.5,
            walking_max: 2.5,
            running_max: 5.0,
            train_min: 10.0,
            lift: Range::new(1.5, 6.0),
            descent: Range::new(5.0, 20.0),
            min_slope_deg: 3.0,
        }
    }
}

/// Tunable thresholds for one activity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Velocity bands for mode classification
    #[serde(default)]
    pub bands: VelocityBands,

    /// Candidate sessions outside this duration range (seconds) are discarded
    pub duration_range: Range,

    /// Expected total distance (meters); scored, not a hard filter
    #[serde(default)]
    pub distance_range: Option<Range>,

    /// Maximum gap between velocity segments clustered into one session
    pub gap_tolerance_minutes: f64,

    /// Consecutive fixes further apart in time than this are not bridged
    /// into a velocity pair; the resulting gap splits candidate sessions
    #[serde(default = "default_max_fix_gap")]
    pub max_fix_gap_seconds: f64,

    /// Day of week the activity is expected on, if any
    #[serde(default)]
    pub expected_day: Option<Weekday>,

    /// Clock window the activity is expected in, if any
    #[serde(default)]
    pub expected_window: Option<ClockWindow>,

    /// Confidence factor weights, summing to 100
    pub weights: BTreeMap<String, f64>,
}

fn default_max_fix_gap() -> f64 {
    300.0
}

impl ActivityConfig {
    /// Weight for a named confidence factor (0 if unknown).
    pub fn weight(&self, factor: &str) -> f64 {
        self.weights.get(factor).copied().unwrap_or(0.0)
    }

    fn validate(&self, activity_type: &str) -> Result<()> {
        if self.duration_range.min < 0.0 || self.duration_range.max <= self.duration_range.min {
            return Err(AnalysisError::invalid_config(format!(
                "'{}': duration_range must satisfy 0 <= min < max",
                activity_type
            )));
        }
        if let Some(range) = &self.distance_range {
            if range.min < 0.0 || range.max <= range.min {
                return Err(AnalysisError::invalid_config(format!(
                    "'{}': distance_range must satisfy 0 <= min < max",
                    activity_type
                )));
            }
        }
        if self.gap_tolerance_minutes < 0.0 {
            return Err(AnalysisError::invalid_config(format!(
                "'{}': gap_tolerance_minutes must be non-negative",
                activity_type
            )));
        }
        if self.weights.is_empty() {
            return Err(AnalysisError::invalid_config(format!(
                "'{}': no confidence factor weights",
                activity_type
            )));
        }
        if let Some((name, weight)) = self.weights.iter().find(|(_, w)| **w < 0.0) {
            return Err(AnalysisError::invalid_config(format!(
                "'{}': factor '{}' has negative weight {}",
                activity_type, name, weight
            )));
        }
        let sum: f64 = self.weights.values().sum();
        if (sum - 100.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(AnalysisError::invalid_config(format!(
                "'{}': factor weights sum to {}, expected 100",
                activity_type, sum
            )));
        }
        Ok(())
    }
}

/// The full analysis configuration: one [`ActivityConfig`] per activity type
/// plus shared time-period windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub activities: BTreeMap<String, ActivityConfig>,

    /// Clock windows for morning/afternoon/evening/night filtering
    #[serde(default)]
    pub periods: PeriodWindows,
}

impl AnalysisConfig {
    /// Parse and validate a configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)
            .map_err(|e| AnalysisError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Look up the configuration sub-tree for an activity type.
    ///
    /// Analyzers call this at construction and fail fast when their key is
    /// absent - an analyzer cannot run without its thresholds.
    pub fn activity(&self, activity_type: &str) -> Result<&ActivityConfig> {
        self.activities
            .get(activity_type)
            .ok_or_else(|| AnalysisError::MissingActivityConfig {
                activity_type: activity_type.to_string(),
            })
    }

    /// Validate every activity entry.
    pub fn validate(&self) -> Result<()> {
        for (activity_type, config) in &self.activities {
            config.validate(activity_type)?;
        }
        Ok(())
    }
}

/// Built-in default thresholds, constructed once.
static DEFAULT_CONFIG: Lazy<AnalysisConfig> = Lazy::new(build_default_config);

impl Default for AnalysisConfig {
    fn default() -> Self {
        DEFAULT_CONFIG.clone()
    }
}

fn weights(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries
        .iter()
        .map(|(name, weight)| (name.to_string(), *weight))
        .collect()
}

fn build_default_config() -> AnalysisConfig {
    let mut activities = BTreeMap::new();

    // Golf: long walking session at a course, 2-6 hours
    activities.insert(
        "golf".to_string(),
        ActivityConfig {
            bands: VelocityBands::default(),
            duration_range: Range::new(7200.0, 21600.0),
            distance_range: Some(Range::new(3000.0, 10000.0)),
            gap_tolerance_minutes: 15.0,
            max_fix_gap_seconds: 600.0,
            expected_day: None,
            expected_window: None,
            weights: weights(&[
                ("venue_proximity", 40.0),
                ("duration_match", 25.0),
                ("walking_fraction", 20.0),
                ("distance_match", 15.0),
            ]),
        },
    );

    // Parkrun: 5km timed run, Saturday mornings
    activities.insert(
        "parkrun".to_string(),
        ActivityConfig {
            bands: VelocityBands::default(),
            duration_range: Range::new(900.0, 3600.0),
            distance_range: Some(Range::new(4000.0, 6000.0)),
            gap_tolerance_minutes: 5.0,
            max_fix_gap_seconds: 300.0,
            expected_day: Some(Weekday::Sat),
            expected_window: ClockWindow::parse("08:00", "11:00"),
            weights: weights(&[
                ("venue_proximity", 40.0),
                ("expected_window", 20.0),
                ("duration_match", 15.0),
                ("distance_match", 15.0),
                ("running_fraction", 10.0),
            ]),
        },
    );

    // Commute: home-office transit, loose gap tolerance to absorb
    // station waits
    activities.insert(
        "commute".to_string(),
        ActivityConfig {
            bands: VelocityBands::default(),
            duration_range: Range::new(1200.0, 5400.0),
            distance_range: None,
            gap_tolerance_minutes: 20.0,
            max_fix_gap_seconds: 600.0,
            expected_day: None,
            expected_window: None,
            weights: weights(&[
                ("endpoint_match", 40.0),
                ("commute_window", 25.0),
                ("transit_velocity", 20.0),
                ("duration_match", 15.0),
            ]),
        },
    );

    // Dog walking: short loop from home with sniff stops
    activities.insert(
        "dog_walking".to_string(),
        ActivityConfig {
            bands: VelocityBands::default(),
            duration_range: Range::new(900.0, 4500.0),
            distance_range: None,
            gap_tolerance_minutes: 5.0,
            max_fix_gap_seconds: 300.0,
            expected_day: None,
            expected_window: None,
            weights: weights(&[
                ("home_proximity", 35.0),
                ("duration_match", 25.0),
                ("stationary_fraction", 20.0),
                ("walking_fraction", 20.0),
            ]),
        },
    );

    // Snowboarding: lift/descent cycles at a resort, loose gap tolerance
    // for lift queues
    activities.insert(
        "snowboarding".to_string(),
        ActivityConfig {
            bands: VelocityBands::default(),
            duration_range: Range::new(3600.0, 28800.0),
            distance_range: None,
            gap_tolerance_minutes: 20.0,
            max_fix_gap_seconds: 600.0,
            expected_day: None,
            expected_window: None,
            weights: weights(&[
                ("resort_proximity", 35.0),
                ("run_count", 25.0),
                ("vertical_meters", 20.0),
                ("descent_velocity", 20.0),
            ]),
        },
    );

    AnalysisConfig {
        activities,
        periods: PeriodWindows::default(),
    }
}
