//! # Activity Detector
//!
//! Activity detection and confidence scoring for GPS location traces.
//!
//! This library classifies segments of a raw location trace into real-world
//! activities - golf, parkrun, commuting, dog walking, snowboarding - using
//! velocity/time/location heuristics with weighted confidence scoring.
//!
//! The pipeline: raw location points → velocity segmentation → gap-tolerance
//! clustering → per-activity filters and weighted scoring → time-sorted
//! [`ActivitySession`] records per day.
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel multi-day trip analysis with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use activity_detector::{
//!     AnalysisConfig, Coordinates, KnownLocation, LocationPoint, LocationRegistry,
//!     TripAnalyzer,
//! };
//! use chrono::{NaiveDate, TimeZone, Utc};
//!
//! let registry = LocationRegistry::from_locations(vec![
//!     KnownLocation::new("Home", "home", 51.4500, -0.3000),
//!     KnownLocation::new("Office", "office", 51.5074, -0.1278),
//! ]).unwrap();
//!
//! let analyzer = TripAnalyzer::new(AnalysisConfig::default(), registry).unwrap();
//!
//! let start = Utc.with_ymd_and_hms(2024, 3, 16, 9, 0, 0).unwrap();
//! let points: Vec<LocationPoint> = (0..10)
//!     .map(|i| LocationPoint::new(
//!         start + chrono::Duration::seconds(i * 60),
//!         Coordinates::new(51.45 + i as f64 * 0.0001, -0.30),
//!     ))
//!     .collect();
//!
//! let date = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();
//! let sessions = analyzer.analyze_day(&points, date).unwrap();
//! for session in &sessions {
//!     println!("{} {} ({:.2})", session.activity_type,
//!              session.confidence_label.as_str(), session.confidence_score);
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{AnalysisError, Result};

// Geographic utilities (distance, center, slope calculations)
pub mod geo_utils;

// Timestamp parsing, clock windows, time-of-day filtering
pub mod time_utils;
pub use time_utils::{ClockWindow, PeriodWindows, RawTimestamp, TimePeriod};

// Analysis configuration (per-activity thresholds and weights)
pub mod config;
pub use config::{ActivityConfig, AnalysisConfig, Range, VelocityBands};

// Known-location registry with spatial lookup
pub mod locations;
pub use locations::{KnownLocation, LocationRegistry};

// Velocity segmentation and session clustering
pub mod segmentation;
pub use segmentation::{
    classify_mode, cluster_segments, segment_points, MovementMode, SegmentCluster,
    VelocitySegment,
};

// Shared confidence scoring (the one home of HIGH/MEDIUM/LOW)
pub mod scoring;
pub use scoring::{ConfidenceLabel, FactorScore};

// Concrete activity analyzers (closed set)
pub mod analyzers;
pub use analyzers::{
    build_analyzers, ActivityAnalyzer, ActivityKind, CommuteAnalyzer, DogWalkingAnalyzer,
    GolfAnalyzer, ParkrunAnalyzer, SnowboardingAnalyzer,
};

// Day/trip orchestration
pub mod trip;
pub use trip::{DayOutcome, TripAnalyzer};

// ============================================================================
// Core Types
// ============================================================================

/// A latitude/longitude coordinate pair in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Create a new coordinate pair.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the coordinates are valid.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A single location fix, immutable once ingested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    pub timestamp: DateTime<Utc>,
    pub coords: Coordinates,
    /// Altitude above sea level in meters, when the fix carries one
    pub altitude: Option<f64>,
    /// Reported horizontal accuracy in meters
    pub accuracy: Option<f64>,
}

impl LocationPoint {
    pub fn new(timestamp: DateTime<Utc>, coords: Coordinates) -> Self {
        Self {
            timestamp,
            coords,
            altitude: None,
            accuracy: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
}

/// A location fix as it appears in raw feed data, before timestamp
/// validation. Field names follow OwnTracks-style exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLocationPoint {
    #[serde(alias = "tst")]
    pub timestamp: RawTimestamp,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, alias = "alt")]
    pub altitude: Option<f64>,
    #[serde(default, alias = "acc")]
    pub accuracy: Option<f64>,
}

/// Convert raw feed points into validated [`LocationPoint`]s.
///
/// Points with unrecognizable timestamps or invalid coordinates are dropped
/// with a warning - a bad fix loses one point, never the day.
pub fn ingest_points(raw: &[RawLocationPoint]) -> Vec<LocationPoint> {
    raw.iter()
        .filter_map(|r| {
            let coords = Coordinates::new(r.lat, r.lon);
            if !coords.is_valid() {
                log::warn!("dropping point with invalid coordinates ({}, {})", r.lat, r.lon);
                return None;
            }
            match time_utils::parse_timestamp(&r.timestamp) {
                Some(timestamp) => {
                    let mut point = LocationPoint::new(timestamp, coords);
                    point.altitude = r.altitude;
                    point.accuracy = r.accuracy;
                    Some(point)
                }
                None => {
                    log::warn!("dropping point with unparseable timestamp {:?}", r.timestamp);
                    None
                }
            }
        })
        .collect()
}

/// A time-bounded, confidence-scored classification of a trace segment as a
/// specific real-world activity.
///
/// Immutable once returned; callers may merge and sort sessions but not
/// mutate their internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySession {
    /// Activity tag ("golf", "parkrun", "commute", ...)
    pub activity_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Wall-clock duration in hours
    pub duration_hours: f64,
    /// Resolved known location, when one matched
    pub location_name: Option<String>,
    /// Resolved location coordinates, or the session's centroid
    pub location_coords: Coordinates,
    pub confidence_label: ConfidenceLabel,
    /// Normalized confidence in [0, 1]
    pub confidence_score: f64,
    /// Activity-specific key/value details (holes played, vertical meters,
    /// direction, ...). BTreeMap keeps serialization deterministic.
    pub details: BTreeMap<String, serde_json::Value>,
}

impl ActivitySession {
    /// Wall-clock duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.duration_hours * 3600.0
    }

    /// Human-readable duration ("1h 24m").
    pub fn formatted_duration(&self) -> String {
        time_utils::format_duration(self.duration_seconds())
    }
}

// ============================================================================
// Tests
// ============================================================================
