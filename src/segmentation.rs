//! Velocity segmentation and session clustering.
//!
//! Converts a time-ordered location trace into contiguous velocity segments
//! (speed, distance, duration, inferred movement mode) and clusters adjacent
//! segments into candidate sessions using an activity-specific gap tolerance.
//!
//! Consecutive points are paired into velocity steps; steps that share a
//! movement mode coalesce into one [`VelocitySegment`]. Two kinds of
//! degenerate pairs are dropped rather than treated as errors: zero-elapsed
//! pairs (duplicate fixes, which would otherwise read as infinite velocity)
//! and pairs further apart in time than the configured fix gap (a tracking
//! hole, not movement). A timestamp regression is an error - the upstream
//! feed guarantees ordering, so disorder means feed corruption.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::VelocityBands;
use crate::error::{AnalysisError, Result};
use crate::geo_utils::{haversine_distance, slope_angle};
use crate::{Coordinates, LocationPoint};

/// Movement mode inferred for a velocity segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    Stationary,
    Walking,
    Running,
    Train,
    Lift,
    Descent,
}

impl MovementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementMode::Stationary => "stationary",
            MovementMode::Walking => "walking",
            MovementMode::Running => "running",
            MovementMode::Train => "train",
            MovementMode::Lift => "lift",
            MovementMode::Descent => "descent",
        }
    }
}

/// A contiguous run of movement at a consistent mode.
///
/// Invariants: `end_time > start_time`, `velocity >= 0`, and segments
/// produced from one trace are time-ordered and non-overlapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocitySegment {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub start_coords: Coordinates,
    pub end_coords: Coordinates,
    /// Mean speed over the segment in m/s
    pub velocity: f64,
    /// Ground distance covered in meters
    pub distance: f64,
    /// Elapsed seconds
    pub duration: f64,
    pub mode: MovementMode,
    /// Mean slope angle in degrees (positive ascending), when altitude data
    /// is present
    pub slope_deg: Option<f64>,
    /// Net altitude change in meters, when altitude data is present
    pub altitude_delta: Option<f64>,
}

/// One point pair, before same-mode coalescing.
struct VelocityStep {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    start_coords: Coordinates,
    end_coords: Coordinates,
    distance: f64,
    duration: f64,
    slope_deg: Option<f64>,
    altitude_delta: Option<f64>,
    mode: MovementMode,
}

/// Classify a velocity (and optional slope) against the configured bands.
///
/// Slope-gated lift/descent bands take precedence over the flat bands;
/// velocities above the running band with no slope gate read as train.
pub fn classify_mode(velocity: f64, slope_deg: Option<f64>, bands: &VelocityBands) -> MovementMode {
    if velocity <= bands.stationary_max {
        return MovementMode::Stationary;
    }

    if let Some(slope) = slope_deg {
        if slope >= bands.min_slope_deg && bands.lift.contains(velocity) {
            return MovementMode::Lift;
        }
        if slope <= -bands.min_slope_deg && bands.descent.contains(velocity) {
            return MovementMode::Descent;
        }
    }

    if velocity <= bands.walking_max {
        MovementMode::Walking
    } else if velocity <= bands.running_max {
        MovementMode::Running
    } else {
        MovementMode::Train
    }
}

/// Segment a time-ordered trace into velocity segments.
///
/// The caller guarantees ordering; a timestamp regression returns
/// [`AnalysisError::UnorderedPoints`]. Zero-elapsed pairs and pairs further
/// apart than `max_fix_gap_seconds` are dropped, leaving a time gap between
/// the surrounding segments.
pub fn segment_points(
    points: &[LocationPoint],
    bands: &VelocityBands,
    max_fix_gap_seconds: f64,
) -> Result<Vec<VelocitySegment>> {
    if points.len() < 2 {
        return Ok(Vec::new());
    }

    let mut steps: Vec<VelocityStep> = Vec::with_capacity(points.len() - 1);

    for (i, pair) in points.windows(2).enumerate() {
        let (a, b) = (&pair[0], &pair[1]);
        let elapsed_ms = (b.timestamp - a.timestamp).num_milliseconds();

        if elapsed_ms < 0 {
            return Err(AnalysisError::UnorderedPoints { index: i + 1 });
        }
        if elapsed_ms == 0 {
            debug!("dropping degenerate pair at index {} (zero elapsed)", i);
            continue;
        }

        let duration = elapsed_ms as f64 / 1000.0;
        if duration > max_fix_gap_seconds {
            debug!(
                "fix gap of {:.0}s at index {} exceeds {:.0}s, not bridging",
                duration, i, max_fix_gap_seconds
            );
            continue;
        }

        let distance = haversine_distance(&a.coords, &b.coords);
        let velocity = distance / duration;

        let altitude_delta = match (a.altitude, b.altitude) {
            (Some(alt_a), Some(alt_b)) => Some(alt_b - alt_a),
            _ => None,
        };
        let slope_deg = altitude_delta.map(|delta| slope_angle(distance, delta));

        steps.push(VelocityStep {
            start_time: a.timestamp,
            end_time: b.timestamp,
            start_coords: a.coords,
            end_coords: b.coords,
            distance,
            duration,
            slope_deg,
            altitude_delta,
            mode: classify_mode(velocity, slope_deg, bands),
        });
    }

    Ok(coalesce_steps(steps))
}

/// Merge contiguous same-mode steps into segments.
fn coalesce_steps(steps: Vec<VelocityStep>) -> Vec<VelocitySegment> {
    let mut segments: Vec<VelocitySegment> = Vec::new();
    let mut run: Vec<VelocityStep> = Vec::new();

    for step in steps {
        let breaks_run = match run.last() {
            Some(last) => last.mode != step.mode || last.end_time != step.start_time,
            None => false,
        };
        if breaks_run {
            segments.push(merge_run(std::mem::take(&mut run)));
        }
        run.push(step);
    }
    if !run.is_empty() {
        segments.push(merge_run(run));
    }

    segments
}

fn merge_run(run: Vec<VelocityStep>) -> VelocitySegment {
    let first = run.first().expect("merge_run called with empty run");
    let last = run.last().expect("merge_run called with empty run");

    let start_time = first.start_time;
    let end_time = last.end_time;
    let start_coords = first.start_coords;
    let end_coords = last.end_coords;
    let mode = first.mode;

    let distance: f64 = run.iter().map(|s| s.distance).sum();
    let duration: f64 = run.iter().map(|s| s.duration).sum();
    let velocity = if duration > 0.0 { distance / duration } else { 0.0 };

    let altitude_delta = if run.iter().all(|s| s.altitude_delta.is_some()) {
        Some(run.iter().filter_map(|s| s.altitude_delta).sum())
    } else {
        None
    };
    let slope_deg = altitude_delta.map(|delta| slope_angle(distance, delta));

    VelocitySegment {
        start_time,
        end_time,
        start_coords,
        end_coords,
        velocity,
        distance,
        duration,
        mode,
        slope_deg,
        altitude_delta,
    }
}

/// A candidate session: a maximal run of segments whose inter-segment gaps
/// stay within the clustering tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentCluster {
    pub segments: Vec<VelocitySegment>,
}

impl SegmentCluster {
    pub fn start_time(&self) -> DateTime<Utc> {
        self.segments[0].start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.segments[self.segments.len() - 1].end_time
    }

    /// Wall-clock span of the cluster in seconds, gaps included.
    pub fn duration_seconds(&self) -> f64 {
        (self.end_time() - self.start_time()).num_milliseconds() as f64 / 1000.0
    }

    /// Seconds spent inside segments (gaps excluded).
    pub fn moving_seconds(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Total ground distance in meters.
    pub fn total_distance(&self) -> f64 {
        self.segments.iter().map(|s| s.distance).sum()
    }

    pub fn start_coords(&self) -> Coordinates {
        self.segments[0].start_coords
    }

    pub fn end_coords(&self) -> Coordinates {
        self.segments[self.segments.len() - 1].end_coords
    }

    /// Distance-weighted mean velocity over moving time.
    pub fn mean_velocity(&self) -> f64 {
        let moving = self.moving_seconds();
        if moving > 0.0 {
            self.total_distance() / moving
        } else {
            0.0
        }
    }

    /// Fastest single segment velocity.
    pub fn peak_velocity(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.velocity)
            .fold(0.0, f64::max)
    }

    /// Fraction of moving time spent in a mode, in [0, 1].
    pub fn mode_duration_fraction(&self, mode: MovementMode) -> f64 {
        let moving = self.moving_seconds();
        if moving == 0.0 {
            return 0.0;
        }
        let in_mode: f64 = self
            .segments
            .iter()
            .filter(|s| s.mode == mode)
            .map(|s| s.duration)
            .sum();
        in_mode / moving
    }

    /// Number of segments in a mode.
    pub fn mode_count(&self, mode: MovementMode) -> usize {
        self.segments.iter().filter(|s| s.mode == mode).count()
    }

    /// Centroid of segment endpoints.
    pub fn center(&self) -> Coordinates {
        let mut coords: Vec<Coordinates> =
            self.segments.iter().map(|s| s.start_coords).collect();
        coords.push(self.end_coords());
        crate::geo_utils::compute_center(&coords)
    }
}

/// Cluster segments into candidate sessions.
///
/// A session is a maximal run of segments where the gap between one
/// segment's end and the next's start stays within the tolerance; a larger
/// gap starts a new candidate.
pub fn cluster_segments(
    segments: &[VelocitySegment],
    gap_tolerance_minutes: f64,
) -> Vec<SegmentCluster> {
    if segments.is_empty() {
        return Vec::new();
    }

    let tolerance_seconds = gap_tolerance_minutes * 60.0;
    let mut clusters: Vec<SegmentCluster> = Vec::new();
    let mut current: Vec<VelocitySegment> = vec![segments[0].clone()];

    for segment in &segments[1..] {
        let previous_end = current
            .last()
            .map(|s| s.end_time)
            .expect("current cluster is never empty");
        let gap = (segment.start_time - previous_end).num_milliseconds() as f64 / 1000.0;

        if gap > tolerance_seconds {
            clusters.push(SegmentCluster {
                segments: std::mem::take(&mut current),
            });
        }
        current.push(segment.clone());
    }
    clusters.push(SegmentCluster { segments: current });

    clusters
}
