//! Timestamp parsing, clock windows and time-of-day filtering.
//!
//! Location feeds are inconsistent about timestamps: OwnTracks exports carry
//! Unix integer seconds, some exporters emit fractional seconds, and replayed
//! archives often carry ISO-8601 strings. [`parse_timestamp`] accepts all
//! three and rejects everything else, so a bad timestamp drops a single point
//! instead of poisoning a whole day with epoch times.
//!
//! Clock windows are half-open `[start, end)` ranges of wall-clock time that
//! may wrap past midnight: a night window of 22:00-06:00 contains both 23:30
//! and 00:30.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::LocationPoint;

/// A timestamp as it appears in raw feed data, before validation.
///
/// Untagged so that JSON numbers and strings both deserialize directly.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Unix seconds since the epoch
    Int(i64),
    /// Unix seconds with a fractional part
    Float(f64),
    /// ISO-8601 / RFC 3339 string
    Text(String),
}

/// Parse a raw timestamp into UTC time.
///
/// Accepts Unix integer seconds, Unix float seconds, and ISO-8601 strings
/// (with or without an explicit offset; naive strings are taken as UTC).
/// Returns `None` for anything unrecognized - callers must drop the point,
/// never substitute zero or the epoch.
///
/// # Example
///
/// ```rust
/// use activity_detector::time_utils::{parse_timestamp, RawTimestamp};
///
/// assert!(parse_timestamp(&RawTimestamp::Int(1710592200)).is_some());
/// assert!(parse_timestamp(&RawTimestamp::Text("2024-03-16T09:10:00Z".into())).is_some());
/// assert!(parse_timestamp(&RawTimestamp::Text("last tuesday".into())).is_none());
/// ```
pub fn parse_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    match raw {
        RawTimestamp::Int(secs) => DateTime::<Utc>::from_timestamp(*secs, 0),
        RawTimestamp::Float(secs) => {
            if !secs.is_finite() || *secs < 0.0 {
                return None;
            }
            let whole = secs.trunc() as i64;
            let nanos = (secs.fract() * 1e9) as u32;
            DateTime::<Utc>::from_timestamp(whole, nanos)
        }
        RawTimestamp::Text(text) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.with_timezone(&Utc));
            }
            // Naive ISO-8601 without an offset, taken as UTC
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
                .ok()
                .map(|naive| naive.and_utc())
        }
    }
}

/// A wall-clock time window, possibly wrapping past midnight.
///
/// Windows are half-open: `start` is inside, `end` is outside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawClockWindow", into = "RawClockWindow")]
pub struct ClockWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Serde surface for [`ClockWindow`]: "HH:MM" strings in config documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawClockWindow {
    start: String,
    end: String,
}

impl TryFrom<RawClockWindow> for ClockWindow {
    type Error = String;

    fn try_from(raw: RawClockWindow) -> Result<Self, Self::Error> {
        let start = NaiveTime::parse_from_str(&raw.start, "%H:%M")
            .map_err(|e| format!("bad clock time '{}': {}", raw.start, e))?;
        let end = NaiveTime::parse_from_str(&raw.end, "%H:%M")
            .map_err(|e| format!("bad clock time '{}': {}", raw.end, e))?;
        Ok(ClockWindow { start, end })
    }
}

impl From<ClockWindow> for RawClockWindow {
    fn from(window: ClockWindow) -> Self {
        RawClockWindow {
            start: window.start.format("%H:%M").to_string(),
            end: window.end.format("%H:%M").to_string(),
        }
    }
}

impl ClockWindow {
    /// Create a window from start and end times.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Create a window from "HH:MM" strings.
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        Some(Self {
            start: NaiveTime::parse_from_str(start, "%H:%M").ok()?,
            end: NaiveTime::parse_from_str(end, "%H:%M").ok()?,
        })
    }

    /// Check whether a wall-clock time falls inside the window.
    ///
    /// Windows with `start > end` wrap past midnight. A window whose start
    /// equals its end covers the whole day.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start == self.end {
            return true;
        }
        if self.start < self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }

    /// Check whether a UTC instant falls inside the window.
    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.contains(instant.time())
    }
}

/// Named parts of the day, mapped to clock windows by [`PeriodWindows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    Morning,
    Afternoon,
    Evening,
    Night,
}

/// Configurable clock windows for each [`TimePeriod`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodWindows {
    pub morning: ClockWindow,
    pub afternoon: ClockWindow,
    pub evening: ClockWindow,
    pub night: ClockWindow,
}

impl PeriodWindows {
    /// Window for a named period.
    pub fn window(&self, period: TimePeriod) -> ClockWindow {
        match period {
            TimePeriod::Morning => self.morning,
            TimePeriod::Afternoon => self.afternoon,
            TimePeriod::Evening => self.evening,
            TimePeriod::Night => self.night,
        }
    }
}

impl Default for PeriodWindows {
    fn default() -> Self {
        // Night wraps past midnight
        Self {
            morning: ClockWindow::parse("06:00", "12:00").expect("static clock window"),
            afternoon: ClockWindow::parse("12:00", "17:00").expect("static clock window"),
            evening: ClockWindow::parse("17:00", "22:00").expect("static clock window"),
            night: ClockWindow::parse("22:00", "06:00").expect("static clock window"),
        }
    }
}

/// Keep only the points whose wall-clock time falls in a named period.
pub fn filter_by_period(
    points: &[LocationPoint],
    period: TimePeriod,
    windows: &PeriodWindows,
) -> Vec<LocationPoint> {
    let window = windows.window(period);
    points
        .iter()
        .filter(|p| window.contains_instant(p.timestamp))
        .copied()
        .collect()
}

/// Keep only the points whose wall-clock time falls in a custom window.
///
/// Handles midnight wrap the same way as [`ClockWindow::contains`].
pub fn filter_by_clock_range(
    points: &[LocationPoint],
    start: NaiveTime,
    end: NaiveTime,
) -> Vec<LocationPoint> {
    let window = ClockWindow::new(start, end);
    points
        .iter()
        .filter(|p| window.contains_instant(p.timestamp))
        .copied()
        .collect()
}

/// Format a duration in seconds as a short human string.
///
/// Presentation helper only - never used in scoring.
///
/// ```rust
/// use activity_detector::time_utils::format_duration;
///
/// assert_eq!(format_duration(45.0), "45s");
/// assert_eq!(format_duration(1_500.0), "25m");
/// assert_eq!(format_duration(5_040.0), "1h 24m");
/// ```
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", total)
    }
}

/// Hour of day (0-23) for a UTC instant. Convenience for window checks.
#[inline]
pub fn hour_of(instant: DateTime<Utc>) -> u32 {
    instant.time().hour()
}
