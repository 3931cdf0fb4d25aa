//! End-to-end pipeline tests: synthetic traces through the full
//! point → segment → cluster → score → session flow.

use std::collections::BTreeMap;

use activity_detector::{
    AnalysisError, AnalysisConfig, ActivitySession, ConfidenceLabel, Coordinates, KnownLocation,
    LocationPoint, LocationRegistry, TripAnalyzer,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

const HOME: (f64, f64) = (51.4500, -0.3000);
const OFFICE: (f64, f64) = (51.5074, -0.1278);
const PARKRUN: (f64, f64) = (51.4123, -0.3341);
const RESORT: (f64, f64) = (46.1920, 6.7750);
const BASE_ALT: f64 = 1800.0;
const LAT_M_PER_DEG: f64 = 111_320.0;

fn analyzer() -> TripAnalyzer {
    let registry = LocationRegistry::from_locations(vec![
        KnownLocation::new("Home", "home", HOME.0, HOME.1),
        KnownLocation::new("Office", "office", OFFICE.0, OFFICE.1),
        KnownLocation::new("Bushy Park parkrun", "parkrun_venue", PARKRUN.0, PARKRUN.1),
        KnownLocation::new("Fulwell Golf Club", "golf_course", 51.4310, -0.3380),
        KnownLocation::new("Avoriaz", "ski_resort", RESORT.0, RESORT.1),
    ])
    .unwrap();
    TripAnalyzer::new(AnalysisConfig::default(), registry).unwrap()
}

/// Every emitted session must satisfy the shared score/label contract,
/// regardless of which analyzer produced it.
fn assert_label_consistency(sessions: &[ActivitySession]) {
    for session in sessions {
        assert!(
            (0.0..=1.0).contains(&session.confidence_score),
            "{} score {} outside [0,1]",
            session.activity_type,
            session.confidence_score
        );
        let expected = match session.confidence_score {
            s if s >= 0.8 => ConfidenceLabel::High,
            s if s >= 0.6 => ConfidenceLabel::Medium,
            _ => {
                assert!(session.confidence_score >= 0.4);
                ConfidenceLabel::Low
            }
        };
        assert_eq!(session.confidence_label, expected);
    }
}

/// Out-and-back 5km run from the parkrun venue, 24 minutes.
fn parkrun_trace(start: DateTime<Utc>) -> Vec<LocationPoint> {
    let speed = 5000.0 / 1440.0;
    (0..=48)
        .map(|i| {
            let along = speed * (i * 30) as f64;
            let north = if along <= 2500.0 { along } else { 5000.0 - along };
            LocationPoint::new(
                start + chrono::Duration::seconds((i * 30) as i64),
                Coordinates::new(PARKRUN.0 + north / LAT_M_PER_DEG, PARKRUN.1),
            )
        })
        .collect()
}

/// Walk, train, walk between two endpoints, 38 minutes.
fn commute_trace(start: DateTime<Utc>, from: (f64, f64), to: (f64, f64)) -> Vec<LocationPoint> {
    let stages: [(i64, f64, f64); 3] = [
        (600, 0.0, 0.059),
        (1080, 0.059, 0.941),
        (600, 0.941, 1.0),
    ];
    let mut points = Vec::new();
    let mut elapsed = 0i64;
    for (stage_secs, from_frac, to_frac) in stages {
        let fixes = stage_secs / 60;
        for i in 0..fixes {
            let frac = from_frac + (to_frac - from_frac) * (i as f64 / fixes as f64);
            points.push(LocationPoint::new(
                start + chrono::Duration::seconds(elapsed + i * 60),
                Coordinates::new(
                    from.0 + (to.0 - from.0) * frac,
                    from.1 + (to.1 - from.1) * frac,
                ),
            ));
        }
        elapsed += stage_secs;
    }
    points.push(LocationPoint::new(
        start + chrono::Duration::seconds(elapsed),
        Coordinates::new(to.0, to.1),
    ));
    points
}

/// 35-minute walking loop within ~150m of home, pausing every fifth minute.
fn dog_walk_trace(start: DateTime<Utc>) -> Vec<LocationPoint> {
    let loop_radius = 120.0;
    let mut theta: f64 = 0.0;
    (0..=35)
        .map(|minute| {
            if minute > 0 && minute % 5 != 0 {
                theta += 1.2 * 60.0 / loop_radius;
            }
            let lat = HOME.0 + (loop_radius * theta.cos() - loop_radius) / LAT_M_PER_DEG;
            let lng =
                HOME.1 + (loop_radius * theta.sin()) / (LAT_M_PER_DEG * HOME.0.to_radians().cos());
            LocationPoint::new(
                start + chrono::Duration::seconds(minute * 60),
                Coordinates::new(lat, lng),
            )
        })
        .collect()
}

/// Lift/descent cycles at the resort: 8 min up (+120m), 2 min down, 35 min
/// rest per cycle.
fn resort_trace(start: DateTime<Utc>, cycles: usize) -> Vec<LocationPoint> {
    let mut points = Vec::new();
    let mut elapsed: i64 = 0;

    let fix = |elapsed: i64, north_m: f64, altitude: f64| {
        LocationPoint::new(
            start + chrono::Duration::seconds(elapsed),
            Coordinates::new(RESORT.0 + north_m / LAT_M_PER_DEG, RESORT.1),
        )
        .with_altitude(altitude)
    };

    for _ in 0..cycles {
        for i in 0..16 {
            points.push(fix(elapsed, 75.0 * i as f64, BASE_ALT + 7.5 * i as f64));
            elapsed += 30;
        }
        for i in 0..4 {
            points.push(fix(
                elapsed,
                1200.0 - 300.0 * i as f64,
                BASE_ALT + 120.0 - 30.0 * i as f64,
            ));
            elapsed += 30;
        }
        for _ in 0..70 {
            points.push(fix(elapsed, 0.0, BASE_ALT));
            elapsed += 30;
        }
    }

    points
}

#[test]
fn saturday_parkrun_scores_high_with_distance() {
    let trip = analyzer();
    // 2024-03-16 is a Saturday; 5km covered between 09:00 and 09:24
    let date = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();
    let start = Utc.with_ymd_and_hms(2024, 3, 16, 9, 0, 0).unwrap();

    let sessions = trip.analyze_day(&parkrun_trace(start), date).unwrap();
    assert_label_consistency(&sessions);

    let parkruns: Vec<_> = sessions
        .iter()
        .filter(|s| s.activity_type == "parkrun")
        .collect();
    assert_eq!(parkruns.len(), 1);

    let session = parkruns[0];
    assert_eq!(session.confidence_label, ConfidenceLabel::High);
    assert_eq!(session.location_name.as_deref(), Some("Bushy Park parkrun"));
    let distance = session.details.get("distance_m").unwrap().as_f64().unwrap();
    assert!((distance - 5000.0).abs() < 100.0);
}

#[test]
fn weekday_transit_classified_as_commute_to_office() {
    let trip = analyzer();
    // Tuesday, leaving home at 07:00, train above 10 m/s, office by 07:38
    let date = NaiveDate::from_ymd_opt(2024, 3, 19).unwrap();
    let start = Utc.with_ymd_and_hms(2024, 3, 19, 7, 0, 0).unwrap();

    let sessions = trip
        .analyze_day(&commute_trace(start, HOME, OFFICE), date)
        .unwrap();
    assert_label_consistency(&sessions);

    let commutes: Vec<_> = sessions
        .iter()
        .filter(|s| s.activity_type == "commute")
        .collect();
    assert_eq!(commutes.len(), 1);
    assert_eq!(
        commutes[0].details.get("direction"),
        Some(&serde_json::json!("to_office"))
    );
    let max_v = commutes[0]
        .details
        .get("max_velocity_ms")
        .unwrap()
        .as_f64()
        .unwrap();
    assert!(max_v > 10.0);
}

#[test]
fn home_loop_is_dog_walk_but_not_golf_or_parkrun() {
    let trip = analyzer();
    let date = NaiveDate::from_ymd_opt(2024, 3, 18).unwrap();
    let start = Utc.with_ymd_and_hms(2024, 3, 18, 14, 0, 0).unwrap();

    let sessions = trip.analyze_day(&dog_walk_trace(start), date).unwrap();
    assert_label_consistency(&sessions);

    assert!(sessions.iter().any(|s| s.activity_type == "dog_walking"));
    // Too short for golf, too slow and short for parkrun
    assert!(!sessions.iter().any(|s| s.activity_type == "golf"));
    assert!(!sessions.iter().any(|s| s.activity_type == "parkrun"));
}

#[test]
fn resort_day_yields_runs_and_vertical() {
    let trip = analyzer();
    let date = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
    let start = Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap();

    // Six hours, eight lift/descent cycles
    let sessions = trip.analyze_day(&resort_trace(start, 8), date).unwrap();
    assert_label_consistency(&sessions);

    let snow: Vec<_> = sessions
        .iter()
        .filter(|s| s.activity_type == "snowboarding")
        .collect();
    assert_eq!(snow.len(), 1);
    assert_eq!(snow[0].details.get("runs"), Some(&serde_json::json!(8)));
    let vertical = snow[0].details.get("vertical_m").unwrap().as_f64().unwrap();
    assert!(vertical > 0.0);
}

#[test]
fn no_data_and_no_detection_are_distinguishable() {
    let trip = analyzer();
    let date = NaiveDate::from_ymd_opt(2024, 3, 18).unwrap();

    // No points at all: a hard error, not an empty day
    let err = trip.analyze_day(&[], date).unwrap_err();
    assert!(matches!(err, AnalysisError::NoLocationData { .. }));

    // Points present but nothing detectable: an empty result
    let start = Utc.with_ymd_and_hms(2024, 3, 18, 14, 0, 0).unwrap();
    let quiet: Vec<LocationPoint> = (0..40)
        .map(|i| {
            LocationPoint::new(
                start + chrono::Duration::seconds(i * 60),
                Coordinates::new(45.0, 2.0),
            )
        })
        .collect();
    let sessions = trip.analyze_day(&quiet, date).unwrap();
    assert!(sessions.is_empty());
}

#[test]
fn trip_aggregates_days_and_marks_gaps() {
    let trip = analyzer();
    let d1 = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
    let d2 = NaiveDate::from_ymd_opt(2024, 2, 11).unwrap();
    let d3 = NaiveDate::from_ymd_opt(2024, 2, 12).unwrap();

    let mut by_date = BTreeMap::new();
    by_date.insert(
        d1,
        resort_trace(Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap(), 8),
    );
    by_date.insert(
        d3,
        resort_trace(Utc.with_ymd_and_hms(2024, 2, 12, 9, 30, 0).unwrap(), 6),
    );

    let outcomes = trip.analyze_trip(&by_date, d1, d3).unwrap();
    assert_eq!(outcomes.len(), 3);

    assert!(outcomes[&d2].is_no_data());
    let first = outcomes[&d1].sessions().unwrap();
    assert!(first.iter().any(|s| s.activity_type == "snowboarding"));
    let last = outcomes[&d3].sessions().unwrap();
    assert!(last.iter().any(|s| s.activity_type == "snowboarding"));
}

#[test]
fn analysis_is_deterministic_across_reruns() {
    let trip = analyzer();
    let date = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();
    let start = Utc.with_ymd_and_hms(2024, 3, 16, 9, 0, 0).unwrap();
    let points = parkrun_trace(start);

    let first = serde_json::to_string(&trip.analyze_day(&points, date).unwrap()).unwrap();
    let second = serde_json::to_string(&trip.analyze_day(&points, date).unwrap()).unwrap();
    assert_eq!(first, second);
}
