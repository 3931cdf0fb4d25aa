//! Multi-day trip analysis with a missing day.
//!
//! Run with: cargo run --example analyze_trip

use std::collections::BTreeMap;

use activity_detector::{
    AnalysisConfig, Coordinates, KnownLocation, LocationPoint, LocationRegistry, TripAnalyzer,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

const RESORT: (f64, f64) = (46.1920, 6.7750);
const BASE_ALT: f64 = 1800.0;

/// Lift/descent cycles at the resort, fixes every 30 seconds.
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

fn main() {
    let registry = LocationRegistry::from_locations(vec![
        KnownLocation::new("Home", "home", 51.4500, -0.3000),
        KnownLocation::new("Office", "office", 51.5074, -0.1278),
        KnownLocation::new("Avoriaz", "ski_resort", RESORT.0, RESORT.1),
    ])
    .unwrap();

    let analyzer = TripAnalyzer::new(AnalysisConfig::default(), registry).unwrap();

    let start = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 2, 12).unwrap();

    // Two days on the mountain; the tracker died on the 11th
    let mut by_date = BTreeMap::new();
    by_date.insert(
        start,
        resort_day(Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap(), 8),
    );
    by_date.insert(
        end,
        resort_day(Utc.with_ymd_and_hms(2024, 2, 12, 9, 30, 0).unwrap(), 6),
    );

    let outcomes = analyzer.analyze_trip(&by_date, start, end).unwrap();

    for (date, outcome) in &outcomes {
        match outcome.sessions() {
            None => println!("{}: no location data", date),
            Some([]) => println!("{}: no activities detected", date),
            Some(sessions) => {
                println!("{}:", date);
                for session in sessions {
                    println!(
                        "  {} {} ({:.2}) {}",
                        session.activity_type,
                        session.confidence_label.as_str(),
                        session.confidence_score,
                        session.formatted_duration(),
                    );
                    for (key, value) in &session.details {
                        println!("    {}: {}", key, value);
                    }
                }
            }
        }
    }
}
