//! Single-day activity analysis over a synthetic trace.
//!
//! Run with: cargo run --example analyze_day

use activity_detector::{
    AnalysisConfig, Coordinates, KnownLocation, LocationPoint, LocationRegistry, TripAnalyzer,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

const HOME: (f64, f64) = (51.4500, -0.3000);
const OFFICE: (f64, f64) = (51.5074, -0.1278);

/// Walk to the station, ride the train, walk the last stretch.
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

/// A 35-minute walking loop near home with regular pauses.
fn dog_walk_trace(start: DateTime<Utc>) -> Vec<LocationPoint> {
    let loop_radius = 120.0;
    let mut theta: f64 = 0.0;
    (0..=35)
        .map(|minute| {
            if minute > 0 && minute % 5 != 0 {
                theta += 1.2 * 60.0 / loop_radius;
            }
            let lat = HOME.0 + (loop_radius * theta.cos() - loop_radius) / 111_320.0;
            let lng =
                HOME.1 + (loop_radius * theta.sin()) / (111_320.0 * HOME.0.to_radians().cos());
            LocationPoint::new(
                start + chrono::Duration::seconds(minute * 60),
                Coordinates::new(lat, lng),
            )
        })
        .collect()
}

fn main() {
    let registry = LocationRegistry::from_locations(vec![
        KnownLocation::new("Home", "home", HOME.0, HOME.1),
        KnownLocation::new("Office", "office", OFFICE.0, OFFICE.1),
    ])
    .unwrap();

    let analyzer = TripAnalyzer::new(AnalysisConfig::default(), registry).unwrap();

    // A Tuesday: commute in, dog walk in the evening
    let date = NaiveDate::from_ymd_opt(2024, 3, 19).unwrap();
    let mut points = commute_trace(
        Utc.with_ymd_and_hms(2024, 3, 19, 7, 0, 0).unwrap(),
        HOME,
        OFFICE,
    );
    points.extend(commute_trace(
        Utc.with_ymd_and_hms(2024, 3, 19, 17, 30, 0).unwrap(),
        OFFICE,
        HOME,
    ));
    points.extend(dog_walk_trace(
        Utc.with_ymd_and_hms(2024, 3, 19, 20, 30, 0).unwrap(),
    ));

    println!("Analyzing {} ({} points)\n", date, points.len());

    match analyzer.analyze_day(&points, date) {
        Ok(sessions) if sessions.is_empty() => println!("No activities detected"),
        Ok(sessions) => {
            for session in &sessions {
                println!(
                    "{:>6} - {:<6} {:<12} {:<6} ({:.2})",
                    session.start_time.format("%H:%M"),
                    session.end_time.format("%H:%M"),
                    session.activity_type,
                    session.confidence_label.as_str(),
                    session.confidence_score,
                );
                if let Some(name) = &session.location_name {
                    println!("       at {}", name);
                }
                for (key, value) in &session.details {
                    println!("       {}: {}", key, value);
                }
            }
        }
        Err(err) => println!("Analysis failed: {}", err),
    }
}
