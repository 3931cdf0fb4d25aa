//! Known-location registry and place resolution.
//!
//! A registry is a static document of named places - home, the office, golf
//! courses, parkrun venues, ski resorts - each with coordinates and a match
//! radius. Radii are category-specific: a ski resort sprawls over kilometers
//! while "home" is a hundred meters.
//!
//! The registry is loaded once at construction and read-only afterwards.
//! Entries are indexed in an R-tree so [`LocationRegistry::resolve`] stays
//! sublinear even for large registries.

use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::geo_utils::{haversine_distance, meters_to_degrees};
use crate::Coordinates;

/// Default match radius in meters for a location category.
///
/// Used when a registry entry does not carry an explicit `radius_m`.
pub fn default_radius(category: &str) -> f64 {
    match category {
        "golf_course" => 500.0,
        "parkrun_venue" => 200.0,
        "home" => 100.0,
        "office" => 150.0,
        "ski_resort" => 2000.0,
        _ => 250.0,
    }
}

/// A named, pre-registered place with a category-specific match radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownLocation {
    /// Unique name ("Home", "Bushy Park parkrun")
    pub name: String,
    /// Category tag ("home", "golf_course", "parkrun_venue", "ski_resort")
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Match radius in meters; filled from the category default when the
    /// registry document omits it
    #[serde(default)]
    pub radius_m: Option<f64>,
}

impl KnownLocation {
    pub fn new(name: &str, category: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            latitude,
            longitude,
            radius_m: None,
        }
    }

    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = Some(radius_m);
        self
    }

    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Effective match radius: explicit value or the category default.
    pub fn radius(&self) -> f64 {
        self.radius_m.unwrap_or_else(|| default_radius(&self.category))
    }
}

/// Wrapper around the top-level registry document.
#[derive(Debug, Deserialize, Serialize)]
struct RegistryDocument {
    locations: Vec<KnownLocation>,
}

/// R-tree entry pointing back into the registry's location list.
#[derive(Debug, Clone)]
struct IndexedLocation {
    index: usize,
    lng: f64,
    lat: f64,
}

impl RTreeObject for IndexedLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

/// Read-only registry of known locations with spatial lookup.
#[derive(Debug)]
pub struct LocationRegistry {
    locations: Vec<KnownLocation>,
    tree: RTree<IndexedLocation>,
    /// Largest effective radius in the registry, used to size search envelopes
    max_radius_m: f64,
}

impl LocationRegistry {
    /// Build a registry from a list of locations.
    ///
    /// Names must be unique - they are the registry's lookup key.
    pub fn from_locations(locations: Vec<KnownLocation>) -> Result<Self> {
        for (i, loc) in locations.iter().enumerate() {
            if !loc.latitude.is_finite()
                || !loc.longitude.is_finite()
                || loc.latitude.abs() > 90.0
                || loc.longitude.abs() > 180.0
            {
                return Err(AnalysisError::registry(format!(
                    "location '{}' has invalid coordinates",
                    loc.name
                )));
            }
            if locations[..i].iter().any(|other| other.name == loc.name) {
                return Err(AnalysisError::registry(format!(
                    "duplicate location name '{}'",
                    loc.name
                )));
            }
        }

        let entries: Vec<IndexedLocation> = locations
            .iter()
            .enumerate()
            .map(|(index, loc)| IndexedLocation {
                index,
                lng: loc.longitude,
                lat: loc.latitude,
            })
            .collect();

        let max_radius_m = locations
            .iter()
            .map(KnownLocation::radius)
            .fold(0.0, f64::max);

        Ok(Self {
            locations,
            tree: RTree::bulk_load(entries),
            max_radius_m,
        })
    }

    /// Parse a registry document.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: RegistryDocument =
            serde_json::from_str(json).map_err(|e| AnalysisError::registry(e.to_string()))?;
        Self::from_locations(document.locations)
    }

    /// Number of registered locations.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Resolve a coordinate to the nearest known location of a category.
    ///
    /// Returns the nearest location of `category` whose haversine distance
    /// from `coords` is within that location's own radius, or `None`.
    /// The returned location is never farther away than its radius.
    pub fn resolve(&self, coords: &Coordinates, category: &str) -> Option<&KnownLocation> {
        if self.locations.is_empty() {
            return None;
        }

        // Envelope query sized by the largest radius, then exact haversine
        // confirmation against each candidate's own radius
        let search_deg = meters_to_degrees(self.max_radius_m * 1.5, coords.latitude);
        let envelope = AABB::from_corners(
            [coords.longitude - search_deg, coords.latitude - search_deg],
            [coords.longitude + search_deg, coords.latitude + search_deg],
        );

        self.tree
            .locate_in_envelope(&envelope)
            .filter_map(|entry| {
                let loc = &self.locations[entry.index];
                if loc.category != category {
                    return None;
                }
                let distance = haversine_distance(coords, &loc.coords());
                if distance <= loc.radius() {
                    Some((loc, distance))
                } else {
                    None
                }
            })
            .min_by(|(_, d1), (_, d2)| d1.total_cmp(d2))
            .map(|(loc, _)| loc)
    }

    /// Look up a location by its unique name.
    pub fn find_by_name(&self, name: &str) -> Option<&KnownLocation> {
        self.locations.iter().find(|loc| loc.name == name)
    }

    /// All locations of a category.
    pub fn by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a KnownLocation> + 'a {
        self.locations
            .iter()
            .filter(move |loc| loc.category == category)
    }
}
