//! Journey destinations.
//!
//! The Step & Reward Engine only reads destinations: it asks for a name and
//! turns the answer into a goal target. Surface destinations carry
//! coordinates (the target is the great-circle distance from the current
//! origin); celestial destinations carry a fixed distance.
//!
//! The lookup is a trait so a caller can supply its own catalog.
//! [`StaticDestinations`] is the built-in table.

use serde::{Deserialize, Serialize};

use crate::geo::haversine_whole_km;

/// Earth's circumference, used as the target for celestial entries without a distance.
pub const EARTH_CIRCUMFERENCE_KM: u64 = 40_075;

/// Destination category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestCategory {
    /// Surface destination addressed by coordinates.
    Country,
    /// Celestial destination with a fixed distance.
    Planet,
}

/// A destination entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    /// Display name, also the lookup key.
    pub name: String,
    /// Category.
    pub category: DestCategory,
    /// Latitude in degrees (surface only, 0 otherwise).
    pub lat: f64,
    /// Longitude in degrees (surface only, 0 otherwise).
    pub lon: f64,
    /// Fixed distance in kilometers (celestial only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_distance_km: Option<u64>,
}

impl Destination {
    /// Creates a surface destination.
    #[must_use]
    pub fn country(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            category: DestCategory::Country,
            lat,
            lon,
            fixed_distance_km: None,
        }
    }

    /// Creates a celestial destination.
    #[must_use]
    pub fn planet(name: impl Into<String>, distance_km: u64) -> Self {
        Self {
            name: name.into(),
            category: DestCategory::Planet,
            lat: 0.0,
            lon: 0.0,
            fixed_distance_km: Some(distance_km),
        }
    }

    /// Whole-kilometer target for a traveler starting at `(origin_lat, origin_lon)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ecosync::destination::Destination;
    ///
    /// let mars = Destination::planet("Mars", 78_300_000);
    /// assert_eq!(mars.target_km(0.0, 0.0), 78_300_000);
    ///
    /// let paris = Destination::country("France (Paris)", 48.8566, 2.3522);
    /// assert_eq!(paris.target_km(48.8566, 2.3522), 0);
    /// ```
    #[must_use]
    pub fn target_km(&self, origin_lat: f64, origin_lon: f64) -> u64 {
        match self.category {
            DestCategory::Planet => self.fixed_distance_km.unwrap_or(EARTH_CIRCUMFERENCE_KM),
            DestCategory::Country => haversine_whole_km(origin_lat, origin_lon, self.lat, self.lon),
        }
    }
}

/// Read-only destination catalog.
pub trait DestinationLookup: Send + Sync {
    /// All destinations in a category, in catalog order.
    fn by_category(&self, category: DestCategory) -> Vec<Destination>;

    /// Looks a destination up by name. The built-in table matches exactly.
    /// Goals take their id and name from the queried string, so an
    /// implementation may normalize names as it likes.
    fn find_by_name(&self, name: &str) -> Option<Destination>;
}

/// Built-in catalog of capitals and planets.
#[derive(Debug, Clone)]
pub struct StaticDestinations {
    entries: Vec<Destination>,
}

impl StaticDestinations {
    /// Creates a catalog from explicit entries.
    #[must_use]
    pub fn new(entries: Vec<Destination>) -> Self {
        Self { entries }
    }

    /// All entries, surface first.
    #[must_use]
    pub fn all(&self) -> &[Destination] {
        &self.entries
    }
}

impl Default for StaticDestinations {
    fn default() -> Self {
        // Planet distances are average Earth-to-planet distances.
        let entries = vec![
            Destination::country("Palestine (Jerusalem)", 31.7683, 35.2137),
            Destination::country("France (Paris)", 48.8566, 2.3522),
            Destination::country("United Kingdom (London)", 51.5074, -0.1278),
            Destination::country("Germany (Berlin)", 52.5200, 13.4050),
            Destination::country("Italy (Rome)", 41.9028, 12.4964),
            Destination::country("Spain (Madrid)", 40.4168, -3.7038),
            Destination::country("United States (Washington DC)", 38.9072, -77.0369),
            Destination::country("Canada (Ottawa)", 45.4215, -75.6972),
            Destination::country("Brazil (Brasília)", -15.7939, -47.8828),
            Destination::country("Egypt (Cairo)", 30.0444, 31.2357),
            Destination::country("Pakistan (Islamabad)", 33.6844, 73.0479),
            Destination::country("China (Beijing)", 39.9042, 116.4074),
            Destination::country("Japan (Tokyo)", 35.6895, 139.6917),
            Destination::planet("Mercury", 91_700_000),
            Destination::planet("Venus", 41_400_000),
            Destination::planet("Earth", EARTH_CIRCUMFERENCE_KM),
            Destination::planet("Mars", 78_300_000),
            Destination::planet("Jupiter", 628_730_000),
            Destination::planet("Saturn", 1_275_000_000),
            Destination::planet("Uranus", 2_723_950_000),
            Destination::planet("Neptune", 4_351_400_000),
        ];
        Self { entries }
    }
}

impl DestinationLookup for StaticDestinations {
    fn by_category(&self, category: DestCategory) -> Vec<Destination> {
        self.entries
            .iter()
            .filter(|d| d.category == category)
            .cloned()
            .collect()
    }

    fn find_by_name(&self, name: &str) -> Option<Destination> {
        self.entries.iter().find(|d| d.name == name).cloned()
    }
}
