use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::reading::Location;
use crate::db::StoreError;
use crate::db::import::CsvTable;

/// Result of checking a free-text place name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCheck {
    pub is_valid: bool,
    pub canonical_name: Option<String>,
    pub suggestions: Vec<String>,
}

impl LocationCheck {
    pub fn valid(canonical_name: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            canonical_name: Some(canonical_name.into()),
            suggestions: Vec::new(),
        }
    }

    pub fn invalid(suggestions: Vec<String>) -> Self {
        Self {
            is_valid: false,
            canonical_name: None,
            suggestions,
        }
    }
}

/// Resolves user-entered place names to canonical locations.
pub trait LocationValidator {
    fn validate(&self, query: &str) -> LocationCheck;

    /// District/state details for a canonical name, if known.
    fn details(&self, _canonical: &str) -> Option<Location> {
        None
    }
}

const MAX_SUGGESTIONS: usize = 3;

const POPULAR_CITIES: &[&str] = &["Bangalore", "Mysore", "Mangalore", "Hubli", "Belgaum"];

/// Alternate spellings and new official names, keyed by canonical city.
const CITY_VARIATIONS: &[(&str, &[&str])] = &[
    ("Bangalore", &["bangalore", "bengaluru", "blr", "bangaluru"]),
    ("Mysore", &["mysore", "mysuru", "mysooru"]),
    ("Hubli", &["hubli", "hubali", "hubballi", "dharwad"]),
    ("Mangalore", &["mangalore", "mangaluru", "mangalur", "dakshina kannada"]),
    ("Belgaum", &["belgaum", "belagavi", "belgavi"]),
    ("Tumkur", &["tumkur", "tumakuru", "tumakur"]),
    ("Shimoga", &["shimoga", "shivamogga", "shivamoga"]),
    ("Davangere", &["davangere", "davanagere"]),
    ("Bellary", &["bellary", "ballari", "balari"]),
    ("Bijapur", &["bijapur", "vijayapura", "vijayapur"]),
    ("Gulbarga", &["gulbarga", "kalaburagi", "kalburgi"]),
    ("Raichur", &["raichur", "raychur"]),
];

/// Built-in list used when no cities file is available: (city, district).
const DEFAULT_CITIES: &[(&str, &str)] = &[
    ("Bangalore", "Bangalore Urban"),
    ("Mysore", "Mysore"),
    ("Hubli", "Dharwad"),
    ("Mangalore", "Dakshina Kannada"),
    ("Belgaum", "Belgaum"),
    ("Tumkur", "Tumkur"),
    ("Shimoga", "Shimoga"),
    ("Davangere", "Davangere"),
    ("Bellary", "Bellary"),
    ("Bijapur", "Bijapur"),
    ("Gulbarga", "Gulbarga"),
    ("Raichur", "Raichur"),
    ("Udupi", "Udupi"),
    ("Hassan", "Hassan"),
    ("Mandya", "Mandya"),
];

const STATE: &str = "Karnataka";

/// In-memory directory of Karnataka cities.
#[derive(Debug, Clone)]
pub struct CityDirectory {
    /// Lowercased city name -> location.
    cities: HashMap<String, Location>,
    /// Lowercased variation -> canonical city name.
    variations: HashMap<String, String>,
}

impl Default for CityDirectory {
    fn default() -> Self {
        Self::karnataka_defaults()
    }
}

impl CityDirectory {
    /// Create an empty directory (variation table still loaded).
    pub fn empty() -> Self {
        let mut variations = HashMap::new();
        for (canonical, names) in CITY_VARIATIONS {
            for name in *names {
                variations.insert(name.to_string(), canonical.to_string());
            }
        }
        Self {
            cities: HashMap::new(),
            variations,
        }
    }

    /// Directory seeded with the major Karnataka cities.
    pub fn karnataka_defaults() -> Self {
        let mut dir = Self::empty();
        for (city, district) in DEFAULT_CITIES {
            dir.insert(Location::new(*city, *district, STATE));
        }
        dir
    }

    /// Load Karnataka rows from a `city,state,district` CSV.
    pub fn load_from_csv(path: &Path) -> Result<Self, StoreError> {
        let table = CsvTable::read(path)?;
        let city_col = table.require("city")?;
        let state_col = table.require("state")?;
        let district_col = table.column("district");

        let mut dir = Self::empty();
        for row in table.rows() {
            let state = row.get(state_col).copied().unwrap_or_default();
            if !state.eq_ignore_ascii_case(STATE) {
                continue;
            }
            let city = row.get(city_col).copied().unwrap_or_default();
            if city.is_empty() {
                continue;
            }
            let district = district_col
                .and_then(|c| row.get(c).copied())
                .unwrap_or_default();
            dir.insert(Location::new(city, district, state));
        }
        tracing::info!("Loaded {} Karnataka cities from {}", dir.len(), path.display());
        Ok(dir)
    }

    pub fn insert(&mut self, location: Location) {
        self.cities.insert(location.city.to_lowercase(), location);
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn get(&self, city: &str) -> Option<&Location> {
        self.cities.get(&city.trim().to_lowercase())
    }

    /// Sorted canonical city names.
    pub fn city_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cities.values().map(|l| l.city.clone()).collect();
        names.sort();
        names
    }

    /// Map a user-entered name onto a known city name.
    pub fn normalize(&self, query: &str) -> Option<String> {
        let key = query.trim().to_lowercase();
        if let Some(canonical) = self.variations.get(&key) {
            return Some(canonical.clone());
        }
        self.cities.get(&key).map(|l| l.city.clone())
    }

    /// Up to three known cities resembling the query, or popular cities.
    pub fn suggest(&self, query: &str) -> Vec<String> {
        let query = query.trim().to_lowercase();
        let words: Vec<&str> = query.split_whitespace().collect();

        let mut suggestions: Vec<String> = self
            .city_names()
            .into_iter()
            .filter(|city| {
                let city_lower = city.to_lowercase();
                (!query.is_empty() && (city_lower.contains(&query) || query.contains(&city_lower)))
                    || words.iter().any(|w| city_lower.contains(w))
            })
            .collect();

        if suggestions.is_empty() {
            suggestions = POPULAR_CITIES
                .iter()
                .filter(|city| self.get(city).is_some())
                .map(|city| city.to_string())
                .collect();
        }
        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }
}

impl LocationValidator for CityDirectory {
    fn validate(&self, query: &str) -> LocationCheck {
        match self.normalize(query) {
            Some(name) if self.get(&name).is_some() => LocationCheck::valid(name),
            _ => LocationCheck::invalid(self.suggest(query)),
        }
    }

    fn details(&self, canonical: &str) -> Option<Location> {
        self.get(canonical).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_csv(contents: &str) -> std::path::PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "dengueradar_cities_test_{}_{}.csv",
            std::process::id(),
            id
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn variations_resolve_to_canonical() {
        let dir = CityDirectory::karnataka_defaults();
        assert_eq!(dir.validate("Bengaluru"), LocationCheck::valid("Bangalore"));
        assert_eq!(dir.validate("  mysuru "), LocationCheck::valid("Mysore"));
        assert_eq!(dir.validate("KALABURAGI"), LocationCheck::valid("Gulbarga"));
    }

    #[test]
    fn plain_city_name_is_valid() {
        let dir = CityDirectory::karnataka_defaults();
        let check = dir.validate("udupi");
        assert!(check.is_valid);
        assert_eq!(check.canonical_name.as_deref(), Some("Udupi"));
    }

    #[test]
    fn unknown_city_gets_partial_match_suggestions() {
        let dir = CityDirectory::karnataka_defaults();
        let check = dir.validate("Mangalore Port");
        assert!(!check.is_valid);
        assert_eq!(check.suggestions, vec!["Mangalore"]);
    }

    #[test]
    fn unknown_city_falls_back_to_popular() {
        let dir = CityDirectory::karnataka_defaults();
        let check = dir.validate("Chennai");
        assert!(!check.is_valid);
        assert_eq!(check.suggestions, vec!["Bangalore", "Mysore", "Mangalore"]);
    }

    #[test]
    fn variation_for_missing_city_is_invalid() {
        let mut dir = CityDirectory::empty();
        dir.insert(Location::new("Udupi", "Udupi", "Karnataka"));
        // "bengaluru" normalizes, but the directory does not know Bangalore
        let check = dir.validate("bengaluru");
        assert!(!check.is_valid);
        assert!(check.suggestions.is_empty());
    }

    #[test]
    fn details_carry_district_and_state() {
        let dir = CityDirectory::karnataka_defaults();
        let loc = dir.details("Hubli").unwrap();
        assert_eq!(loc.district, "Dharwad");
        assert_eq!(loc.state, "Karnataka");
    }

    #[test]
    fn csv_load_keeps_only_karnataka() {
        let path = temp_csv("city,state,district\nMysore,Karnataka,Mysore\nChennai,Tamil Nadu,Chennai\nHassan,karnataka,Hassan\n");
        let dir = CityDirectory::load_from_csv(&path).unwrap();
        assert_eq!(dir.len(), 2);
        assert!(dir.get("chennai").is_none());
        assert_eq!(dir.city_names(), vec!["Hassan", "Mysore"]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn csv_without_city_column_fails() {
        let path = temp_csv("name,state\nMysore,Karnataka\n");
        assert!(CityDirectory::load_from_csv(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
