use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current weather at a location, as reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub provider: String,
    pub description: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub observation_time: DateTime<Utc>,
}

/// Provider response for a single lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionResponse {
    pub location_name: String,
    pub condition: Condition,
}

impl ConditionResponse {
    pub fn into_condition(self) -> Condition {
        self.condition
    }
}

/// A stored city. `full_path` is the key used for remote lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub full_path: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl City {
    pub fn new(full_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self { full_path: full_path.into(), name: name.into(), condition: None }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Result of one refresh cycle, in the order the cities were read.
#[derive(Debug, Clone, PartialEq)]
pub struct CitiesUpdate {
    pub cities: Vec<City>,
    pub is_empty: bool,
}

impl From<Vec<City>> for CitiesUpdate {
    fn from(cities: Vec<City>) -> Self {
        let is_empty = cities.is_empty();
        Self { cities, is_empty }
    }
}

/// Out-of-band UI intents published next to the city updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenEvent {
    AddCity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_sets_flag() {
        let update = CitiesUpdate::from(Vec::new());
        assert!(update.is_empty);

        let update = CitiesUpdate::from(vec![City::new("/q/zmw:00000.1.12345", "Kyiv")]);
        assert!(!update.is_empty);
    }

    #[test]
    fn city_without_condition_skips_field_in_toml() {
        let city = City::new("/q/zmw:1", "Lviv");
        let s = toml::to_string(&city).expect("serialize");
        assert!(!s.contains("condition"));
    }
}
