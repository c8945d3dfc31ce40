//! Persistence of the city list.
//!
//! The refresh pipeline only reads a snapshot per cycle; writing fetched
//! conditions back is left to the caller through [`CityStore::save`].

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, path::PathBuf, sync::Mutex};

use crate::{City, config::project_dirs, toml_file};

#[async_trait]
pub trait CityStore: Send + Sync + Debug {
    /// Fresh snapshot of all stored cities, in stored order.
    async fn cities(&self) -> Result<Vec<City>>;

    async fn save(&self, cities: &[City]) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CitiesFile {
    #[serde(default, rename = "city")]
    cities: Vec<City>,
}

/// Cities kept in a TOML file as `[[city]]` tables.
#[derive(Debug, Clone)]
pub struct FileCityStore {
    path: PathBuf,
}

impl FileCityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(project_dirs()?.data_dir().join("cities.toml")))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read(&self) -> Result<Vec<City>> {
        let file: CitiesFile = toml_file::read_or_default(&self.path, "cities")?;
        Ok(file.cities)
    }

    fn write(&self, cities: &[City]) -> Result<()> {
        toml_file::write(&self.path, &CitiesFile { cities: cities.to_vec() }, "cities")
    }

    /// Append a city; rejects empty or duplicate lookup keys.
    pub fn add(&self, city: City) -> Result<()> {
        if city.full_path.trim().is_empty() {
            return Err(anyhow!("City path must not be empty"));
        }

        let mut cities = self.read()?;
        if cities.iter().any(|c| c.full_path == city.full_path) {
            return Err(anyhow!("City '{}' is already stored", city.full_path));
        }

        cities.push(city);
        self.write(&cities)
    }

    /// Remove a city by lookup key. Returns whether anything was removed.
    pub fn remove(&self, full_path: &str) -> Result<bool> {
        let mut cities = self.read()?;
        let before = cities.len();
        cities.retain(|c| c.full_path != full_path);

        if cities.len() == before {
            return Ok(false);
        }

        self.write(&cities)?;
        Ok(true)
    }
}

#[async_trait]
impl CityStore for FileCityStore {
    async fn cities(&self) -> Result<Vec<City>> {
        self.read()
    }

    async fn save(&self, cities: &[City]) -> Result<()> {
        self.write(cities)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCityStore {
    cities: Mutex<Vec<City>>,
}

impl MemoryCityStore {
    pub fn new(cities: Vec<City>) -> Self {
        Self { cities: Mutex::new(cities) }
    }
}

#[async_trait]
impl CityStore for MemoryCityStore {
    async fn cities(&self) -> Result<Vec<City>> {
        let cities = self.cities.lock().map_err(|_| anyhow!("City store lock poisoned"))?;
        Ok(cities.clone())
    }

    async fn save(&self, cities: &[City]) -> Result<()> {
        let mut stored = self.cities.lock().map_err(|_| anyhow!("City store lock poisoned"))?;
        *stored = cities.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::condition;

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCityStore::new(dir.path().join("cities.toml"));

        assert!(store.cities().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_read_keeps_order_and_conditions() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCityStore::new(dir.path().join("nested/cities.toml"));

        let cities = vec![
            City::new("/q/zmw:1", "Kyiv").with_condition(condition("sunny")),
            City::new("/q/zmw:2", "Lviv"),
        ];
        store.save(&cities).await.unwrap();

        assert_eq!(store.cities().await.unwrap(), cities);
    }

    #[tokio::test]
    async fn add_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCityStore::new(dir.path().join("cities.toml"));

        store.add(City::new("/q/zmw:1", "Kyiv")).unwrap();
        store.add(City::new("/q/zmw:2", "Lviv")).unwrap();

        let err = store.add(City::new("/q/zmw:1", "Kyiv")).unwrap_err();
        assert!(err.to_string().contains("already stored"));
        assert!(store.add(City::new("  ", "Nowhere")).is_err());

        assert!(store.remove("/q/zmw:1").unwrap());
        assert!(!store.remove("/q/zmw:1").unwrap());

        let names: Vec<String> = store.cities().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Lviv"]);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cities.toml");
        std::fs::write(&path, "[[city]\nbroken").unwrap();

        let err = FileCityStore::new(path).cities().await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse cities file"));
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryCityStore::default();
        store.save(&[City::new("/q/zmw:3", "Odesa")]).await.unwrap();
        assert_eq!(store.cities().await.unwrap().len(), 1);
    }
}
