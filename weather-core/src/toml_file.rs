//! TOML files shared by the config and the city store.

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::{fs, path::Path};

/// Read `path`, or `T::default()` when the file does not exist yet.
pub(crate) fn read_or_default<T>(path: &Path, what: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} file: {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {what} file: {}", path.display()))
}

/// Write `value` to `path`, creating parent directories as needed.
pub(crate) fn write<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let toml = toml::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {what} to TOML"))?;

    fs::write(path, toml).with_context(|| format!("Failed to write {what} file: {}", path.display()))
}
