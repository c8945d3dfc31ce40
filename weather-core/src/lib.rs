//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over weather providers and the city store
//! - The refresh pipeline: backoff policy, per-city fetcher with fallback,
//!   batch aggregation and the update orchestrator that publishes results
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod aggregator;
pub mod backoff;
pub mod config;
pub mod fetcher;
pub mod model;
pub mod orchestrator;
pub mod provider;
pub mod store;
mod toml_file;

#[cfg(test)]
mod testing;

pub use aggregator::{CycleError, aggregate, run_cycle};
pub use backoff::BackoffPolicy;
pub use config::{Config, ProviderConfig, RetryConfig};
pub use fetcher::fetch_city;
pub use model::{CitiesUpdate, City, Condition, ConditionResponse, OpenEvent};
pub use orchestrator::{CycleOutcome, OrchestratorError, UpdateOrchestrator};
pub use provider::{ProviderId, WeatherService};
pub use store::{CityStore, FileCityStore, MemoryCityStore};
