use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::{BackoffPolicy, City, CityStore, WeatherService, fetcher::fetch_city};

/// Failures that abort a whole refresh cycle. Single lookups never end up here.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to read cities: {0:#}")]
    Store(anyhow::Error),

    #[error("weather service is not usable: {0:#}")]
    Provider(anyhow::Error),
}

/// Fetch every city concurrently and return them in input order.
///
/// Resolves once all fetches have settled. Dropping the future cancels every
/// lookup and backoff timer still in flight.
pub async fn aggregate(
    service: Arc<dyn WeatherService>,
    policy: BackoffPolicy,
    cities: Vec<City>,
) -> Vec<City> {
    if cities.is_empty() {
        return Vec::new();
    }

    let fetches = cities.into_iter().map(|city| {
        let service = Arc::clone(&service);
        async move { fetch_city(service.as_ref(), policy, city).await }
    });

    join_all(fetches).await
}

/// One refresh cycle: snapshot the store, then aggregate.
pub async fn run_cycle(
    store: &dyn CityStore,
    service: Arc<dyn WeatherService>,
    policy: BackoffPolicy,
) -> Result<Vec<City>, CycleError> {
    service.ensure_ready().map_err(CycleError::Provider)?;

    let cities = store.cities().await.map_err(CycleError::Store)?;
    let total = cities.len();

    let cities = aggregate(service, policy, cities).await;
    let updated = cities.iter().filter(|c| c.condition.is_some()).count();

    info!(total, with_condition = updated, "Refresh cycle settled");
    Ok(cities)
}
