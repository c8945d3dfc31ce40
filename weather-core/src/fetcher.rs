use tracing::{debug, warn};

use crate::{BackoffPolicy, City, WeatherService};

/// Fetch the current condition for one city, retrying with `policy`.
///
/// Failed call `i` waits `d(i)` and tries again, so a lookup makes up to
/// `max_attempts + 1` calls. Never fails: when every call errors the city
/// comes back unchanged, keeping whatever condition it had before.
pub async fn fetch_city(service: &dyn WeatherService, policy: BackoffPolicy, city: City) -> City {
    if city.full_path.trim().is_empty() {
        warn!(city = %city.name, "City has no lookup path; keeping stored condition");
        return city;
    }

    let mut attempt = 0;

    loop {
        match service.get_weather(&city.full_path).await {
            Ok(response) => {
                debug!(city = %city.full_path, attempt, "Fetched condition");
                return city.with_condition(response.into_condition());
            }
            Err(error) => {
                let Some(delay) = policy.delay(attempt) else {
                    warn!(
                        city = %city.full_path,
                        calls = attempt + 1,
                        error = %error,
                        "Retries exhausted; keeping stored condition"
                    );
                    return city;
                };

                warn!(
                    city = %city.full_path,
                    attempt,
                    factor = policy.factor(attempt).unwrap_or_default(),
                    ?delay,
                    error = %error,
                    "Weather lookup failed; retrying"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
