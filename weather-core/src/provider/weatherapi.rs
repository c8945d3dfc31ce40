use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::model::{Condition, ConditionResponse};

use super::{ProviderId, WeatherService, truncate_body};

const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self { api_key, base_url: base_url.into(), http: Client::new() }
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
    localtime_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: u8,
    wind_kph: f64,
    condition: WaCondition,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[async_trait]
impl WeatherService for WeatherApiProvider {
    async fn get_weather(&self, full_path: &str) -> Result<ConditionResponse> {
        let url = format!("{}/v1/current.json", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", full_path)])
            .send()
            .await
            .context("Failed to send request to WeatherAPI.com (current)")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read WeatherAPI current response body")?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "WeatherAPI current request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: WaResponse =
            serde_json::from_str(&body).context("Failed to parse WeatherAPI current JSON")?;

        let ts = parsed.current.last_updated_epoch.or(parsed.location.localtime_epoch);
        let observation_time =
            ts.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)).unwrap_or_else(Utc::now);

        Ok(ConditionResponse {
            location_name: format!("{}, {}", parsed.location.name, parsed.location.country),
            condition: Condition {
                provider: ProviderId::WeatherApi.to_string(),
                description: parsed.current.condition.text,
                temperature_c: parsed.current.temp_c,
                feels_like_c: parsed.current.feelslike_c,
                humidity_pct: parsed.current.humidity,
                wind_speed_mps: parsed.current.wind_kph / 3.6,
                observation_time,
            },
        })
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("WeatherAPI.com API key is empty"));
        }
        Ok(())
    }
}
