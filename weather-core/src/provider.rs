use crate::{
    Config, ConditionResponse,
    provider::{openweather::OpenWeatherProvider, weatherapi::WeatherApiProvider},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod openweather;
pub mod weatherapi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenWeather,
    WeatherApi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::WeatherApi => "weatherapi",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::WeatherApi]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, weatherapi."
            )),
        }
    }
}

/// Remote lookup of the current condition for a city key.
#[async_trait]
pub trait WeatherService: Send + Sync + Debug {
    async fn get_weather(&self, full_path: &str) -> anyhow::Result<ConditionResponse>;

    /// Reports a service that cannot work at all (e.g. missing credentials),
    /// as opposed to a single lookup failing.
    fn ensure_ready(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Arc<dyn WeatherService>> {
    let api_key = config.provider_api_key(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `weather configure {id}` and enter your API key."
        )
    })?;

    let service: Arc<dyn WeatherService> = match id {
        ProviderId::OpenWeather => Arc::new(OpenWeatherProvider::new(api_key.to_owned())),
        ProviderId::WeatherApi => Arc::new(WeatherApiProvider::new(api_key.to_owned())),
    };

    Ok(service)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherService>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
