use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::model::{Condition, ConditionResponse};

use super::{ProviderId, WeatherService, truncate_body};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            http: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[async_trait]
impl WeatherService for OpenWeatherProvider {
    async fn get_weather(&self, full_path: &str) -> Result<ConditionResponse> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", full_path),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .context("Failed to send request to OpenWeather (current weather)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read OpenWeather current response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather current request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).context("Failed to parse OpenWeather current JSON")?;

        let observation_time = DateTime::<Utc>::from_timestamp(parsed.dt, 0).unwrap_or_else(Utc::now);

        let description = parsed
            .weather
            .first()
            .map(|w| w.description.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(ConditionResponse {
            location_name: parsed.name,
            condition: Condition {
                provider: ProviderId::OpenWeather.to_string(),
                description,
                temperature_c: parsed.main.temp,
                feels_like_c: parsed.main.feels_like,
                humidity_pct: parsed.main.humidity,
                wind_speed_mps: parsed.wind.speed,
                observation_time,
            },
        })
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow!("OpenWeather API key is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_current_weather() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Kyiv"))
            .and(query_param("appid", "KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "name": "Kyiv",
                    "dt": 1700000000,
                    "main": {"temp": 3.5, "feels_like": 1.0, "humidity": 81},
                    "weather": [{"description": "light rain"}],
                    "wind": {"speed": 4.2}
                }"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url("KEY".into(), server.uri());
        let response = provider.get_weather("Kyiv").await.unwrap();

        assert_eq!(response.location_name, "Kyiv");
        let condition = response.into_condition();
        assert_eq!(condition.description, "light rain");
        assert_eq!(condition.humidity_pct, 81);
        assert_eq!(condition.provider, "openweather");
        assert_eq!(condition.observation_time.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url("KEY".into(), server.uri());
        let err = provider.get_weather("Kyiv").await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("maintenance"));
    }

    #[test]
    fn empty_key_is_not_ready() {
        let provider = OpenWeatherProvider::new("  ".into());
        assert!(provider.ensure_ready().is_err());
    }
}
