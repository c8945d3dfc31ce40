//! Test doubles shared by the unit tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use crate::{BackoffPolicy, Condition, ConditionResponse, WeatherService};

pub(crate) fn condition(description: &str) -> Condition {
    Condition {
        provider: "scripted".to_string(),
        description: description.to_string(),
        temperature_c: 12.5,
        feels_like_c: 11.0,
        humidity_pct: 70,
        wind_speed_mps: 3.0,
        observation_time: Utc.with_ymd_and_hms(2024, 4, 13, 12, 0, 0).unwrap(),
    }
}

/// Millisecond-scale schedule so retry tests finish quickly.
pub(crate) fn fast_policy() -> BackoffPolicy {
    BackoffPolicy::new(2, Duration::from_millis(1), 5).unwrap()
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Script {
    /// Fail this many times, then answer.
    FailTimes(u32),
    AlwaysFail,
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedService {
    scripts: HashMap<String, Script>,
    latency: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, u32>>,
    total: AtomicU32,
    broken: bool,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(mut self, key: &str, script: Script) -> Self {
        self.scripts.insert(key.to_string(), script);
        self
    }

    pub(crate) fn latency(mut self, key: &str, latency: Duration) -> Self {
        self.latency.insert(key.to_string(), latency);
        self
    }

    /// `ensure_ready` fails, as for a provider without credentials.
    pub(crate) fn broken() -> Self {
        Self { broken: true, ..Self::default() }
    }

    pub(crate) fn calls(&self, key: &str) -> u32 {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> u32 {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherService for ScriptedService {
    async fn get_weather(&self, full_path: &str) -> Result<ConditionResponse> {
        self.total.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(full_path.to_string()).or_insert(0);
            *n += 1;
            *n
        };

        if let Some(latency) = self.latency.get(full_path) {
            tokio::time::sleep(*latency).await;
        }

        let fails = match self.scripts.get(full_path).copied().unwrap_or(Script::FailTimes(0)) {
            Script::AlwaysFail => true,
            Script::FailTimes(n) => attempt <= n,
        };

        if fails {
            return Err(anyhow!("unreachable host for {full_path} (attempt {attempt})"));
        }

        Ok(ConditionResponse {
            location_name: full_path.to_string(),
            condition: condition(&format!("{full_path} #{attempt}")),
        })
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.broken {
            return Err(anyhow!("no API key configured"));
        }
        Ok(())
    }
}
