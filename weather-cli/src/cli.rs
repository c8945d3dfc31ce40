use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::{Parser, Subcommand};
use inquire::Password;
use std::sync::Arc;
use weather_core::{
    City, CityStore, Config, CycleOutcome, FileCityStore, ProviderId, UpdateOrchestrator,
    provider::default_provider_from_config,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,

        /// Make this provider the default one.
        #[arg(long)]
        default: bool,
    },

    /// Store a city to refresh.
    Add {
        /// Lookup key passed to the provider, e.g. "Kyiv,UA".
        full_path: String,

        /// Display name; defaults to the lookup key.
        #[arg(long)]
        name: Option<String>,
    },

    /// Forget a stored city.
    Remove {
        full_path: String,
    },

    /// Show stored cities with their last known weather.
    List,

    /// Fetch current weather for every stored city and save it.
    Refresh,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure { provider, default } => configure(&provider, default),
            Command::Add { full_path, name } => {
                let store = FileCityStore::open_default()?;
                let name = name.unwrap_or_else(|| full_path.clone());
                store.add(City::new(full_path, name))?;
                println!("Saved to {}", store.path().display());
                Ok(())
            }
            Command::Remove { full_path } => {
                let store = FileCityStore::open_default()?;
                if !store.remove(&full_path)? {
                    return Err(anyhow!("City '{full_path}' is not stored"));
                }
                Ok(())
            }
            Command::List => {
                let store = FileCityStore::open_default()?;
                print_cities(&store.cities().await?);
                Ok(())
            }
            Command::Refresh => refresh().await,
        }
    }
}

fn configure(provider: &str, make_default: bool) -> Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let prompt = if config.is_provider_configured(id) {
        format!("New API key for {id} (replaces the stored one):")
    } else {
        format!("API key for {id}:")
    };

    let api_key = Password::new(&prompt)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }

    config.upsert_provider_api_key(id, api_key.trim().to_string());
    if make_default {
        config.set_default_provider(id);
    }
    config.save()?;

    println!("Provider '{id}' configured in {}", Config::config_file_path()?.display());
    Ok(())
}

async fn refresh() -> Result<()> {
    let config = Config::load()?;
    let service = default_provider_from_config(&config)?;
    let policy = config.retry.policy()?;
    let store = Arc::new(FileCityStore::open_default()?);

    let orchestrator = UpdateOrchestrator::new(store.clone(), service, policy);
    let outcome = orchestrator.update()?;

    let outcome = tokio::select! {
        outcome = outcome => outcome.context("Refresh was cancelled")?,
        _ = tokio::signal::ctrl_c() => {
            orchestrator.close();
            return Err(anyhow!("Interrupted"));
        }
    };
    orchestrator.close();

    let update = match outcome {
        CycleOutcome::Published(update) => update,
        CycleOutcome::Failed(err) => return Err(err).context("Refresh failed"),
        CycleOutcome::Discarded => return Err(anyhow!("Refresh was cancelled")),
    };

    if update.is_empty {
        println!("No cities stored yet. Add one with `weather add <city>`.");
        return Ok(());
    }

    store.save(&update.cities).await?;
    print_cities(&update.cities);
    Ok(())
}

fn print_cities(cities: &[City]) {
    for city in cities {
        match &city.condition {
            Some(c) => println!(
                "{:<20} {:<24} {:>6.1}°C (feels {:.1}°C), humidity {}%, wind {:.1} m/s  [{} @ {}]",
                city.name,
                c.description,
                c.temperature_c,
                c.feels_like_c,
                c.humidity_pct,
                c.wind_speed_mps,
                c.provider,
                c.observation_time.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            ),
            None => println!("{:<20} no data yet", city.name),
        }
    }
}
