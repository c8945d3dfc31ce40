//! Lifecycle of refresh cycles and delivery of their results.
//!
//! Every [`UpdateOrchestrator::update_and_show`] call spawns one cycle on the
//! tokio runtime. A settled cycle publishes a [`CitiesUpdate`] to all
//! subscribers; a failed one is only logged. [`UpdateOrchestrator::close`]
//! cancels everything ever started through the instance.

use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::{
    sync::{broadcast, oneshot, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    BackoffPolicy, CitiesUpdate, CityStore, OpenEvent, WeatherService,
    aggregator::{CycleError, run_cycle},
};

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("orchestrator is closed")]
    Closed,
}

/// How one cycle ended, reported to the caller that started it.
///
/// A cycle cancelled by `close` reports nothing: its sender is dropped.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Sent to subscribers; the same update is carried here.
    Published(CitiesUpdate),
    Failed(CycleError),
    /// Settled after `close`, so subscribers never saw it.
    Discarded,
}

#[derive(Debug, Default)]
struct Registry {
    closed: bool,
    handles: Vec<JoinHandle<()>>,
}

/// State shared between the orchestrator and its cycle tasks.
#[derive(Debug)]
struct Shared {
    registry: Mutex<Registry>,
    cities_tx: broadcast::Sender<CitiesUpdate>,
    events_tx: broadcast::Sender<OpenEvent>,
    placeholder_tx: watch::Sender<bool>,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Never left half-updated, so a poisoned lock is still usable.
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish under the registry lock so nothing slips out after `close`.
    fn publish(&self, update: CitiesUpdate) -> bool {
        let registry = self.registry();
        if registry.closed {
            return false;
        }

        self.placeholder_tx.send_replace(update.is_empty);
        // No receivers is fine: results are not buffered for late subscribers.
        let _ = self.cities_tx.send(update);
        true
    }
}

#[derive(Debug)]
pub struct UpdateOrchestrator {
    store: Arc<dyn CityStore>,
    service: Arc<dyn WeatherService>,
    policy: BackoffPolicy,
    shutdown: CancellationToken,
    shared: Arc<Shared>,
}

impl UpdateOrchestrator {
    pub fn new(
        store: Arc<dyn CityStore>,
        service: Arc<dyn WeatherService>,
        policy: BackoffPolicy,
    ) -> Self {
        let (cities_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (events_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (placeholder_tx, _) = watch::channel(true);

        Self {
            store,
            service,
            policy,
            shutdown: CancellationToken::new(),
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                cities_tx,
                events_tx,
                placeholder_tx,
            }),
        }
    }

    /// Construct and immediately start the first refresh cycle.
    ///
    /// Subscribe before awaiting anything, or the first update may be missed.
    pub fn launch(
        store: Arc<dyn CityStore>,
        service: Arc<dyn WeatherService>,
        policy: BackoffPolicy,
    ) -> Self {
        let orchestrator = Self::new(store, service, policy);
        // A fresh instance is never closed.
        let _ = orchestrator.update_and_show();
        orchestrator
    }

    /// Start one refresh cycle. Concurrent calls start independent cycles.
    ///
    /// Must be called from within a tokio runtime.
    pub fn update_and_show(&self) -> Result<(), OrchestratorError> {
        self.update().map(drop)
    }

    /// Like [`update_and_show`](Self::update_and_show), also returning the
    /// cycle's outcome. The receiver errors if the cycle is cancelled.
    pub fn update(&self) -> Result<oneshot::Receiver<CycleOutcome>, OrchestratorError> {
        let mut registry = self.shared.registry();
        if registry.closed {
            return Err(OrchestratorError::Closed);
        }

        registry.handles.retain(|handle| !handle.is_finished());

        let store = Arc::clone(&self.store);
        let service = Arc::clone(&self.service);
        let policy = self.policy;
        let shutdown = self.shutdown.child_token();
        let shared = Arc::clone(&self.shared);
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let result = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Refresh cycle cancelled");
                    return;
                }
                result = run_cycle(store.as_ref(), service, policy) => result,
            };

            let outcome = match result {
                Ok(cities) => {
                    let update = CitiesUpdate::from(cities);
                    if shared.publish(update.clone()) {
                        CycleOutcome::Published(update)
                    } else {
                        debug!("Dropping refresh result after close");
                        CycleOutcome::Discarded
                    }
                }
                Err(err) => {
                    error!(error = %err, "Refresh cycle failed");
                    CycleOutcome::Failed(err)
                }
            };

            // The caller may not be waiting.
            let _ = outcome_tx.send(outcome);
        });

        registry.handles.push(handle);
        info!(in_flight = registry.handles.len(), "Refresh cycle started");
        Ok(outcome_rx)
    }

    /// Ask the UI to open the add-city flow.
    pub fn add_city(&self) {
        let registry = self.shared.registry();
        if registry.closed {
            return;
        }
        let _ = self.shared.events_tx.send(OpenEvent::AddCity);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CitiesUpdate> {
        self.shared.cities_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<OpenEvent> {
        self.shared.events_tx.subscribe()
    }

    /// `true` until a cycle publishes a non-empty list.
    pub fn placeholder_visible(&self) -> watch::Receiver<bool> {
        self.shared.placeholder_tx.subscribe()
    }

    /// Cycles started and not yet settled.
    pub fn in_flight(&self) -> usize {
        self.shared.registry().handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.registry().closed
    }

    /// Cancel all in-flight cycles and stop accepting new ones. Idempotent.
    pub fn close(&self) {
        let mut registry = self.shared.registry();
        if registry.closed {
            return;
        }

        registry.closed = true;
        self.shutdown.cancel();

        let handles = std::mem::take(&mut registry.handles);
        let cancelled = handles.len();
        for handle in handles {
            handle.abort();
        }

        info!(cancelled, "Orchestrator closed");
    }
}

impl Drop for UpdateOrchestrator {
    fn drop(&mut self) {
        self.close();
    }
}
