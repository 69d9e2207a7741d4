//! Model repository implementation
//!
//! The repository owns the name → model mapping and every entry's readiness
//! state. Map access goes through a sharded concurrent map and per-entry
//! locks, so lookups never block on slow loads of other names. Concurrent
//! loads of the same name collapse into one execution whose outcome all
//! callers observe (single-flight).

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use common::error::{Error, Result};

use crate::model::{Model, ModelState};

/// Shared outcome of an in-flight load. The reason string stands in for the
/// original error so every waiter observes the same failure.
type LoadOutcome = std::result::Result<bool, String>;

/// Repository entry owning a model instance and its readiness state
struct ModelEntry {
    /// The model instance. In-flight requests hold their own `Arc`, so an
    /// unload never invalidates a prediction already executing.
    model: Arc<dyn Model>,

    /// Readiness state, mutated only while the entry's operation lock is held
    state: RwLock<ModelState>,

    /// Serializes load/unload against each other for this entry
    op_lock: Mutex<()>,
}

/// Concurrency-safe store of loaded models and their readiness state
pub struct ModelRepository {
    /// Registered models by name
    entries: Arc<DashMap<String, Arc<ModelEntry>>>,

    /// In-flight loads by name; late callers attach to the receiver instead
    /// of starting a second load
    in_flight_loads: Arc<Mutex<HashMap<String, watch::Receiver<Option<LoadOutcome>>>>>,
}

impl ModelRepository {
    /// Creates an empty repository
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            in_flight_loads: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a model in `Uninitialized` state. Re-registering a name
    /// replaces the previous entry.
    pub fn register(&self, model: Arc<dyn Model>) {
        let name = model.name().to_string();

        let entry = Arc::new(ModelEntry {
            model,
            state: RwLock::new(ModelState::Uninitialized),
            op_lock: Mutex::new(()),
        });

        if self.entries.insert(name.clone(), entry).is_some() {
            warn!("Model {} was re-registered, replacing previous entry", name);
        } else {
            info!("Registered model {}", name);
        }
    }

    /// Non-blocking lookup of a model instance
    pub fn get(&self, name: &str) -> Option<Arc<dyn Model>> {
        self.entries.get(name).map(|entry| entry.model.clone())
    }

    /// Current lifecycle state of an entry, if present
    pub fn state(&self, name: &str) -> Option<ModelState> {
        self.entries.get(name).map(|entry| entry.state.read().clone())
    }

    /// Whether the named model exists and is ready to serve
    pub fn is_ready(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .map(|entry| entry.state.read().is_ready())
            .unwrap_or(false)
    }

    /// Names of all models in `Ready` state
    pub fn list(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.value().state.read().is_ready())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of registered entries, regardless of state
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no models are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads a registered model, installing it in `Ready` state on success
    /// and `LoadFailed` on failure. Single-flight per name: if a load for
    /// this name is already running, the caller waits for that operation's
    /// outcome instead of starting a second one. `LoadFailed` is retryable
    /// by calling `load` again.
    pub async fn load(&self, name: &str) -> Result<bool> {
        let entry = self
            .entries
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::ModelNotFound(name.to_string()))?;

        let rx = {
            let mut in_flight = self.in_flight_loads.lock().await;

            match in_flight.get(name) {
                Some(rx) => {
                    debug!("Attaching to in-flight load of model {}", name);
                    rx.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    in_flight.insert(name.to_string(), rx.clone());

                    let name = name.to_string();
                    let entries = self.entries.clone();
                    let in_flight_loads = self.in_flight_loads.clone();

                    // Detached task: a caller dropped mid-await must not
                    // strand the in-flight slot. The slot is cleared before
                    // the outcome is published, so a caller arriving after
                    // publication starts a fresh load instead of reading a
                    // stale result.
                    tokio::spawn(async move {
                        let outcome = run_load(&name, &entry, &entries).await;
                        in_flight_loads.lock().await.remove(&name);
                        let _ = tx.send(Some(outcome));
                    });

                    rx
                }
            }
        };

        Self::await_outcome(name, rx).await
    }

    /// Waits for an in-flight load started by another caller
    async fn await_outcome(
        name: &str,
        mut rx: watch::Receiver<Option<LoadOutcome>>,
    ) -> Result<bool> {
        loop {
            let current = rx.borrow().clone();
            if let Some(outcome) = current {
                return outcome.map_err(Error::Model);
            }
            if rx.changed().await.is_err() {
                return Err(Error::Internal(format!(
                    "Load of model {} was aborted",
                    name
                )));
            }
        }
    }

    /// Removes the named entry. Does not wait for in-flight predictions to
    /// drain: they hold their own reference to the model instance and
    /// complete normally; only new requests see the name disappear.
    pub async fn unload(&self, name: &str) -> Result<()> {
        let entry = self
            .entries
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::ModelNotFound(name.to_string()))?;

        let _op = entry.op_lock.lock().await;

        *entry.state.write() = ModelState::Unloading;
        self.entries.remove(name);

        info!("Model {} unloaded", name);

        Ok(())
    }
}

impl Default for ModelRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes the actual load under the entry's operation lock, recording the
/// resulting lifecycle state
async fn run_load(
    name: &str,
    entry: &ModelEntry,
    entries: &DashMap<String, Arc<ModelEntry>>,
) -> LoadOutcome {
    let _op = entry.op_lock.lock().await;

    if !entries.contains_key(name) {
        return Err(format!("Model {} was unloaded during load", name));
    }

    *entry.state.write() = ModelState::Loading;
    info!("Loading model {}", name);

    match entry.model.load().await {
        Ok(ready) => {
            *entry.state.write() = ModelState::Ready;
            info!("Model {} loaded successfully", name);
            Ok(ready)
        }
        Err(e) => {
            let reason = e.to_string();
            *entry.state.write() = ModelState::LoadFailed(reason.clone());
            warn!("Model {} failed to load: {}", name, reason);
            Err(reason)
        }
    }
}
