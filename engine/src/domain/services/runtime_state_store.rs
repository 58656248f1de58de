//! Runtime State Store
//! Persisted per-project runtime state, reconciled against the OS on read
//!
//! Every read-modify-write on a project's state happens while holding that
//! project's lock. Methods that expect the lock to be held take a
//! [`ProjectGuard`], which can only be obtained from [`RuntimeStateStore::lock`].

use crate::constants::store::{PROJECT_KEY_PREFIX, STATE_KEY_PREFIX};
use crate::domain::ports::{ProcessExecutor, StateStore};
use crate::domain::{DomainError, RuntimeState};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Keyed async mutex: one lock per project name
///
/// An entry lives only while some caller holds or waits for it, so names that
/// are merely looked up do not accumulate.
#[derive(Default)]
pub struct KeyedLocks {
    locks: LockMap,
}

type Slots = HashMap<String, Arc<AsyncMutex<()>>>;
type LockMap = Arc<Mutex<Slots>>;

fn lock_map(locks: &LockMap) -> MutexGuard<'_, Slots> {
    // poisoning only happens if a holder panicked mid-insert; the map stays usable
    locks.lock().unwrap_or_else(|e| e.into_inner())
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, name: &str) -> ProjectGuard {
        let slot = {
            let mut locks = lock_map(&self.locks);
            // entries left behind by waiters that gave up
            locks.retain(|_, slot| Arc::strong_count(slot) > 1);
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = slot.clone().lock_owned().await;
        ProjectGuard {
            name: name.to_string(),
            guard: Some(guard),
            slot,
            locks: self.locks.clone(),
        }
    }

    /// Names with a live entry
    pub fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Proof that the caller holds a project's lock
pub struct ProjectGuard {
    name: String,
    guard: Option<OwnedMutexGuard<()>>,
    slot: Arc<AsyncMutex<()>>,
    locks: LockMap,
}

impl ProjectGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ProjectGuard {
    fn drop(&mut self) {
        // unlock first: a pruned entry must never still be held
        self.guard.take();

        let mut locks = lock_map(&self.locks);
        let ours = locks
            .get(&self.name)
            .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot));
        // the map and this guard are the only references left: no waiters
        if ours && Arc::strong_count(&self.slot) == 2 {
            locks.remove(&self.name);
        }
    }
}

impl std::fmt::Debug for ProjectGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectGuard").field("name", &self.name).finish()
    }
}

pub(crate) fn state_key(name: &str) -> String {
    format!("{}{}", STATE_KEY_PREFIX, name)
}

pub struct RuntimeStateStore {
    store: Arc<dyn StateStore>,
    executor: Arc<dyn ProcessExecutor>,
    locks: KeyedLocks,
}

impl RuntimeStateStore {
    pub fn new(store: Arc<dyn StateStore>, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            store,
            executor,
            locks: KeyedLocks::new(),
        }
    }

    /// Acquire the per-project lock
    pub async fn lock(&self, name: &str) -> ProjectGuard {
        self.locks.lock(name).await
    }

    /// Number of project locks currently held or awaited
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    /// Stored state without reconciliation
    pub async fn load_locked(
        &self,
        guard: &ProjectGuard,
    ) -> Result<Option<RuntimeState>, DomainError> {
        match self.store.get(&state_key(guard.name())).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Stored state cross-checked against the OS; a dead PID is corrected and persisted
    pub async fn get_locked(
        &self,
        guard: &ProjectGuard,
    ) -> Result<Option<RuntimeState>, DomainError> {
        let Some(state) = self.load_locked(guard).await? else {
            return Ok(None);
        };

        if !state.is_running() || self.executor.is_alive(state.pid).await {
            return Ok(Some(state));
        }

        info!(
            project = %guard.name(),
            pid = state.pid,
            "Recorded process is gone, marking project stopped"
        );
        let corrected = state.exited(Utc::now());
        self.put_locked(guard, &corrected).await?;
        Ok(Some(corrected))
    }

    pub async fn put_locked(
        &self,
        guard: &ProjectGuard,
        state: &RuntimeState,
    ) -> Result<(), DomainError> {
        debug!(project = %guard.name(), pid = state.pid, "Persisting runtime state");
        let raw = serde_json::to_string(state)?;
        self.store.put(&state_key(guard.name()), raw).await
    }

    pub async fn delete_locked(&self, guard: &ProjectGuard) -> Result<(), DomainError> {
        self.store.delete(&state_key(guard.name())).await
    }

    /// Reconciled state; `NotFound` if the project was never started
    pub async fn get(&self, name: &str) -> Result<RuntimeState, DomainError> {
        let guard = self.lock(name).await;
        self.get_locked(&guard)
            .await?
            .ok_or_else(|| DomainError::NotFound(name.to_string()))
    }

    /// Unconditional overwrite
    pub async fn put(&self, name: &str, state: &RuntimeState) -> Result<(), DomainError> {
        let guard = self.lock(name).await;
        self.put_locked(&guard, state).await
    }

    /// Reconciled state of every registered project. Never-started projects read PID=0.
    pub async fn list_all(&self) -> Result<BTreeMap<String, RuntimeState>, DomainError> {
        let names: Vec<String> = self
            .store
            .scan_prefix(PROJECT_KEY_PREFIX)
            .await?
            .into_iter()
            .filter_map(|(key, _)| key.strip_prefix(PROJECT_KEY_PREFIX).map(str::to_string))
            .collect();

        let mut states = BTreeMap::new();
        for name in names {
            let guard = self.lock(&name).await;
            let state = self.get_locked(&guard).await?.unwrap_or_default();
            drop(guard);
            states.insert(name, state);
        }
        Ok(states)
    }
}
