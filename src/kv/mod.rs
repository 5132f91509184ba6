// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Size-bounded, JSON-serializing key-value store with debounced writes.
//!
//! The [`KvStore`] keeps an in-memory mirror of every key it has touched, so
//! reads and writes within the process are synchronous and immediately
//! observable, while physical persistence to the [`KvBackend`] lags behind a
//! per-key debounce window (last-scheduled-wins).
//!
//! Two distinct failure modes guard the backend:
//!
//! - **Size ceiling**: a serialized value over `max_item_bytes` is rejected
//!   outright, no retry, backend untouched. The router redirects such
//!   payloads to the blob store.
//! - **Quota exhaustion**: the backend itself reports it is full. The store
//!   walks a static priority list of sacrificial keys, evicting one at a
//!   time and retrying, stopping at first success or list exhaustion.
//!
//! Nothing here is fatal: failures are logged and surfaced as booleans or
//! `Result`s.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use startpage_store::{KvStore, MemoryBackend, StoreConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let backend = Arc::new(MemoryBackend::new());
//! let store = KvStore::new(backend, &StoreConfig::default());
//!
//! store.write("clockFormat", &"24h");
//! // Visible in-process before the debounce timer fires.
//! assert_eq!(store.read("clockFormat", String::new()), "24h");
//!
//! // Deterministic persistence for tests.
//! assert!(store.flush("clockFormat"));
//! # }
//! ```

mod debounce;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::backend::{BackendError, KvBackend};
use crate::config::StoreConfig;
use debounce::PendingWrites;

#[derive(Error, Debug)]
pub enum KvError {
    #[error("value for '{key}' cannot be serialized: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// Serialized value is over the small-object ceiling. No eviction is
    /// attempted for this; it is a pre-check, not backend pressure.
    #[error("value for '{key}' is {size} bytes, over the {limit}-byte ceiling")]
    CapacityExceeded {
        key: String,
        size: usize,
        limit: usize,
    },
    /// Backend reported a full quota and the eviction list is spent.
    #[error("quota exhausted writing '{key}' and eviction list spent")]
    QuotaExhausted { key: String },
    #[error("backend error writing '{key}': {message}")]
    Backend { key: String, message: String },
}

struct Inner {
    backend: Arc<dyn KvBackend>,
    cache: DashMap<String, Value>,
    pending: PendingWrites,
    max_item_bytes: usize,
    debounce: Duration,
    eviction_priority: Vec<String>,
}

/// The primary store. Cheap to clone; clones share state.
///
/// Write scheduling spawns Tokio timer tasks, so the store must live inside
/// a Tokio runtime.
#[derive(Clone)]
pub struct KvStore {
    inner: Arc<Inner>,
}

impl KvStore {
    pub fn new(backend: Arc<dyn KvBackend>, config: &StoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                cache: DashMap::new(),
                pending: PendingWrites::new(),
                max_item_bytes: config.max_item_bytes,
                debounce: Duration::from_millis(config.debounce_ms),
                eviction_priority: config.eviction_priority.clone(),
            }),
        }
    }

    /// Read `key`, falling back to `default` when the key is absent or the
    /// stored text is not valid JSON for `T`. Never errors.
    pub fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        if let Some(value) = self.inner.cache.get(key) {
            return match serde_json::from_value(value.clone()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(key = %key, error = %e, "cached value has wrong shape, using default");
                    default
                }
            };
        }

        let Some(raw) = self.inner.backend.get(key) else {
            return default;
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => {
                let parsed = serde_json::from_value(value.clone());
                self.inner.cache.insert(key.to_string(), value);
                match parsed {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!(key = %key, error = %e, "stored value has wrong shape, using default");
                        default
                    }
                }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "stored value is corrupt JSON, using default");
                default
            }
        }
    }

    /// Write `key`, updating the in-memory mirror synchronously and
    /// scheduling a debounced persist of the serialized snapshot.
    ///
    /// Returns `false` only when the value cannot be serialized; physical
    /// persistence failures surface later, on the timer task or on
    /// [`flush`](Self::flush).
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                error!(key = %key, error = %e, "write dropped, value not serializable");
                return false;
            }
        };
        let serialized = value.to_string();
        self.inner.cache.insert(key.to_string(), value);
        self.schedule_persist(key, serialized);
        true
    }

    /// Write `key` synchronously, bypassing the debounce. The mirror is
    /// updated only after the backend accepts the value, so a failed direct
    /// write leaves both tiers untouched.
    ///
    /// This is the path the storage router uses for size-sensitive
    /// payloads: [`KvError::CapacityExceeded`] tells it to redirect.
    pub fn write_direct<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), KvError> {
        let value = serde_json::to_value(value).map_err(|source| KvError::Serialization {
            key: key.to_string(),
            source,
        })?;
        let serialized = value.to_string();
        // A pending debounced write would overwrite what we persist here.
        let _ = self.inner.pending.take(key);
        self.inner.persist_raw(key, &serialized)?;
        self.inner.cache.insert(key.to_string(), value);
        Ok(())
    }

    /// Atomic read-modify-write against the latest in-memory value, then a
    /// debounced persist. The entry stays locked while `f` runs, so
    /// concurrent updates to the same key in this process cannot lose
    /// increments. Cross-tab concurrency remains last-writer-wins.
    pub fn update<T, F>(&self, key: &str, default: T, f: F) -> bool
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let serialized = {
            let mut entry = self.inner.cache.entry(key.to_string()).or_insert_with(|| {
                self.inner
                    .backend
                    .get(key)
                    .and_then(|raw| serde_json::from_str(&raw).ok())
                    .unwrap_or(Value::Null)
            });
            let mut current: T = serde_json::from_value(entry.clone()).unwrap_or(default);
            f(&mut current);
            let value = match serde_json::to_value(&current) {
                Ok(value) => value,
                Err(e) => {
                    error!(key = %key, error = %e, "update dropped, value not serializable");
                    return false;
                }
            };
            let serialized = value.to_string();
            *entry = value;
            serialized
        };
        self.schedule_persist(key, serialized);
        true
    }

    /// Persist the pending snapshot for `key` now, cancelling its timer.
    /// Returns `true` when nothing was pending or the persist succeeded.
    pub fn flush(&self, key: &str) -> bool {
        match self.inner.pending.take(key) {
            Some(serialized) => match self.inner.persist_raw(key, &serialized) {
                Ok(()) => true,
                Err(e) => {
                    warn!(key = %key, error = %e, "flush failed");
                    false
                }
            },
            None => true,
        }
    }

    /// Flush every pending write. Returns `true` only if all persists
    /// succeeded.
    pub fn flush_all(&self) -> bool {
        let mut ok = true;
        for (key, serialized) in self.inner.pending.take_all() {
            if let Err(e) = self.inner.persist_raw(&key, &serialized) {
                warn!(key = %key, error = %e, "flush failed");
                ok = false;
            }
        }
        ok
    }

    /// Remove `key` from the mirror, the pending table, and the backend.
    pub fn remove(&self, key: &str) {
        let _ = self.inner.pending.take(key);
        self.inner.cache.remove(key);
        self.inner.backend.remove(key);
    }

    /// Remove every key everywhere. Pending writes are discarded.
    pub fn clear(&self) {
        let _ = self.inner.pending.take_all();
        self.inner.cache.clear();
        self.inner.backend.clear();
    }

    /// Replace the in-memory value for `key` with JSON received from a
    /// foreign execution context. Never schedules a persist: the value is
    /// already durable where it came from, and re-persisting it here would
    /// start a write loop across tabs.
    ///
    /// Returns `false` (state unchanged) when the payload is malformed.
    pub fn apply_external(&self, key: &str, raw: &str) -> bool {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => {
                debug!(key = %key, "applied external change");
                self.inner.cache.insert(key.to_string(), value);
                true
            }
            Err(e) => {
                warn!(key = %key, error = %e, "ignoring malformed external change");
                false
            }
        }
    }

    /// Drop the in-memory value for `key` after a foreign context removed
    /// it. No persist is scheduled and the backend is not touched.
    pub fn apply_external_removal(&self, key: &str) {
        debug!(key = %key, "applied external removal");
        self.inner.cache.remove(key);
    }

    /// Current state of every key, as JSON values: backend contents merged
    /// with the (possibly fresher) in-memory mirror. Used by the export
    /// path.
    pub fn snapshot(&self) -> std::collections::BTreeMap<String, Value> {
        let mut out = std::collections::BTreeMap::new();
        for key in self.inner.backend.keys() {
            if let Some(raw) = self.inner.backend.get(&key) {
                if let Ok(value) = serde_json::from_str::<Value>(&raw) {
                    out.insert(key, value);
                }
            }
        }
        for entry in self.inner.cache.iter() {
            out.insert(entry.key().clone(), entry.value().clone());
        }
        out
    }

    /// Number of keys with a physical write still pending.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.inner.pending.len()
    }

    /// The shared physical backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.inner.backend
    }

    fn schedule_persist(&self, key: &str, serialized: String) {
        self.inner.pending.replace_snapshot(key, serialized);
        let inner = Arc::clone(&self.inner);
        let key_owned = key.to_string();
        let delay = self.inner.debounce;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(serialized) = inner.pending.take_fired(&key_owned) {
                if let Err(e) = inner.persist_raw(&key_owned, &serialized) {
                    warn!(key = %key_owned, error = %e, "scheduled persist failed");
                }
            }
        });
        self.inner.pending.attach_timer(key, timer);
    }
}

impl Inner {
    fn persist_raw(&self, key: &str, serialized: &str) -> Result<(), KvError> {
        if serialized.len() > self.max_item_bytes {
            return Err(KvError::CapacityExceeded {
                key: key.to_string(),
                size: serialized.len(),
                limit: self.max_item_bytes,
            });
        }
        match self.backend.set(key, serialized) {
            Ok(()) => Ok(()),
            Err(BackendError::QuotaExhausted) => self.evict_and_retry(key, serialized),
            Err(e) => Err(KvError::Backend {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Walk the static priority list, sacrificing one key at a time and
    /// retrying the write. Never evicts the key being written.
    fn evict_and_retry(&self, key: &str, serialized: &str) -> Result<(), KvError> {
        for victim in &self.eviction_priority {
            if victim == key {
                continue;
            }
            // Cancel any pending write that would resurrect the victim.
            let _ = self.pending.take(victim);
            self.cache.remove(victim.as_str());
            self.backend.remove(victim);
            warn!(victim = %victim, key = %key, "quota exhausted, evicted low-priority key");

            match self.backend.set(key, serialized) {
                Ok(()) => {
                    info!(key = %key, victim = %victim, "write succeeded after eviction");
                    return Ok(());
                }
                Err(BackendError::QuotaExhausted) => continue,
                Err(e) => {
                    return Err(KvError::Backend {
                        key: key.to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }
        error!(key = %key, "quota exhausted and eviction list spent");
        Err(KvError::QuotaExhausted {
            key: key.to_string(),
        })
    }
}
