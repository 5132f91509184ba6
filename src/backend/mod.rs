//! Small-object storage backends.
//!
//! A [`KvBackend`] is the synchronous physical store under the
//! [`KvStore`](crate::kv::KvStore): a flat string-to-string namespace with a
//! hard quota it may report at write time. The backend is shared by every
//! execution context on the machine; mutations made by *other* contexts
//! surface on the change channel, never the caller's own writes.

pub mod memory;

pub use memory::MemoryBackend;

use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is out of space. Distinct from the per-entry size
    /// ceiling: this one triggers the eviction-and-retry path.
    #[error("backend quota exhausted")]
    QuotaExhausted,
    #[error("backend error: {0}")]
    Other(String),
}

/// A mutation made by a foreign execution context sharing this backend.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub key: String,
    /// New raw value, or `None` when the key was removed.
    pub new_value: Option<String>,
}

/// Synchronous small-object store. Calls never suspend.
pub trait KvBackend: Send + Sync {
    /// Raw stored text for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, overwriting. May fail with
    /// [`BackendError::QuotaExhausted`]; the prior value must survive a
    /// failed set.
    fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str);

    /// All stored keys, in no particular order.
    fn keys(&self) -> Vec<String>;

    /// Remove everything.
    fn clear(&self);

    /// Subscribe to mutations made by other execution contexts. Backends
    /// without a notification channel return `None`.
    fn subscribe(&self) -> Option<broadcast::Receiver<ChangeEvent>> {
        None
    }
}
