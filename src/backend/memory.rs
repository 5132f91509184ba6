use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::{BackendError, ChangeEvent, KvBackend};

/// In-memory [`KvBackend`] with an optional byte quota.
///
/// The reference backend for unit and integration tests. The quota counts
/// key plus value bytes across all entries, and a failed `set` leaves the
/// prior value in place, matching how a real small-object store reports
/// exhaustion.
///
/// [`notify_external`](MemoryBackend::notify_external) plays the part of a
/// foreign tab: it mutates the shared map *and* publishes a [`ChangeEvent`],
/// whereas local `set`/`remove` calls never publish.
pub struct MemoryBackend {
    data: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::with_quota(None)
    }

    /// Backend that reports [`BackendError::QuotaExhausted`] once the
    /// summed key+value bytes would exceed `quota_bytes`.
    #[must_use]
    pub fn bounded(quota_bytes: usize) -> Self {
        Self::with_quota(Some(quota_bytes))
    }

    fn with_quota(quota_bytes: Option<usize>) -> Self {
        let (changes, _) = broadcast::channel(32);
        Self {
            data: RwLock::new(HashMap::new()),
            quota_bytes,
            changes,
        }
    }

    /// Current entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Summed key+value bytes currently stored.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.data
            .read()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    /// Simulate a mutation from another execution context: write the
    /// shared map directly and publish the change. `None` removes the key.
    pub fn notify_external(&self, key: &str, new_value: Option<&str>) {
        {
            let mut data = self.data.write();
            match new_value {
                Some(v) => {
                    data.insert(key.to_string(), v.to_string());
                }
                None => {
                    data.remove(key);
                }
            }
        }
        // No subscribers is fine; drop the event.
        let _ = self.changes.send(ChangeEvent {
            key: key.to_string(),
            new_value: new_value.map(str::to_string),
        });
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let mut data = self.data.write();
        if let Some(quota) = self.quota_bytes {
            let used: usize = data
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(BackendError::QuotaExhausted);
            }
        }
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.data.write().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    fn clear(&self) {
        self.data.write().clear();
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<ChangeEvent>> {
        Some(self.changes.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let backend = MemoryBackend::new();
        backend.set("k", "v").unwrap();
        assert_eq!(backend.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn get_absent_returns_none() {
        let backend = MemoryBackend::new();
        assert!(backend.get("missing").is_none());
    }

    #[test]
    fn remove_absent_is_ok() {
        let backend = MemoryBackend::new();
        backend.remove("missing");
    }

    #[test]
    fn quota_rejects_and_preserves_prior_value() {
        let backend = MemoryBackend::bounded(10);
        backend.set("k", "12345").unwrap(); // 1 + 5 = 6 bytes
        let err = backend.set("k", "123456789012345").unwrap_err();
        assert!(matches!(err, BackendError::QuotaExhausted));
        assert_eq!(backend.get("k").as_deref(), Some("12345"));
    }

    #[test]
    fn quota_counts_replacement_not_double() {
        let backend = MemoryBackend::bounded(10);
        backend.set("k", "123456789").unwrap();
        // Replacing the same key must not count the old value.
        backend.set("k", "987654321").unwrap();
    }

    #[test]
    fn freed_space_allows_retry() {
        let backend = MemoryBackend::bounded(12);
        backend.set("a", "12345").unwrap();
        assert!(backend.set("b", "1234567890").is_err());
        backend.remove("a");
        backend.set("b", "1234567890").unwrap();
    }

    #[tokio::test]
    async fn notify_external_publishes_and_mutates() {
        let backend = MemoryBackend::new();
        let mut rx = backend.subscribe().unwrap();
        backend.notify_external("k", Some("v"));
        assert_eq!(backend.get("k").as_deref(), Some("v"));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.key, "k");
        assert_eq!(event.new_value.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn local_set_does_not_publish() {
        let backend = MemoryBackend::new();
        let mut rx = backend.subscribe().unwrap();
        backend.set("k", "v").unwrap();
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn clear_removes_everything() {
        let backend = MemoryBackend::new();
        backend.set("a", "1").unwrap();
        backend.set("b", "2").unwrap();
        backend.clear();
        assert!(backend.is_empty());
        assert!(backend.keys().is_empty());
    }
}
