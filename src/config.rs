//! Configuration for the storage layer.
//!
//! # Example
//!
//! ```
//! use startpage_store::StoreConfig;
//!
//! // Minimal config (uses defaults)
//! let config = StoreConfig::default();
//! assert_eq!(config.max_item_bytes, 2 * 1024 * 1024); // 2 MiB
//!
//! // Tightened for tests
//! let config = StoreConfig {
//!     max_item_bytes: 4 * 1024,
//!     debounce_ms: 0,
//!     ..Default::default()
//! };
//! assert_eq!(config.top_sites_limit, 10);
//! ```

use serde::Deserialize;

/// Configuration for the storage layer.
///
/// All fields have sensible defaults matching the reference behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Ceiling on the serialized size of a single key-value entry.
    /// Values above this are rejected by the KVS and must be routed to
    /// the blob store (default: 2 MiB).
    #[serde(default = "default_max_item_bytes")]
    pub max_item_bytes: usize,

    /// Quiet window before a scheduled write is persisted. Rapid
    /// successive writes to one key re-arm the timer (default: 300 ms).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Ceiling for storing a routed payload inline in the KVS when the
    /// blob store is unavailable (default: 500 KB). Deliberately tighter
    /// than `max_item_bytes`: one bulky inline image would crowd out the
    /// small structured state sharing the backend quota.
    #[serde(default = "default_max_inline_bytes")]
    pub max_inline_bytes: usize,

    /// Named partition inside the blob container (default: "settings").
    #[serde(default = "default_blob_partition")]
    pub blob_partition: String,

    /// Cap on the frequently-visited ranking (default: 10).
    #[serde(default = "default_top_sites_limit")]
    pub top_sites_limit: usize,

    /// Keys sacrificed, in order, when the backend reports a full quota.
    /// Defaults to [`keys::EVICTION_PRIORITY`](crate::keys::EVICTION_PRIORITY).
    #[serde(default = "default_eviction_priority")]
    pub eviction_priority: Vec<String>,
}

fn default_max_item_bytes() -> usize {
    2 * 1024 * 1024
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_max_inline_bytes() -> usize {
    500_000
}
fn default_blob_partition() -> String {
    "settings".to_string()
}
fn default_top_sites_limit() -> usize {
    10
}
fn default_eviction_priority() -> Vec<String> {
    crate::keys::EVICTION_PRIORITY
        .iter()
        .map(|k| (*k).to_string())
        .collect()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_item_bytes: default_max_item_bytes(),
            debounce_ms: default_debounce_ms(),
            max_inline_bytes: default_max_inline_bytes(),
            blob_partition: default_blob_partition(),
            top_sites_limit: default_top_sites_limit(),
            eviction_priority: default_eviction_priority(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behavior() {
        let config = StoreConfig::default();
        assert_eq!(config.max_item_bytes, 2 * 1024 * 1024);
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.max_inline_bytes, 500_000);
        assert_eq!(config.blob_partition, "settings");
        assert_eq!(config.top_sites_limit, 10);
        assert_eq!(
            config.eviction_priority,
            vec!["wallpaper", "visitHistory", "quick-notes"]
        );
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"debounce_ms": 10}"#).unwrap();
        assert_eq!(config.debounce_ms, 10);
        assert_eq!(config.max_item_bytes, 2 * 1024 * 1024);
    }
}
