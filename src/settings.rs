// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Settings backup, restore, and full reset.
//!
//! Export serializes every KVS key into one JSON document. Inline image
//! data is replaced by a placeholder so an export stays small enough to
//! mail around; import replays pairs verbatim and skips the placeholder.
//! The full reset is the administrative escape hatch: both backends are
//! cleared entirely.

use serde_json::Value;
use tracing::{info, warn};

use crate::blob::BlobStore;
use crate::kv::KvStore;

/// Stand-in for inline image data in an exported document.
pub const IMAGE_PLACEHOLDER: &str = "[IMAGE DATA EXCLUDED - TOO LARGE]";

/// Serialize all KVS keys to a single JSON object, substituting
/// [`IMAGE_PLACEHOLDER`] for any value that looks like inline image data.
#[must_use]
pub fn export_settings(kv: &KvStore) -> Value {
    let mut doc = serde_json::Map::new();
    for (key, value) in kv.snapshot() {
        let value = match &value {
            Value::String(s) if s.starts_with("data:image") => {
                Value::String(IMAGE_PLACEHOLDER.to_string())
            }
            _ => value,
        };
        doc.insert(key, value);
    }
    Value::Object(doc)
}

/// Replay an exported document back into the KVS. Placeholder values are
/// skipped; per-key failures are logged and do not abort the rest.
/// Returns the number of keys applied.
pub fn import_settings(kv: &KvStore, doc: &Value) -> usize {
    let Some(map) = doc.as_object() else {
        warn!("import document is not a JSON object, nothing applied");
        return 0;
    };
    let mut applied = 0;
    for (key, value) in map {
        if value.as_str() == Some(IMAGE_PLACEHOLDER) {
            continue;
        }
        match kv.write_direct(key, value) {
            Ok(()) => applied += 1,
            Err(e) => warn!(key = %key, error = %e, "skipping setting on import"),
        }
    }
    info!(applied, "settings imported");
    applied
}

/// Clear every KVS key and delete the entire blob container. Reads of any
/// previously-set key return the caller's default afterwards. A blob-side
/// failure is soft: the KVS is cleared regardless.
pub async fn reset_all(kv: &KvStore, blob: &dyn BlobStore) {
    kv.clear();
    if let Err(e) = blob.destroy().await {
        warn!(error = %e, "blob container could not be destroyed during reset");
    }
    info!("all data reset");
}
