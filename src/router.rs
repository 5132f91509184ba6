// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tiered write routing between the key-value store and the blob store.
//!
//! Large payloads go to the blob store first, leaving a sentinel reference
//! string in the KVS under the same key. When the blob store is
//! unavailable the payload falls back to a direct KVS write, but only if
//! it fits under the small-object ceiling; otherwise the operation fails
//! with a user-facing "too large" outcome and neither store is mutated.
//!
//! On the read side a sentinel resolves through the blob store; a dangling
//! sentinel (blob deleted, reference left behind) degrades to "no value".

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::blob::{BlobError, BlobStore};
use crate::kv::{KvError, KvStore};

/// Sentinel prefix marking a KVS value whose real payload lives in the
/// blob store. Kept verbatim for settings-export compatibility.
pub const SENTINEL_PREFIX: &str = "indexeddb:";

/// A KVS value at the entry level: either the payload itself or a
/// reference into the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    Direct(String),
    Redirect(String),
}

impl StoredValue {
    /// Classify a raw KVS string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(SENTINEL_PREFIX) {
            Some(blob_key) => Self::Redirect(blob_key.to_string()),
            None => Self::Direct(raw.to_string()),
        }
    }

    /// The sentinel string referencing `blob_key`.
    #[must_use]
    pub fn sentinel_for(blob_key: &str) -> String {
        format!("{SENTINEL_PREFIX}{blob_key}")
    }
}

/// Where a routed payload ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredTier {
    Blob,
    Kv,
}

#[derive(Error, Debug)]
pub enum RouterError {
    /// Blob store unavailable and the payload is over the inline ceiling.
    /// The short, actionable message callers surface to the user.
    #[error("payload is too large to store ({size} bytes, limit {limit})")]
    TooLarge { size: usize, limit: usize },
    #[error(transparent)]
    Storage(#[from] KvError),
}

/// Routes size-sensitive payloads across the two tiers.
pub struct StorageRouter {
    kv: KvStore,
    blob: Arc<dyn BlobStore>,
    /// Inline-fallback ceiling used when the blob store is unavailable.
    inline_limit: usize,
}

impl StorageRouter {
    pub fn new(kv: KvStore, blob: Arc<dyn BlobStore>, inline_limit: usize) -> Self {
        Self {
            kv,
            blob,
            inline_limit,
        }
    }

    /// Store `payload` under `key`: blob store first, KVS fallback.
    pub async fn store(&self, key: &str, payload: &str) -> Result<StoredTier, RouterError> {
        match self.blob.put(key, Some(payload.as_bytes())).await {
            Ok(()) => {
                // Payload accepted; the KVS only carries the reference.
                self.kv.write(key, &StoredValue::sentinel_for(key));
                Ok(StoredTier::Blob)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "blob store refused payload, trying direct write");
                if payload.len() > self.inline_limit {
                    return Err(RouterError::TooLarge {
                        size: payload.len(),
                        limit: self.inline_limit,
                    });
                }
                match self.kv.write_direct(key, &payload) {
                    Ok(()) => Ok(StoredTier::Kv),
                    Err(KvError::CapacityExceeded { size, limit, .. }) => {
                        Err(RouterError::TooLarge { size, limit })
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Resolve `key`, following a sentinel into the blob store. Returns
    /// `None` for absent values, dangling sentinels, and unavailable blob
    /// storage alike.
    pub async fn load(&self, key: &str) -> Option<String> {
        let raw = self.kv.read::<String>(key, String::new());
        if raw.is_empty() {
            return None;
        }
        match StoredValue::parse(&raw) {
            StoredValue::Direct(value) => Some(value),
            StoredValue::Redirect(blob_key) => match self.blob.get(&blob_key).await {
                Ok(Some(bytes)) => match String::from_utf8(bytes) {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        warn!(key = %key, error = %e, "blob payload is not valid UTF-8");
                        None
                    }
                },
                Ok(None) => {
                    debug!(key = %key, blob_key = %blob_key, "dangling sentinel, treating as no value");
                    None
                }
                Err(e) => {
                    debug!(key = %key, error = %e, "blob store unavailable on read");
                    None
                }
            },
        }
    }

    /// Clear `key` from both tiers. Blob-side failures are soft.
    pub async fn clear(&self, key: &str) {
        self.kv.write(key, &"");
        if let Err(e) = self.blob.put(key, None).await {
            match e {
                BlobError::Unavailable(_) => {}
                other => warn!(key = %key, error = %other, "blob delete failed"),
            }
        }
    }
}
