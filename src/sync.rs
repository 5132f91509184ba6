// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cross-tab reconciliation.
//!
//! Other tabs and windows share the same physical backend. Their mutations
//! arrive on the backend's change channel, which carries only foreign
//! writes and never the local ones. They are applied straight to the
//! [`KvStore`] mirror, bypassing the write/debounce path so a received
//! value is never persisted back out (no write loop across tabs).
//!
//! Malformed payloads are logged and ignored; state is left unchanged.
//! Notifications may be coalesced or delayed by the host, and no cross-tab
//! ordering is guaranteed beyond what the channel delivers.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::keys;
use crate::kv::KvStore;

/// The keys a start page reconciles across tabs.
#[must_use]
pub fn watched_defaults() -> Vec<String> {
    [
        keys::WEBSITES,
        keys::VISIT_HISTORY,
        keys::QUICK_NOTES,
        keys::WEATHER_DATA,
        keys::WEATHER_LOCATION,
        keys::WALLPAPER,
        keys::WALLPAPER_OPACITY,
        keys::CLOCK_FORMAT,
        keys::THEME_COLORS,
        keys::SECTION_VISIBILITY,
    ]
    .iter()
    .map(|k| (*k).to_string())
    .collect()
}

/// Spawn the reconciliation task for `watched` keys.
///
/// Returns `None` when the backend has no change channel (nothing to
/// reconcile). The task runs until the channel closes; drop or abort the
/// handle to stop it early.
pub fn spawn_listener(kv: KvStore, watched: Vec<String>) -> Option<JoinHandle<()>> {
    let mut rx = kv.backend().subscribe()?;
    Some(tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !watched.iter().any(|k| k == &event.key) {
                        continue;
                    }
                    match event.new_value {
                        Some(raw) => {
                            kv.apply_external(&event.key, &raw);
                        }
                        None => kv.apply_external_removal(&event.key),
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    // Coalescing by the host is expected; catch up from here.
                    warn!(missed, "change channel lagged");
                }
                Err(RecvError::Closed) => {
                    debug!("change channel closed, listener exiting");
                    break;
                }
            }
        }
    }))
}
