// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-key pending-write table for the debounced persist path.
//!
//! Every scheduled write is a snapshot of the serialized value plus a timer
//! task. Re-arming replaces the snapshot and aborts the prior timer
//! (last-scheduled-wins). Snapshots are what keep the cross-tab listener
//! honest: a pending local write always persists the value it was scheduled
//! with, never a value received from another tab in the meantime.

use dashmap::DashMap;
use tokio::task::JoinHandle;

struct Pending {
    serialized: String,
    timer: Option<JoinHandle<()>>,
}

/// Table of pending debounced writes, keyed by logical key.
pub(crate) struct PendingWrites {
    map: DashMap<String, Pending>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Record the snapshot for `key`, cancelling any previously armed timer.
    pub fn replace_snapshot(&self, key: &str, serialized: String) {
        let old = self.map.insert(
            key.to_string(),
            Pending {
                serialized,
                timer: None,
            },
        );
        if let Some(Pending {
            timer: Some(timer), ..
        }) = old
        {
            timer.abort();
        }
    }

    /// Attach the timer task armed for `key`'s current snapshot.
    ///
    /// If the snapshot is already gone (the timer raced ahead, or a flush
    /// took it), the handle is dropped without aborting so an in-flight
    /// persist can finish.
    pub fn attach_timer(&self, key: &str, timer: JoinHandle<()>) {
        match self.map.get_mut(key) {
            Some(mut pending) => pending.timer = Some(timer),
            None => drop(timer),
        }
    }

    /// Take the snapshot for `key` and cancel its timer. Used by flush,
    /// removal, and eviction.
    pub fn take(&self, key: &str) -> Option<String> {
        self.map.remove(key).map(|(_, pending)| {
            if let Some(timer) = pending.timer {
                timer.abort();
            }
            pending.serialized
        })
    }

    /// Take the snapshot for `key` without aborting the timer. Called by
    /// the timer task itself when it fires.
    pub fn take_fired(&self, key: &str) -> Option<String> {
        self.map.remove(key).map(|(_, pending)| pending.serialized)
    }

    /// Take every pending snapshot, cancelling all timers.
    pub fn take_all(&self) -> Vec<(String, String)> {
        let keys: Vec<String> = self.map.iter().map(|e| e.key().clone()).collect();
        keys.into_iter()
            .filter_map(|key| self.take(&key).map(|serialized| (key, serialized)))
            .collect()
    }

    /// Number of keys with a write still pending.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
