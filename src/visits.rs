// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Visit/frequency ledger.
//!
//! One KVS entry (`visitHistory`) holds the whole site-id-to-aggregate
//! mapping. Recording a visit is a read-modify-write against the latest
//! in-memory mapping; the KVS entry lock makes concurrent in-process
//! visits additive rather than lost. Across tabs the mapping is
//! last-writer-wins at entry granularity: a visit recorded in another tab
//! can be overwritten. That is a documented limitation of the domain
//! (personal, low-contention data), not a bug.

use tracing::debug;

use crate::keys;
use crate::kv::KvStore;
use crate::model::{now_millis, VisitHistory, VisitHistoryEntry, Website};

/// Maintains the `visitHistory` mapping over the KVS.
#[derive(Clone)]
pub struct VisitLedger {
    kv: KvStore,
}

impl VisitLedger {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// Record one visit for `site_id`: `count += 1`, `lastVisited = now`,
    /// all other entries untouched. Creates the entry on first visit.
    pub fn record_visit(&self, site_id: &str) {
        let visited_at = now_millis();
        self.kv
            .update(keys::VISIT_HISTORY, VisitHistory::new(), |history| {
                let entry = history.entry(site_id.to_string()).or_insert(VisitHistoryEntry {
                    count: 0,
                    last_visited: visited_at,
                });
                entry.count += 1;
                entry.last_visited = visited_at;
            });
        debug!(site_id = %site_id, "visit recorded");
    }

    /// The current mapping. Absent or corrupt state reads as empty.
    #[must_use]
    pub fn history(&self) -> VisitHistory {
        self.kv.read(keys::VISIT_HISTORY, VisitHistory::new())
    }

    /// Entries are never aged out; only a full data reset clears them.
    pub fn clear(&self) {
        self.kv.remove(keys::VISIT_HISTORY);
    }
}

/// Merge the persisted site set with the ledger and rank by visit count.
///
/// Sites present in the ledger get their `visitCount`/`lastVisited`
/// refreshed from it; only sites with at least one visit qualify. Ties
/// keep the incoming order. Capped to `limit` (10 in reference behavior).
#[must_use]
pub fn frequently_visited(
    websites: &[Website],
    history: &VisitHistory,
    limit: usize,
) -> Vec<Website> {
    let mut ranked: Vec<Website> = websites
        .iter()
        .map(|site| {
            let mut site = site.clone();
            if let Some(entry) = history.get(&site.id) {
                site.visit_count = entry.count;
                site.last_visited = entry.last_visited;
            }
            site
        })
        .filter(|site| site.visit_count > 0)
        .collect();
    ranked.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
    ranked.truncate(limit);
    ranked
}
