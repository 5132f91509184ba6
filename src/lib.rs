// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Start Page Store
//!
//! The client-side persistent state layer for a personal browser start
//! page: bookmarked sites, quick notes, preferences, a weather cache, a
//! wallpaper, and a visit ledger.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PageStore Facade                       │
//! │  • Site / note CRUD, preferences, weather cache            │
//! │  • Wallpaper lifecycle, visit tracking, backup/restore     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              KvStore (small structured state)               │
//! │  • In-memory mirror for synchronous reads/writes           │
//! │  • Per-key 300 ms debounce, last-scheduled-wins            │
//! │  • 2 MiB item ceiling, priority-ordered quota eviction     │
//! └─────────────────────────────────────────────────────────────┘
//!                │                               │
//!     (sentinel "indexeddb:<key>")     (change channel, foreign
//!                │                      writes only)
//!                ▼                               ▼
//! ┌───────────────────────────┐   ┌───────────────────────────┐
//! │   BlobStore (bulk data)   │   │   Cross-tab listener      │
//! │  • Uploaded wallpapers    │   │  • Applies foreign writes │
//! │  • Versioned container    │   │    to the mirror only;    │
//! │  • KVS fallback when      │   │    never persists them    │
//! │    unavailable            │   │    back (no write loop)   │
//! └───────────────────────────┘   └───────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use startpage_store::{MemoryBackend, MemoryBlobStore, PageStore, StoreConfig, Website};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let store = PageStore::open(
//!         Arc::new(MemoryBackend::new()),
//!         Arc::new(MemoryBlobStore::new()),
//!         &StoreConfig::default(),
//!     )
//!     .await;
//!
//!     let site = Website::new("Example", "https://example.com");
//!     let id = site.id.clone();
//!     store.add_website(site);
//!     store.record_visit(&id);
//!
//!     assert_eq!(store.frequently_visited()[0].id, id);
//!
//!     // Writes are debounced; flush for deterministic persistence.
//!     store.flush_all();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`store`]: The [`PageStore`] facade tying everything together
//! - [`kv`]: Debounced, size-bounded key-value store
//! - [`blob`]: Blob store trait and implementations
//! - [`router`]: Tiered routing between the KVS and the blob store
//! - [`sync`]: Cross-tab reconciliation
//! - [`visits`]: Visit ledger and frequently-visited ranking
//! - [`settings`]: Backup, restore, and full reset
//! - [`backend`]: Physical key-value backends
//! - [`model`]: Persisted value shapes
//! - [`keys`]: Well-known key names

pub mod backend;
pub mod blob;
pub mod config;
pub mod keys;
pub mod kv;
pub mod model;
pub mod router;
pub mod settings;
pub mod store;
pub mod sync;
pub mod visits;

pub use backend::{BackendError, ChangeEvent, KvBackend, MemoryBackend};
pub use blob::{BlobError, BlobStore, FsBlobStore, MemoryBlobStore};
pub use config::StoreConfig;
pub use keys::EVICTION_PRIORITY;
pub use kv::{KvError, KvStore};
pub use model::{
    Note, SectionVisibility, ThemeColors, VisitHistory, VisitHistoryEntry, WeatherSnapshot,
    Website,
};
pub use router::{RouterError, StorageRouter, StoredTier, StoredValue, SENTINEL_PREFIX};
pub use settings::{export_settings, import_settings, reset_all, IMAGE_PLACEHOLDER};
pub use store::PageStore;
pub use sync::{spawn_listener, watched_defaults};
pub use visits::{frequently_visited, VisitLedger};
