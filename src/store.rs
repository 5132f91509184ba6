// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! High-level facade over the storage layer.
//!
//! [`PageStore`] owns the key-value store, the blob store, the tiered
//! router, and the visit ledger, and exposes the operations a start page
//! actually performs: site and note CRUD, preference accessors, the
//! weather cache, the wallpaper lifecycle, visit tracking, and
//! backup/restore. Construction opens the blob container and spawns the
//! cross-tab listener; a blob store that fails to open degrades the
//! wallpaper path, nothing else.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::KvBackend;
use crate::blob::BlobStore;
use crate::config::StoreConfig;
use crate::keys;
use crate::kv::KvStore;
use crate::model::{
    Note, SectionVisibility, ThemeColors, VisitHistory, WeatherSnapshot, Website,
};
use crate::router::{RouterError, StorageRouter, StoredTier};
use crate::settings;
use crate::sync;
use crate::visits::{frequently_visited, VisitLedger};

/// The assembled storage layer for one page instance.
pub struct PageStore {
    kv: KvStore,
    blob: Arc<dyn BlobStore>,
    router: StorageRouter,
    ledger: VisitLedger,
    top_sites_limit: usize,
    upload_limit: usize,
    listener: Option<JoinHandle<()>>,
}

impl PageStore {
    /// Assemble the store over the given backends and start the cross-tab
    /// listener. The blob container is opened eagerly; if it cannot be
    /// opened the store still works, with wallpaper payloads falling back
    /// to the KVS.
    pub async fn open(
        backend: Arc<dyn KvBackend>,
        blob: Arc<dyn BlobStore>,
        config: &StoreConfig,
    ) -> Self {
        if let Err(e) = blob.open_or_create().await {
            warn!(error = %e, "blob container unavailable, wallpaper uploads will fall back");
        }
        let kv = KvStore::new(backend, config);
        let router = StorageRouter::new(kv.clone(), blob.clone(), config.max_inline_bytes);
        let ledger = VisitLedger::new(kv.clone());
        let listener = sync::spawn_listener(kv.clone(), sync::watched_defaults());
        info!(cross_tab = listener.is_some(), "page store opened");
        Self {
            kv,
            blob,
            router,
            ledger,
            top_sites_limit: config.top_sites_limit,
            upload_limit: config.max_item_bytes,
            listener,
        }
    }

    // --- websites ---

    #[must_use]
    pub fn websites(&self) -> Vec<Website> {
        self.kv.read(keys::WEBSITES, Vec::new())
    }

    pub fn set_websites(&self, websites: &[Website]) {
        self.kv.write(keys::WEBSITES, websites);
    }

    pub fn add_website(&self, site: Website) {
        self.kv.update(keys::WEBSITES, Vec::<Website>::new(), |sites| {
            sites.push(site);
        });
    }

    /// Replace the site with the same id. No-op if the id is unknown.
    pub fn update_website(&self, site: Website) {
        self.kv.update(keys::WEBSITES, Vec::<Website>::new(), |sites| {
            if let Some(slot) = sites.iter_mut().find(|s| s.id == site.id) {
                *slot = site;
            }
        });
    }

    pub fn remove_website(&self, id: &str) {
        self.kv.update(keys::WEBSITES, Vec::<Website>::new(), |sites| {
            sites.retain(|s| s.id != id);
        });
    }

    // --- visit tracking ---

    pub fn record_visit(&self, site_id: &str) {
        self.ledger.record_visit(site_id);
    }

    #[must_use]
    pub fn visit_history(&self) -> VisitHistory {
        self.ledger.history()
    }

    /// Persisted sites ranked by visit count, capped to the configured
    /// limit.
    #[must_use]
    pub fn frequently_visited(&self) -> Vec<Website> {
        frequently_visited(&self.websites(), &self.ledger.history(), self.top_sites_limit)
    }

    // --- quick notes ---

    #[must_use]
    pub fn notes(&self) -> Vec<Note> {
        self.kv.read(keys::QUICK_NOTES, Vec::new())
    }

    pub fn add_note(&self, note: Note) {
        self.kv.update(keys::QUICK_NOTES, Vec::<Note>::new(), |notes| {
            notes.push(note);
        });
    }

    pub fn update_note(&self, note: Note) {
        self.kv.update(keys::QUICK_NOTES, Vec::<Note>::new(), |notes| {
            if let Some(slot) = notes.iter_mut().find(|n| n.id == note.id) {
                *slot = note;
            }
        });
    }

    pub fn remove_note(&self, id: &str) {
        self.kv.update(keys::QUICK_NOTES, Vec::<Note>::new(), |notes| {
            notes.retain(|n| n.id != id);
        });
    }

    // --- preferences ---

    #[must_use]
    pub fn clock_format(&self) -> String {
        self.kv.read(keys::CLOCK_FORMAT, "24h".to_string())
    }

    pub fn set_clock_format(&self, format: &str) {
        self.kv.write(keys::CLOCK_FORMAT, format);
    }

    #[must_use]
    pub fn wallpaper_opacity(&self) -> f64 {
        self.kv.read(keys::WALLPAPER_OPACITY, 1.0)
    }

    pub fn set_wallpaper_opacity(&self, opacity: f64) {
        self.kv.write(keys::WALLPAPER_OPACITY, &opacity.clamp(0.0, 1.0));
    }

    #[must_use]
    pub fn theme_colors(&self) -> ThemeColors {
        self.kv.read(keys::THEME_COLORS, ThemeColors::default())
    }

    pub fn set_theme_colors(&self, colors: &ThemeColors) {
        self.kv.write(keys::THEME_COLORS, colors);
    }

    #[must_use]
    pub fn section_visibility(&self) -> SectionVisibility {
        self.kv.read(keys::SECTION_VISIBILITY, SectionVisibility::default())
    }

    pub fn set_section_visibility(&self, visibility: &SectionVisibility) {
        self.kv.write(keys::SECTION_VISIBILITY, visibility);
    }

    // --- weather cache ---

    #[must_use]
    pub fn weather(&self) -> Option<WeatherSnapshot> {
        self.kv
            .read::<Option<WeatherSnapshot>>(keys::WEATHER_DATA, None)
    }

    pub fn set_weather(&self, snapshot: &WeatherSnapshot) {
        self.kv.write(keys::WEATHER_DATA, snapshot);
    }

    #[must_use]
    pub fn weather_location(&self) -> Option<String> {
        self.kv.read::<Option<String>>(keys::WEATHER_LOCATION, None)
    }

    pub fn set_weather_location(&self, location: &str) {
        self.kv.write(keys::WEATHER_LOCATION, location);
    }

    // --- wallpaper ---

    /// Point the wallpaper at a remote URL. Any uploaded payload under the
    /// key is dropped; the URL itself lives inline in the KVS.
    pub async fn set_wallpaper_url(&self, url: &str) {
        self.kv.write(keys::WALLPAPER, url);
        if let Err(e) = self.blob.put(keys::WALLPAPER, None).await {
            warn!(error = %e, "stale wallpaper payload not removed");
        }
    }

    /// Store an uploaded wallpaper payload (typically a data URL). Payloads
    /// over the upload ceiling are rejected before touching either store.
    pub async fn upload_wallpaper(&self, payload: &str) -> Result<StoredTier, RouterError> {
        if payload.len() > self.upload_limit {
            return Err(RouterError::TooLarge {
                size: payload.len(),
                limit: self.upload_limit,
            });
        }
        self.router.store(keys::WALLPAPER, payload).await
    }

    /// The wallpaper as the page renders it: a URL, an inline data URL, or
    /// `None` when unset or the stored payload is unreachable.
    pub async fn wallpaper(&self) -> Option<String> {
        self.router.load(keys::WALLPAPER).await
    }

    pub async fn clear_wallpaper(&self) {
        self.router.clear(keys::WALLPAPER).await;
    }

    // --- backup / restore / reset ---

    #[must_use]
    pub fn export_settings(&self) -> Value {
        settings::export_settings(&self.kv)
    }

    pub fn import_settings(&self, doc: &Value) -> usize {
        settings::import_settings(&self.kv, doc)
    }

    pub async fn reset_all(&self) {
        settings::reset_all(&self.kv, self.blob.as_ref()).await;
    }

    // --- plumbing ---

    /// Persist every pending debounced write now.
    pub fn flush_all(&self) -> bool {
        self.kv.flush_all()
    }

    /// The underlying key-value store, for callers composing their own
    /// access paths.
    #[must_use]
    pub fn kv(&self) -> &KvStore {
        &self.kv
    }
}

impl Drop for PageStore {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::blob::MemoryBlobStore;

    async fn open_store() -> PageStore {
        PageStore::open(
            Arc::new(MemoryBackend::new()),
            Arc::new(MemoryBlobStore::new()),
            &StoreConfig::default(),
        )
        .await
    }

    #[tokio::test]
    async fn website_crud_round_trips() {
        let store = open_store().await;
        let site = Website::new("Example", "https://example.com");
        let id = site.id.clone();

        store.add_website(site);
        assert_eq!(store.websites().len(), 1);

        let mut edited = store.websites().remove(0);
        edited.title = "Renamed".into();
        store.update_website(edited);
        assert_eq!(store.websites()[0].title, "Renamed");

        store.remove_website(&id);
        assert!(store.websites().is_empty());
    }

    #[tokio::test]
    async fn note_crud_round_trips() {
        let store = open_store().await;
        let note = Note::new("remember");
        let id = note.id.clone();
        store.add_note(note);

        let mut edited = store.notes().remove(0);
        edited.content = "changed".into();
        store.update_note(edited);
        assert_eq!(store.notes()[0].content, "changed");

        store.remove_note(&id);
        assert!(store.notes().is_empty());
    }

    #[tokio::test]
    async fn preferences_have_defaults() {
        let store = open_store().await;
        assert_eq!(store.clock_format(), "24h");
        assert_eq!(store.wallpaper_opacity(), 1.0);
        assert!(store.section_visibility().weather);
        assert_eq!(store.theme_colors().primary, "#3b82f6");
    }

    #[tokio::test]
    async fn opacity_is_clamped() {
        let store = open_store().await;
        store.set_wallpaper_opacity(3.0);
        assert_eq!(store.wallpaper_opacity(), 1.0);
        store.set_wallpaper_opacity(-1.0);
        assert_eq!(store.wallpaper_opacity(), 0.0);
    }

    #[tokio::test]
    async fn weather_cache_round_trips() {
        let store = open_store().await;
        assert!(store.weather().is_none());
        store.set_weather(&WeatherSnapshot {
            location: "Berlin".into(),
            temperature: 21.5,
            condition: "Clear".into(),
            icon: String::new(),
            humidity: 40.0,
            wind_speed: 3.0,
            last_updated: 1,
        });
        assert_eq!(store.weather().unwrap().location, "Berlin");
    }

    #[tokio::test]
    async fn wallpaper_url_and_upload_lifecycle() {
        let store = open_store().await;

        store.set_wallpaper_url("https://example.com/bg.jpg").await;
        assert_eq!(
            store.wallpaper().await.as_deref(),
            Some("https://example.com/bg.jpg")
        );

        let payload = "data:image/png;base64,AAAA";
        assert_eq!(
            store.upload_wallpaper(payload).await.unwrap(),
            StoredTier::Blob
        );
        assert_eq!(store.wallpaper().await.as_deref(), Some(payload));

        store.clear_wallpaper().await;
        assert!(store.wallpaper().await.is_none());
    }

    #[tokio::test]
    async fn oversized_upload_rejected_before_storing() {
        let store = open_store().await;
        let payload = "A".repeat(3 * 1024 * 1024);
        let err = store.upload_wallpaper(&payload).await.unwrap_err();
        assert!(matches!(err, RouterError::TooLarge { .. }));
        assert!(store.wallpaper().await.is_none());
    }

    #[tokio::test]
    async fn visits_feed_the_ranking() {
        let store = open_store().await;
        let site = Website::new("A", "https://a.example");
        let id = site.id.clone();
        store.add_website(site);
        store.add_website(Website::new("B", "https://b.example"));

        store.record_visit(&id);
        store.record_visit(&id);

        let top = store.frequently_visited();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, id);
        assert_eq!(top[0].visit_count, 2);
    }

    #[tokio::test]
    async fn reset_returns_everything_to_defaults() {
        let store = open_store().await;
        store.add_website(Website::new("A", "https://a.example"));
        store.set_clock_format("12h");
        store.upload_wallpaper("data:image/png;base64,AA").await.unwrap();

        store.reset_all().await;

        assert!(store.websites().is_empty());
        assert_eq!(store.clock_format(), "24h");
        assert!(store.wallpaper().await.is_none());
    }

    #[tokio::test]
    async fn export_import_carries_state_across_stores() {
        let source = open_store().await;
        source.set_clock_format("12h");
        source.add_website(Website::new("A", "https://a.example"));
        let doc = source.export_settings();

        let target = open_store().await;
        assert!(target.import_settings(&doc) >= 2);
        assert_eq!(target.clock_format(), "12h");
        assert_eq!(target.websites().len(), 1);
    }
}
