// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Filesystem-backed blob container.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/
//!   VERSION          schema marker, "1"
//!   <partition>/     one payload file per key
//!     wallpaper
//! ```
//!
//! The container is created lazily by the first operation that needs it.
//! A schema marker from a newer version fails every operation with
//! [`BlobError::Unavailable`] rather than guessing at the layout.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use super::{BlobError, BlobStore, SCHEMA_VERSION};
use crate::config::StoreConfig;

pub struct FsBlobStore {
    root: PathBuf,
    partition: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, partition: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            partition: partition.into(),
        }
    }

    /// Container rooted at `root`, using the partition named in `config`.
    pub fn with_config(root: impl Into<PathBuf>, config: &StoreConfig) -> Self {
        Self::new(root, config.blob_partition.clone())
    }

    fn payload_path(&self, key: &str) -> Result<PathBuf, BlobError> {
        // Keys are flat names; anything path-like is refused.
        if key.is_empty()
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
        {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(&self.partition).join(key))
    }

    async fn ensure_open(&self) -> Result<(), BlobError> {
        let partition = self.root.join(&self.partition);
        fs::create_dir_all(&partition)
            .await
            .map_err(|e| BlobError::Unavailable(format!("{}: {e}", self.root.display())))?;

        let marker = self.root.join("VERSION");
        match fs::read_to_string(&marker).await {
            Ok(text) => {
                let found = text.trim().parse::<u32>().unwrap_or(0);
                if found != SCHEMA_VERSION {
                    warn!(found, expected = SCHEMA_VERSION, "unsupported blob schema");
                    return Err(BlobError::Unavailable(format!(
                        "unsupported schema version {found}"
                    )));
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::write(&marker, SCHEMA_VERSION.to_string()).await?;
                debug!(root = %self.root.display(), "created blob container");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn open_or_create(&self) -> Result<(), BlobError> {
        self.ensure_open().await
    }

    async fn put(&self, key: &str, value: Option<&[u8]>) -> Result<(), BlobError> {
        let path = self.payload_path(key)?;
        self.ensure_open().await?;
        match value {
            Some(bytes) => {
                fs::write(&path, bytes).await?;
                debug!(key = %key, bytes = bytes.len(), "blob stored");
            }
            None => match fs::remove_file(&path).await {
                Ok(()) => debug!(key = %key, "blob deleted"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let path = self.payload_path(key)?;
        self.ensure_open().await?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn destroy(&self) -> Result<(), BlobError> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                debug!(root = %self.root.display(), "blob container destroyed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for FsBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsBlobStore")
            .field("root", &self.root)
            .field("partition", &self.partition)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> FsBlobStore {
        FsBlobStore::new(dir.path().join("blobs"), "settings")
    }

    #[tokio::test]
    async fn open_is_idempotent_and_writes_schema_marker() {
        let dir = TempDir::new().unwrap();
        let blob = store(&dir);
        blob.open_or_create().await.unwrap();
        blob.open_or_create().await.unwrap();
        let marker = tokio::fs::read_to_string(dir.path().join("blobs/VERSION"))
            .await
            .unwrap();
        assert_eq!(marker.trim(), "1");
    }

    #[tokio::test]
    async fn with_config_uses_configured_partition() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            blob_partition: "media".to_string(),
            ..Default::default()
        };
        let blob = FsBlobStore::with_config(dir.path().join("blobs"), &config);
        blob.put("wallpaper", Some(b"x")).await.unwrap();
        assert!(dir.path().join("blobs/media/wallpaper").is_file());
    }

    #[tokio::test]
    async fn put_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let blob = store(&dir);
        blob.put("wallpaper", Some(b"image-bytes")).await.unwrap();
        let got = blob.get("wallpaper").await.unwrap();
        assert_eq!(got.as_deref(), Some(&b"image-bytes"[..]));
    }

    #[tokio::test]
    async fn get_missing_is_none_not_error() {
        let dir = TempDir::new().unwrap();
        let blob = store(&dir);
        assert!(blob.get("never-written").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_none_deletes() {
        let dir = TempDir::new().unwrap();
        let blob = store(&dir);
        blob.put("wallpaper", Some(b"x")).await.unwrap();
        blob.put("wallpaper", None).await.unwrap();
        assert!(blob.get("wallpaper").await.unwrap().is_none());
        // Deleting an absent key stays quiet.
        blob.put("wallpaper", None).await.unwrap();
    }

    #[tokio::test]
    async fn overwrite_is_last_writer_wins() {
        let dir = TempDir::new().unwrap();
        let blob = store(&dir);
        blob.put("k", Some(b"first")).await.unwrap();
        blob.put("k", Some(b"second")).await.unwrap();
        assert_eq!(blob.get("k").await.unwrap().as_deref(), Some(&b"second"[..]));
    }

    #[tokio::test]
    async fn reopen_sees_existing_payloads() {
        let dir = TempDir::new().unwrap();
        store(&dir).put("k", Some(b"persisted")).await.unwrap();
        let reopened = store(&dir);
        assert_eq!(
            reopened.get("k").await.unwrap().as_deref(),
            Some(&b"persisted"[..])
        );
    }

    #[tokio::test]
    async fn newer_schema_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("blobs");
        tokio::fs::create_dir_all(&root).await.unwrap();
        tokio::fs::write(root.join("VERSION"), "2").await.unwrap();

        let blob = store(&dir);
        let err = blob.get("k").await.unwrap_err();
        assert!(matches!(err, BlobError::Unavailable(_)));
    }

    #[tokio::test]
    async fn destroy_then_get_misses() {
        let dir = TempDir::new().unwrap();
        let blob = store(&dir);
        blob.put("k", Some(b"x")).await.unwrap();
        blob.destroy().await.unwrap();
        assert!(blob.get("k").await.unwrap().is_none());
        // Destroying twice is fine.
        blob.destroy().await.unwrap();
    }

    #[tokio::test]
    async fn path_like_keys_are_refused() {
        let dir = TempDir::new().unwrap();
        let blob = store(&dir);
        for bad in ["../escape", "a/b", "a\\b", ""] {
            assert!(matches!(
                blob.put(bad, Some(b"x")).await.unwrap_err(),
                BlobError::InvalidKey(_)
            ));
        }
    }
}
