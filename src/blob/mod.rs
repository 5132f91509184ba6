// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Blob store: the asynchronous, larger-capacity secondary tier.
//!
//! Payloads too big for the key-value store (wallpaper image data, mostly)
//! land here, keyed by the same name the KVS holds a sentinel reference
//! under. The container is a single namespace with one named partition,
//! schema version 1, opened lazily on first use.
//!
//! Every operation against an unavailable container fails with
//! [`BlobError::Unavailable`]. Callers treat that as a soft failure and
//! fall back to the KVS path or to "no value"; it is never fatal.

pub mod fs;
pub mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

use async_trait::async_trait;
use thiserror::Error;

/// Container schema version written on first open.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum BlobError {
    /// The host cannot provide this class of storage right now. Soft
    /// failure: callers fall back, they do not abort.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid blob key '{0}'")]
    InvalidKey(String),
    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Asynchronous keyed object store. Unconstrained by the KVS size ceiling;
/// upload-time policy (not the store) bounds payload size. Blob records are
/// never evicted automatically; quota pressure is absorbed on the KVS side
/// to protect small structured state.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Idempotently open the container, creating it with
    /// [`SCHEMA_VERSION`] on first use. `put`/`get` open lazily on their
    /// own; this exists for eager startup checks.
    async fn open_or_create(&self) -> Result<(), BlobError>;

    /// Last-writer-wins overwrite. `None` deletes the key's payload (the
    /// "clear wallpaper" path).
    async fn put(&self, key: &str, value: Option<&[u8]>) -> Result<(), BlobError>;

    /// `Ok(None)` when the key has never been written or was deleted;
    /// missing is a signal, not an error.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError>;

    /// Delete the entire container. Subsequent gets miss until the
    /// container is lazily recreated by the next write.
    async fn destroy(&self) -> Result<(), BlobError>;
}
