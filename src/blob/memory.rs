use async_trait::async_trait;
use dashmap::DashMap;

use super::{BlobError, BlobStore};

/// In-memory [`BlobStore`] double.
///
/// Constructible as available or permanently unavailable; the latter stands
/// in for a host that cannot provide this class of storage, which the
/// router must treat as a soft failure.
pub struct MemoryBlobStore {
    data: DashMap<String, Vec<u8>>,
    available: bool,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            available: true,
        }
    }

    /// A store whose every operation fails with [`BlobError::Unavailable`].
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            data: DashMap::new(),
            available: false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn check_available(&self) -> Result<(), BlobError> {
        if self.available {
            Ok(())
        } else {
            Err(BlobError::Unavailable("memory store disabled".into()))
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn open_or_create(&self) -> Result<(), BlobError> {
        self.check_available()
    }

    async fn put(&self, key: &str, value: Option<&[u8]>) -> Result<(), BlobError> {
        self.check_available()?;
        match value {
            Some(bytes) => {
                self.data.insert(key.to_string(), bytes.to_vec());
            }
            None => {
                self.data.remove(key);
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        self.check_available()?;
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    async fn destroy(&self) -> Result<(), BlobError> {
        self.check_available()?;
        self.data.clear();
        Ok(())
    }
}
