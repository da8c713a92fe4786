use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracklet_application::BlobStore;
use tracklet_core::{AppError, AppResult};
use tracklet_domain::AttachmentContentType;

/// In-memory blob store implementation.
///
/// Objects live in a map keyed by their path; the returned URL uses the
/// `memory://` scheme so tests can recognize it.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: AttachmentContentType,
}

impl InMemoryBlobStore {
    /// Creates an empty in-memory blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many objects have been stored.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Returns a stored object's bytes, `None` when absent.
    pub async fn bytes_at(&self, path: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(path)
            .map(|object| object.bytes.clone())
    }

    /// Returns a stored object's content type, `None` when absent.
    pub async fn content_type_at(&self, path: &str) -> Option<AttachmentContentType> {
        self.objects
            .read()
            .await
            .get(path)
            .map(|object| object.content_type)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: AttachmentContentType,
    ) -> AppResult<String> {
        if bytes.is_empty() {
            return Err(AppError::Validation("attachment is empty".to_owned()));
        }

        self.objects.write().await.insert(
            path.to_owned(),
            StoredObject {
                bytes,
                content_type,
            },
        );
        Ok(format!("memory://{path}"))
    }
}
