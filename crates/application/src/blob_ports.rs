//! Blob store port, used only by the attachment flow.

use async_trait::async_trait;
use tracklet_core::AppResult;
use tracklet_domain::AttachmentContentType;

/// Port for the external blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads bytes and returns a stable download URL.
    ///
    /// Callers must have passed the attachment content-type allow-list
    /// before reaching this port.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: AttachmentContentType,
    ) -> AppResult<String>;
}
