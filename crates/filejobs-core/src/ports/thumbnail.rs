//! ThumbnailGenerator port.

use std::path::Path;

use async_trait::async_trait;

use crate::error::JobError;

/// Renders a resized variant of the image stored at `path`.
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    async fn generate(&self, path: &Path, width: u32) -> Result<Vec<u8>, JobError>;
}
