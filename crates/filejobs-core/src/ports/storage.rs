//! Storage port - the slice of the filesystem the executors need.

use std::io;
use std::path::Path;

use async_trait::async_trait;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    /// Create or overwrite `path` with `bytes`.
    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}
