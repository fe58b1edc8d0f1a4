//! RecordLookup port - persisted entity retrieval by id.

use async_trait::async_trait;

use crate::domain::{FileRecord, UserRecord};
use crate::error::JobError;

/// Lookup of files and users.
///
/// `Ok(None)` means "not found"; `Err` is reserved for backend failures.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    /// Find a file by id that is owned by `owner_id`.
    async fn find_file(&self, file_id: &str, owner_id: &str) -> Result<Option<FileRecord>, JobError>;

    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, JobError>;
}
