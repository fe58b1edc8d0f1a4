use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Artifact, FileRecord, Outcome, ThumbnailJobPayload};
use crate::error::JobError;
use crate::ports::{RecordLookup, Storage, ThumbnailGenerator};
use crate::typed::Handler;

/// Widths rendered for every file, in processing order.
pub const THUMBNAIL_WIDTHS: [u32; 3] = [100, 250, 500];

/// `<local_path>_<width>`.
pub fn thumbnail_path(local_path: &Path, width: u32) -> PathBuf {
    let mut name = OsString::from(local_path.as_os_str());
    name.push(format!("_{width}"));
    PathBuf::from(name)
}

/// Renders `THUMBNAIL_WIDTHS` variants of an uploaded file next to it.
///
/// Variants are written one after another. If a later width fails, earlier
/// variants stay on disk; a re-run overwrites them.
pub struct ThumbnailExecutor {
    records: Arc<dyn RecordLookup>,
    generator: Arc<dyn ThumbnailGenerator>,
    storage: Arc<dyn Storage>,
}

impl ThumbnailExecutor {
    pub fn new(
        records: Arc<dyn RecordLookup>,
        generator: Arc<dyn ThumbnailGenerator>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            records,
            generator,
            storage,
        }
    }

    /// Run the job; returns the written paths in order.
    pub async fn execute(&self, payload: &ThumbnailJobPayload) -> Result<Vec<PathBuf>, JobError> {
        let file_id = payload.file_id()?;
        let user_id = payload.user_id()?;
        let file = self.owned_file(file_id, user_id).await?;

        if !self.storage.exists(&file.local_path).await {
            return Err(JobError::NotFound("File"));
        }

        let mut written = Vec::with_capacity(THUMBNAIL_WIDTHS.len());
        for width in THUMBNAIL_WIDTHS {
            let bytes = self.generator.generate(&file.local_path, width).await?;
            let target = thumbnail_path(&file.local_path, width);
            self.storage
                .write(&target, &bytes)
                .await
                .map_err(|source| JobError::Io {
                    path: target.clone(),
                    source,
                })?;
            tracing::debug!(file_id, width, path = %target.display(), "thumbnail written");
            written.push(target);
        }
        Ok(written)
    }

    async fn owned_file(&self, file_id: &str, user_id: &str) -> Result<FileRecord, JobError> {
        self.records
            .find_file(file_id, user_id)
            .await?
            .filter(|f| f.id == file_id && f.owner_id == user_id)
            .ok_or(JobError::NotFound("File"))
    }
}

#[async_trait]
impl Handler<ThumbnailJobPayload> for ThumbnailExecutor {
    async fn handle(&self, task: ThumbnailJobPayload) -> Result<Outcome, JobError> {
        match self.execute(&task).await {
            Ok(paths) => {
                tracing::info!(file_id = ?task.file_id, count = paths.len(), "thumbnails generated");
                Ok(paths
                    .into_iter()
                    .fold(Outcome::success(), |o, p| o.with_artifact(Artifact::FilePath(p))))
            }
            Err(err) => {
                tracing::warn!(file_id = ?task.file_id, user_id = ?task.user_id, reason = %err, "thumbnail job failed");
                Ok(Outcome::failure(err.to_string()))
            }
        }
    }
}
