use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{FileRecord, UserRecord};
use crate::error::JobError;
use crate::ports::RecordLookup;

/// On-disk shape: `{ "files": [...], "users": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordsSnapshot {
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

/// Hash-map backed record lookup.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecords {
    files: HashMap<String, FileRecord>,
    users: HashMap<String, UserRecord>,
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: FileRecord) -> Self {
        self.files.insert(file.id.clone(), file);
        self
    }

    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.users.insert(user.id.clone(), user);
        self
    }

    pub fn from_snapshot(snapshot: RecordsSnapshot) -> Self {
        let files = snapshot.files.into_iter().fold(Self::new(), Self::with_file);
        snapshot.users.into_iter().fold(files, Self::with_user)
    }

    /// Load a JSON snapshot from disk.
    pub async fn load(path: &Path) -> Result<Self, JobError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| JobError::Lookup(format!("read {}: {e}", path.display())))?;
        let snapshot: RecordsSnapshot = serde_json::from_slice(&raw)?;
        Ok(Self::from_snapshot(snapshot))
    }
}

#[async_trait]
impl RecordLookup for InMemoryRecords {
    async fn find_file(&self, file_id: &str, owner_id: &str) -> Result<Option<FileRecord>, JobError> {
        Ok(self
            .files
            .get(file_id)
            .filter(|f| f.owner_id == owner_id)
            .cloned())
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, JobError> {
        Ok(self.users.get(user_id).cloned())
    }
}
