//! Recording doubles for the ports, shared by executor tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{FileRecord, UserRecord};
use crate::error::JobError;
use crate::impls::{InMemoryRecords, LocalStorage};
use crate::ports::{MailEnvelope, Notifier, Storage, ThumbnailGenerator};

pub fn file_record(id: &str, owner: &str, path: &Path) -> FileRecord {
    FileRecord {
        id: id.to_string(),
        owner_id: owner.to_string(),
        local_path: path.to_path_buf(),
    }
}

pub fn user_record(id: &str, email: &str) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        email: email.to_string(),
    }
}

pub fn records_with(file: FileRecord) -> InMemoryRecords {
    InMemoryRecords::new().with_file(file)
}

/// Returns fixed bytes per width and records each requested width.
#[derive(Default)]
pub struct RecordingGenerator {
    calls: Mutex<Vec<u32>>,
    fail_at: Option<u32>,
}

impl RecordingGenerator {
    pub fn failing_at(width: u32) -> Self {
        Self {
            calls: Mutex::default(),
            fail_at: Some(width),
        }
    }

    pub fn bytes_for(width: u32) -> Vec<u8> {
        format!("thumb-{width}").into_bytes()
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ThumbnailGenerator for RecordingGenerator {
    async fn generate(&self, _path: &Path, width: u32) -> Result<Vec<u8>, JobError> {
        self.calls.lock().unwrap().push(width);
        if self.fail_at == Some(width) {
            return Err(JobError::Generation(format!("cannot render {width}")));
        }
        Ok(Self::bytes_for(width))
    }
}

/// Delegates to `LocalStorage` and records write targets in order.
#[derive(Default)]
pub struct RecordingStorage {
    inner: LocalStorage,
    writes: Mutex<Vec<PathBuf>>,
}

impl RecordingStorage {
    pub fn writes(&self) -> Vec<PathBuf> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path).await
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        self.writes.lock().unwrap().push(path.to_path_buf());
        self.inner.write(path, bytes).await
    }
}

/// Captures envelopes; optionally refuses every send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<MailEnvelope>>,
    refuse: bool,
}

impl RecordingNotifier {
    pub fn refusing() -> Self {
        Self {
            sent: Mutex::default(),
            refuse: true,
        }
    }

    pub fn sent(&self) -> Vec<MailEnvelope> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, envelope: &MailEnvelope) -> Result<(), JobError> {
        self.sent.lock().unwrap().push(envelope.clone());
        if self.refuse {
            return Err(JobError::Delivery("connection refused".to_string()));
        }
        Ok(())
    }
}
