use async_trait::async_trait;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::model::Snapshot;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid subject identifier: {0:?}")]
    InvalidSubject(String),
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("corrupt snapshot at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persistence of one [`Snapshot`] per subject. Writes replace the whole
/// document and must never leave a half-written one visible to `read`.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// `None` when nothing has been stored for `subject` yet.
    async fn read(&self, subject: &str) -> Result<Option<Snapshot>, StoreError>;

    async fn save(&self, subject: &str, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Like [`read`](Self::read), with a missing snapshot mapped to the empty one.
    async fn load(&self, subject: &str) -> Result<Snapshot, StoreError> {
        Ok(self.read(subject).await?.unwrap_or_default())
    }
}

/// Subject ids become file names, so only a conservative alphabet is allowed.
pub fn is_valid_subject(subject: &str) -> bool {
    !subject.is_empty()
        && subject
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// JSON documents at `{dir}/reviews_{subject}.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, subject: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_subject(subject) {
            return Err(StoreError::InvalidSubject(subject.to_string()));
        }
        Ok(self.dir.join(format!("reviews_{subject}.json")))
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn read(&self, subject: &str) -> Result<Option<Snapshot>, StoreError> {
        let path = self.path_for(subject)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { path, source })
    }

    async fn save(&self, subject: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        let path = self.path_for(subject)?;
        let body = serde_json::to_vec_pretty(snapshot)?;
        let target = path.clone();
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &body))
            .await
            .map_err(|e| StoreError::Write {
                path: path.clone(),
                source: io::Error::new(io::ErrorKind::Other, e),
            })?
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), reviews = snapshot.data.len(), "snapshot written");
        Ok(())
    }
}

/// Write to a temp file in the target's directory, fsync, then rename over
/// the target.
fn write_atomic(dir: &Path, target: &Path, body: &[u8]) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(body)?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}
