//! Persisted collected areas, one append-only row per (user, area).

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedAreaRow {
    pub user_id: String,
    pub area_name: String,
    pub created_at: DateTime<Utc>,
}

impl CollectedAreaRow {
    pub fn new(user_id: impl Into<String>, area_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            area_name: area_name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Where collected areas are kept.
///
/// `append` returns `false` and writes nothing when the pair already exists.
pub trait CollectionStore: Send + Sync {
    fn collected(&self, user_id: &str) -> impl Future<Output = StoreResult<HashSet<String>>> + Send;

    fn append(&self, user_id: &str, area_name: &str) -> impl Future<Output = StoreResult<bool>> + Send;
}

#[derive(Debug, Default)]
pub struct MemoryCollectionStore {
    rows: Mutex<Vec<CollectedAreaRow>>,
}

impl MemoryCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<CollectedAreaRow> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Io(std::io::Error::other("collection lock poisoned"))
}

impl CollectionStore for MemoryCollectionStore {
    async fn collected(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        let rows = self.rows.lock().map_err(|_| poisoned())?;
        Ok(rows
            .iter()
            .filter(|row| row.user_id == user_id)
            .map(|row| row.area_name.clone())
            .collect())
    }

    async fn append(&self, user_id: &str, area_name: &str) -> StoreResult<bool> {
        let mut rows = self.rows.lock().map_err(|_| poisoned())?;
        if rows.iter().any(|row| row.user_id == user_id && row.area_name == area_name) {
            return Ok(false);
        }
        rows.push(CollectedAreaRow::new(user_id, area_name));
        Ok(true)
    }
}

/// JSON-lines file, one [`CollectedAreaRow`] per line
#[derive(Debug)]
pub struct JsonlCollectionStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlCollectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every row in the file; unreadable lines are skipped
    pub async fn rows(&self) -> StoreResult<Vec<CollectedAreaRow>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str(line) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!(path = %self.path.display(), line = n + 1, error = %e, "skipping bad row");
                    None
                }
            })
            .collect())
    }
}

impl CollectionStore for JsonlCollectionStore {
    async fn collected(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        Ok(self
            .rows()
            .await?
            .into_iter()
            .filter(|row| row.user_id == user_id)
            .map(|row| row.area_name)
            .collect())
    }

    async fn append(&self, user_id: &str, area_name: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;

        if self.collected(user_id).await?.contains(area_name) {
            debug!(user_id, area_name, "area already collected");
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_vec(&CollectedAreaRow::new(user_id, area_name))?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(true)
    }
}
