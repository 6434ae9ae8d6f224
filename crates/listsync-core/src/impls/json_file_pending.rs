//! JsonFilePendingStore - JSON ファイルに保存する pending キュー
//!
//! # 実装詳細
//! - ファイル全体が `PendingWriteEntry` の JSON 配列
//! - 書き込みは一時ファイル + rename（途中でクラッシュしても壊れない）
//! - 読み書きは内部の Mutex で直列化

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{EntryId, PendingWriteEntry, StoreError};
use crate::ports::PendingStore;

/// Pending queue persisted as one JSON file.
#[derive(Debug)]
pub struct JsonFilePendingStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFilePendingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Vec<PendingWriteEntry>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    async fn write(&self, entries: &[PendingWriteEntry]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl PendingStore for JsonFilePendingStore {
    async fn load_all(&self) -> Result<Vec<PendingWriteEntry>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn append(&self, entry: PendingWriteEntry) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        entries.push(entry);
        self.write(&entries).await
    }

    async fn remove_matching(&self, ids: &HashSet<EntryId>) -> Result<usize, StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        let before = entries.len();
        entries.retain(|e| !ids.contains(&e.id()));
        let removed = before - entries.len();
        if removed > 0 {
            self.write(&entries).await?;
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.write(&[]).await
    }
}
