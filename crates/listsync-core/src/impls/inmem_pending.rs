//! InMemoryPendingStore - テスト・開発用の pending キュー

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{EntryId, PendingWriteEntry, StoreError};
use crate::ports::PendingStore;

/// Pending queue held in memory. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryPendingStore {
    entries: Mutex<Vec<PendingWriteEntry>>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<PendingWriteEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl PendingStore for InMemoryPendingStore {
    async fn load_all(&self) -> Result<Vec<PendingWriteEntry>, StoreError> {
        Ok(self.entries.lock().await.clone())
    }

    async fn append(&self, entry: PendingWriteEntry) -> Result<(), StoreError> {
        self.entries.lock().await.push(entry);
        Ok(())
    }

    async fn remove_matching(&self, ids: &HashSet<EntryId>) -> Result<usize, StoreError> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|e| !ids.contains(&e.id()));
        Ok(before - entries.len())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.entries.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WriteAction;
    use chrono::Utc;
    use serde_json::json;
    use ulid::Ulid;

    fn entry() -> PendingWriteEntry {
        PendingWriteEntry::new(
            EntryId::from(Ulid::new()),
            Utc::now(),
            WriteAction::Create,
            "user",
            "u1",
            "admin",
            "web",
            json!({}),
        )
    }

    #[tokio::test]
    async fn remove_matching_keeps_order_of_the_rest() {
        let store = InMemoryPendingStore::new();
        let entries: Vec<_> = (0..4).map(|_| entry()).collect();
        for e in &entries {
            store.append(e.clone()).await.unwrap();
        }

        let drop: HashSet<_> = [entries[0].id(), entries[2].id()].into_iter().collect();
        assert_eq!(store.remove_matching(&drop).await.unwrap(), 2);

        let left = store.load_all().await.unwrap();
        assert_eq!(left, vec![entries[1].clone(), entries[3].clone()]);

        store.clear().await.unwrap();
        assert!(store.is_empty().await);
    }
}
