//! PendingLog - 書き込みを pending キューに記録する入口

use std::sync::Arc;

use crate::domain::{PendingWriteEntry, StoreError, WriteAction};
use crate::ports::{Clock, IdGenerator, PendingStore};

/// Records writes into the pending queue for a later sync.
#[derive(Clone)]
pub struct PendingLog {
    store: Arc<dyn PendingStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl PendingLog {
    pub fn new(store: Arc<dyn PendingStore>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, clock, ids }
    }

    /// Stamp a new entry with a fresh id and the current time, then append it.
    pub async fn record(
        &self,
        action: WriteAction,
        entity_type: &str,
        entity_id: &str,
        actor: &str,
        channel: &str,
        after: serde_json::Value,
    ) -> Result<PendingWriteEntry, StoreError> {
        let entry = PendingWriteEntry::new(
            self.ids.generate_entry_id(),
            self.clock.now(),
            action,
            entity_type,
            entity_id,
            actor,
            channel,
            after,
        );
        self.store.append(entry.clone()).await?;
        tracing::debug!(entry_id = %entry.id(), %action, entity_type, entity_id, "write recorded");
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryPendingStore;
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[tokio::test]
    async fn records_in_order_with_clock_time() {
        let at = Utc.with_ymd_and_hms(2024, 4, 1, 9, 30, 0).unwrap();
        let store = Arc::new(InMemoryPendingStore::new());
        let log = PendingLog::new(
            store.clone(),
            Arc::new(FixedClock::new(at)),
            Arc::new(UlidGenerator::new(FixedClock::new(at))),
        );

        let first = log
            .record(WriteAction::Create, "user", "u1", "admin", "web", json!({"name": "a"}))
            .await
            .unwrap();
        let second = log
            .record(WriteAction::Delete, "user", "u2", "admin", "web", json!(null))
            .await
            .unwrap();

        assert_eq!(first.timestamp(), at);
        assert_ne!(first.id(), second.id());
        assert_eq!(store.load_all().await.unwrap(), vec![first, second]);
    }
}
