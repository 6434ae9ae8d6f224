//! SyncOrchestrator - pending キューを list store へ流し込む
//!
//! # フロー
//! 1. sync lock を取る（同一プロセス内の sync は直列）
//! 2. pending entry を全件読む（空ならネットワークに触れず終了）
//! 3. chunk_size ごとに `$batch` で送信し、結果を集計
//! 4. 送った entry のうち成功・重複分だけを取り除く（sync 中に記録された entry は残る）
//! 5. SyncMetrics を MetricsSlot に publish

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::domain::{
    BatchResult, EntryId, ErrorCategory, PendingWriteEntry, StoreError, WriteOp,
};
use crate::observability::{MetricsSlot, SyncMetrics};
use crate::ports::{Clock, PendingStore, SystemClock};

use super::dispatch::ListClient;

/// Phase of the orchestrator.
///
/// `Idle → Draining → (Success | Partial | Error) → Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Draining,
    /// Every entry landed (created or already present).
    Success,
    /// Some entries landed, the rest stay queued.
    Partial,
    /// Nothing landed, or the local queue could not be updated.
    Error,
}

/// One entry that stays queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub entry_id: EntryId,
    pub status: Option<u16>,
    pub status_text: String,
    pub category: ErrorCategory,
}

/// Summary of one sync run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub total: usize,
    /// Entries present remotely afterwards, duplicates included.
    pub success: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub errors: Vec<FailedEntry>,
    pub categories: BTreeMap<ErrorCategory, usize>,
    pub chunks: usize,
    pub status: SyncState,
}

impl SyncReport {
    fn settle(mut self) -> Self {
        self.status = if self.failed == 0 {
            SyncState::Success
        } else if self.success > 0 {
            SyncState::Partial
        } else {
            SyncState::Error
        };
        self
    }

    fn to_metrics(&self, clock: &dyn Clock) -> SyncMetrics {
        SyncMetrics {
            total: self.total,
            success: self.success,
            duplicates: self.duplicates,
            failed: self.failed,
            categories: self.categories.clone(),
            chunks: self.chunks,
            finished_at: Some(clock.now()),
        }
    }
}

/// Combine a previous report with the report of re-sending what it left queued.
///
/// Successes and duplicates add up, failures are those of the resend, and the
/// total stays the original one.
pub fn merge_resend(previous: &SyncReport, resend: &SyncReport) -> SyncReport {
    SyncReport {
        total: previous.total,
        success: previous.success + resend.success,
        duplicates: previous.duplicates + resend.duplicates,
        failed: resend.failed,
        errors: resend.errors.clone(),
        categories: resend.categories.clone(),
        chunks: previous.chunks + resend.chunks,
        status: SyncState::Idle,
    }
    .settle()
}

pub struct SyncOrchestrator {
    client: ListClient,
    store: Arc<dyn PendingStore>,
    collection: String,
    chunk_size: usize,
    metrics: MetricsSlot,
    clock: Arc<dyn Clock>,
    lock: tokio::sync::Mutex<()>,
    state: Mutex<SyncState>,
}

impl SyncOrchestrator {
    pub fn new(client: ListClient, store: Arc<dyn PendingStore>, config: &SyncConfig) -> Self {
        Self {
            client,
            store,
            collection: config.collection.clone(),
            chunk_size: config.chunk_size.max(1),
            metrics: MetricsSlot::global(),
            clock: Arc::new(SystemClock),
            lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(SyncState::Idle),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsSlot) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn metrics(&self) -> &MetricsSlot {
        &self.metrics
    }

    fn set_state(&self, state: SyncState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Drain the whole pending queue.
    ///
    /// Only local store failures are errors; remote failures are counted in
    /// the report and their entries stay queued.
    pub async fn sync(&self) -> Result<SyncReport, StoreError> {
        let _guard = self.lock.lock().await;
        let report = self.drain_queue(None).await?;
        self.metrics.publish(report.to_metrics(self.clock.as_ref()));
        tracing::info!(
            total = report.total,
            success = report.success,
            duplicates = report.duplicates,
            failed = report.failed,
            chunks = report.chunks,
            status = ?report.status,
            "sync finished"
        );
        Ok(report)
    }

    /// Re-drain exactly the entries `previous` left queued and merge the two
    /// reports. Entries recorded since then wait for the next `sync`.
    pub async fn resend_failed(&self, previous: &SyncReport) -> Result<SyncReport, StoreError> {
        let _guard = self.lock.lock().await;
        let retained: HashSet<EntryId> = previous.errors.iter().map(|e| e.entry_id).collect();
        let resend = self.drain_queue(Some(&retained)).await?;
        let merged = merge_resend(previous, &resend);
        self.metrics.publish(merged.to_metrics(self.clock.as_ref()));
        tracing::info!(
            total = merged.total,
            success = merged.success,
            recovered = resend.success,
            failed = merged.failed,
            "resend finished"
        );
        Ok(merged)
    }

    async fn drain_queue(&self, only: Option<&HashSet<EntryId>>) -> Result<SyncReport, StoreError> {
        let result = self.drain_inner(only).await;
        if let Err(error) = &result {
            tracing::error!(%error, "pending queue unavailable, sync aborted");
        }
        self.set_state(SyncState::Idle);
        result
    }

    /// Send the queued entries (restricted to `only` when given) and remove
    /// the ones that landed. Nothing else in the queue is touched.
    async fn drain_inner(&self, only: Option<&HashSet<EntryId>>) -> Result<SyncReport, StoreError> {
        let mut entries = self.store.load_all().await?;
        if let Some(only) = only {
            entries.retain(|e| only.contains(&e.id()));
        }
        if entries.is_empty() {
            tracing::debug!("pending queue is empty");
            return Ok(SyncReport::default().settle());
        }
        self.set_state(SyncState::Draining);

        let mut aggregate = BatchResult::empty();
        let mut errors = Vec::new();
        let mut chunks = 0;
        for (index, chunk) in entries.chunks(self.chunk_size).enumerate() {
            let result = self.submit_chunk(chunk).await;
            tracing::debug!(
                chunk = index + 1,
                size = chunk.len(),
                success = result.success,
                duplicates = result.duplicates,
                failed = result.failed,
                "chunk submitted"
            );
            // content id k is chunk[k - 1]
            errors.extend(result.errors.iter().filter_map(|e| {
                let entry = chunk.get(e.content_id.checked_sub(1)?)?;
                Some(FailedEntry {
                    entry_id: entry.id(),
                    status: e.status,
                    status_text: e.status_text.clone(),
                    category: e.category,
                })
            }));
            aggregate.absorb(&result);
            chunks += 1;
        }

        let failed: HashSet<EntryId> = errors.iter().map(|e| e.entry_id).collect();
        let landed: HashSet<EntryId> = entries
            .iter()
            .map(PendingWriteEntry::id)
            .filter(|id| !failed.contains(id))
            .collect();
        let removed = self.store.remove_matching(&landed).await?;
        if failed.is_empty() {
            tracing::debug!(removed, "every sent entry landed");
        } else {
            tracing::warn!(removed, kept = failed.len(), "some entries stay queued");
        }

        Ok(SyncReport {
            total: aggregate.total,
            success: aggregate.success,
            duplicates: aggregate.duplicates,
            failed: aggregate.failed,
            errors,
            categories: aggregate.categories,
            chunks,
            status: SyncState::Idle,
        }
        .settle())
    }

    async fn submit_chunk(&self, chunk: &[PendingWriteEntry]) -> BatchResult {
        let ops: Vec<WriteOp> = chunk
            .iter()
            .map(|entry| WriteOp::create(self.collection.clone(), entry.to_list_fields()))
            .collect();
        self.client.submit_batch(&ops).await
    }
}
