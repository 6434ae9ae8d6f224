//! Observability - 直近の sync 結果を外から読む
//!
//! `SyncOrchestrator` は run ごとに `SyncMetrics` を `MetricsSlot` へ publish します。
//! 既定の slot はプロセス共通（`MetricsSlot::global()`）で、診断画面などはそこを読みます。

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ErrorCategory;

/// Counters of the last finished sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncMetrics {
    pub total: usize,
    pub success: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub categories: BTreeMap<ErrorCategory, usize>,
    pub chunks: usize,
    pub finished_at: Option<DateTime<Utc>>,
}

static GLOBAL: LazyLock<MetricsSlot> = LazyLock::new(MetricsSlot::new);

/// Holds the latest `SyncMetrics`. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MetricsSlot(Arc<Mutex<Option<SyncMetrics>>>);

impl MetricsSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide slot diagnostics read from.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    pub fn publish(&self, metrics: SyncMetrics) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(metrics);
    }

    pub fn latest(&self) -> Option<SyncMetrics> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn latest_json(&self) -> Option<serde_json::Value> {
        self.latest().and_then(|m| serde_json::to_value(m).ok())
    }
}
