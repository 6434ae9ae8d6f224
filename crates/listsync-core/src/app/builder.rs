//! PipelineBuilder - パイプラインの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: 設定と必須 port を build() でまとめて検査

use std::sync::Arc;

use crate::config::{ConfigError, PipelineConfig};
use crate::domain::TransportError;
use crate::impls::ReqwestTransport;
use crate::observability::MetricsSlot;
use crate::ports::{Clock, IdGenerator, PendingStore, SystemClock, Transport, UlidGenerator};

use super::dispatch::{ListClient, ListEndpoint};
use super::recorder::PendingLog;
use super::sync::SyncOrchestrator;

/// PipelineBuilder は ListClient / SyncOrchestrator / PendingLog を組み立てる
///
/// # 使用例
/// ```ignore
/// let pipeline = PipelineBuilder::new(config)
///     .http_transport()?
///     .pending_store(Arc::new(JsonFilePendingStore::new("pending.json")))
///     .build()?;
/// pipeline.log.record(WriteAction::Update, "attendance", "A-17", "staff-1", "tablet", after).await?;
/// let report = pipeline.orchestrator.sync().await?;
/// ```
pub struct PipelineBuilder {
    config: PipelineConfig,
    transport: Option<Arc<dyn Transport>>,
    pending_store: Option<Arc<dyn PendingStore>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    metrics: Option<MetricsSlot>,
}

/// BuildError はパイプライン構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no transport configured")]
    MissingTransport,

    #[error("no pending store configured")]
    MissingPendingStore,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot create HTTP transport: {0}")]
    Transport(#[from] TransportError),
}

/// Wired pipeline.
pub struct Pipeline {
    pub client: ListClient,
    pub orchestrator: SyncOrchestrator,
    pub log: PendingLog,
    pub config: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            transport: None,
            pending_store: None,
            clock: None,
            ids: None,
            metrics: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use `ReqwestTransport` with the configured timeout.
    pub fn http_transport(self) -> Result<Self, BuildError> {
        let transport = ReqwestTransport::new(self.config.list_store.timeout())?;
        Ok(self.transport(Arc::new(transport)))
    }

    pub fn pending_store(mut self, store: Arc<dyn PendingStore>) -> Self {
        self.pending_store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Publish sync metrics here instead of the process-wide slot.
    pub fn metrics(mut self, metrics: MetricsSlot) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// # 検証
    /// - 設定が妥当か（`PipelineConfig::validate`）
    /// - transport と pending store が揃っているか
    pub fn build(self) -> Result<Pipeline, BuildError> {
        self.config.validate()?;
        let transport = self.transport.ok_or(BuildError::MissingTransport)?;
        let store = self.pending_store.ok_or(BuildError::MissingPendingStore)?;
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(SystemClock)),
        };
        let metrics = self.metrics.unwrap_or_else(MetricsSlot::global);

        let list_store = &self.config.list_store;
        let client = ListClient::new(
            ListEndpoint::new(list_store.base_url.clone(), list_store.bearer_token.clone()),
            transport,
            self.config.retry.to_policy(),
            ids.clone(),
        );
        let orchestrator = SyncOrchestrator::new(client.clone(), store.clone(), &self.config.sync)
            .with_metrics(metrics)
            .with_clock(clock.clone());
        let log = PendingLog::new(store, clock, ids);

        tracing::debug!(
            base_url = %list_store.base_url,
            collection = %self.config.sync.collection,
            chunk_size = self.config.sync.chunk_size,
            "pipeline built"
        );
        Ok(Pipeline {
            client,
            orchestrator,
            log,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WriteAction;
    use crate::impls::{InMemoryPendingStore, MemoryListStore};
    use serde_json::json;

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::default_v1();
        config.list_store.base_url = "https://tenant.example.com/sites/care".into();
        config
    }

    #[test]
    fn build_requires_transport_and_store() {
        let missing_transport = PipelineBuilder::new(config())
            .pending_store(Arc::new(InMemoryPendingStore::new()))
            .build();
        assert!(matches!(missing_transport, Err(BuildError::MissingTransport)));

        let missing_store = PipelineBuilder::new(config())
            .transport(Arc::new(MemoryListStore::new()))
            .build();
        assert!(matches!(missing_store, Err(BuildError::MissingPendingStore)));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let mut config = config();
        config.sync.chunk_size = 101;
        let built = PipelineBuilder::new(config)
            .transport(Arc::new(MemoryListStore::new()))
            .pending_store(Arc::new(InMemoryPendingStore::new()))
            .build();
        assert!(matches!(built, Err(BuildError::Config(ConfigError::Invalid(_)))));
    }

    #[tokio::test]
    async fn record_then_sync_end_to_end() {
        let remote = Arc::new(MemoryListStore::new());
        let metrics = MetricsSlot::new();
        let pipeline = PipelineBuilder::new(config())
            .transport(remote.clone())
            .pending_store(Arc::new(InMemoryPendingStore::new()))
            .metrics(metrics.clone())
            .build()
            .unwrap();

        for id in ["A-1", "A-2", "A-3"] {
            pipeline
                .log
                .record(
                    WriteAction::Update,
                    "attendance",
                    id,
                    "staff-1",
                    "tablet",
                    json!({"status": "present"}),
                )
                .await
                .unwrap();
        }

        let report = pipeline.orchestrator.sync().await.unwrap();

        assert_eq!((report.success, report.failed), (3, 0));
        assert_eq!(remote.len("AuditLog"), 3);
        assert_eq!(remote.items("AuditLog")[0]["Title"], "update:attendance:A-1");
        assert_eq!(metrics.latest().unwrap().success, 3);
    }
}
