//! listsync-core
//!
//! Resilient write pipeline for a remote list store (OData-style REST lists
//! with ETags and `$batch`).
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, pending entry, ETag, outcome, batch result, errors）
//! - **ports**: 抽象化レイヤー（Transport, PendingStore, Clock, IdGenerator）
//! - **codec**: `$batch` の multipart エンコード / デコード、OData JSON
//! - **app**: ListClient, RetryPolicy, conflict 解決, SyncOrchestrator, PendingLog, builder
//! - **impls**: 実装（ReqwestTransport, MemoryListStore, JSON ファイルの pending キューなど）
//! - **config**: PipelineConfig
//! - **observability**: SyncMetrics と MetricsSlot
//!
//! ログは `tracing` で出力します。subscriber はアプリケーション側で設定してください。

pub mod app;
pub mod codec;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use crate::app::{ListClient, Pipeline, PipelineBuilder, SyncOrchestrator, SyncReport};
pub use crate::config::PipelineConfig;
