//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて書き込みパイプラインを実装します。
//!
//! # 主要コンポーネント
//! - **ListClient**: 単発の書き込みと `$batch` 送信（dispatch）
//! - **RetryPolicy**: transient な失敗の再試行
//! - **conflict**: 412 を受けた update の再読込と 1 回だけの再試行
//! - **SyncOrchestrator**: pending キューの chunk 送信と後始末
//! - **PendingLog**: pending キューへの記録
//! - **PipelineBuilder**: ワイヤリング

pub mod builder;
mod conflict;
pub mod dispatch;
pub mod recorder;
pub mod retry;
pub mod sync;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, Pipeline, PipelineBuilder};
pub use self::dispatch::{ListClient, ListEndpoint};
pub use self::recorder::PendingLog;
pub use self::retry::{Attempted, RetryPolicy, Retryable};
pub use self::sync::{FailedEntry, SyncOrchestrator, SyncReport, SyncState, merge_resend};
