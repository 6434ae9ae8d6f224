//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ReqwestTransport**: 本番用の HTTP transport
//! - **ScriptedTransport**: 応答を台本で与えるテスト用 transport
//! - **MemoryListStore**: list store のインメモリ fake（ETag, 409, `$batch` 対応）
//! - **InMemoryPendingStore**: 開発・テスト用の pending キュー
//! - **JsonFilePendingStore**: JSON ファイルに永続化する pending キュー

pub mod inmem_pending;
pub mod json_file_pending;
pub mod memory_list;
pub mod reqwest_transport;
pub mod scripted;

pub use self::inmem_pending::InMemoryPendingStore;
pub use self::json_file_pending::JsonFilePendingStore;
pub use self::memory_list::MemoryListStore;
pub use self::reqwest_transport::ReqwestTransport;
pub use self::scripted::ScriptedTransport;
