//! PendingStore port - ローカルの永続 pending キュー
//!
//! 順序付きの `PendingWriteEntry` リスト。get-all / append / remove-matching / clear
//! だけを提供します。

use async_trait::async_trait;
use std::collections::HashSet;

use crate::domain::{EntryId, PendingWriteEntry, StoreError};

/// PendingStore はローカルに保存された未送信の書き込み
///
/// # 設計原則
/// - 挿入順を保持する（チャンク分割と content id の対応に使う）
/// - エントリは不変。削除か保持のどちらかのみ
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// All entries, oldest first.
    async fn load_all(&self) -> Result<Vec<PendingWriteEntry>, StoreError>;

    async fn append(&self, entry: PendingWriteEntry) -> Result<(), StoreError>;

    /// Remove every entry whose id is in `ids`. Returns how many were removed.
    async fn remove_matching(&self, ids: &HashSet<EntryId>) -> Result<usize, StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}
