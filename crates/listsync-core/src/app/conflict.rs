//! Stale-token recovery for updates.
//!
//! An update answered with 412 re-reads the item's current token and retries
//! the update exactly once with it. A second 412 is terminal.

use crate::domain::{ListStoreError, WriteOp, WriteOutcome, WriteSuccess};

use super::dispatch::ListClient;

pub(crate) async fn resolve_stale_token(
    client: &ListClient,
    op: &WriteOp,
) -> Result<WriteSuccess, ListStoreError> {
    let item_id = op.item_id.ok_or_else(|| {
        ListStoreError::InvalidRequest(format!("update on list '{}' needs an item id", op.list))
    })?;
    tracing::info!(list = %op.list, item_id, "stale concurrency token, re-reading item");

    let read = WriteOp::read(op.list.clone(), item_id).select(["Id"]);
    let (current, read_attempts) = client.execute(&read).await?;
    let etag = match current {
        WriteOutcome::Success {
            etag: Some(etag), ..
        } => etag,
        WriteOutcome::Success { etag: None, .. } => {
            tracing::error!(list = %op.list, item_id, "re-read returned no concurrency token");
            return Err(ListStoreError::MissingConcurrencyToken {
                list: op.list.clone(),
                item_id,
            });
        }
        // 404 and friends surface as they are
        other => return other.into_result(&op.list, Some(item_id), read_attempts),
    };

    let retry = op.clone().with_etag(etag);
    let (outcome, attempts) = client.execute(&retry).await?;
    if outcome.is_stale_token() {
        tracing::warn!(list = %op.list, item_id, "item changed again, giving up");
    }
    outcome.into_result(&op.list, Some(item_id), attempts)
}
