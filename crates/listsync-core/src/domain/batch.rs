//! Batch results: per-item dispositions and their aggregate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::status::{ErrorCategory, StatusClass};

/// How one item of a batch ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemDisposition {
    Success,
    /// 409 inside a batch: the record already exists remotely.
    Duplicate,
    Failed(ErrorCategory),
}

impl ItemDisposition {
    /// Batch-item interpretation of a status. Differs from single dispatch in
    /// one place: 409 is a duplicate, not a conflict.
    pub fn of_status(status: u16) -> Self {
        match StatusClass::of(status) {
            StatusClass::Success => ItemDisposition::Success,
            StatusClass::Conflict => ItemDisposition::Duplicate,
            _ => ItemDisposition::Failed(ErrorCategory::of_status(status)),
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, ItemDisposition::Failed(_))
    }
}

/// Decoded result of one change request inside a batch response.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItemResult {
    /// 1-based position of the request this answers.
    pub content_id: usize,
    pub status: u16,
    pub status_text: String,
    pub disposition: ItemDisposition,
}

/// One failed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemError {
    pub content_id: usize,
    /// `None` when no status was received for the item.
    pub status: Option<u16>,
    pub status_text: String,
    pub category: ErrorCategory,
}

/// Outcome of one batch submission.
///
/// Invariant: `success + failed == total`, duplicates counted inside `success`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub success: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub errors: Vec<ItemError>,
    pub categories: BTreeMap<ErrorCategory, usize>,
}

impl BatchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Aggregate decoded items for a batch of `total` requests.
    ///
    /// Items are looked up by content id; any id in `1..=total` without a
    /// decoded item is failed as [`ErrorCategory::Missing`].
    pub fn from_items(total: usize, items: &[BatchItemResult]) -> Self {
        let mut result = Self {
            total,
            ..Self::default()
        };
        for content_id in 1..=total {
            match items.iter().find(|item| item.content_id == content_id) {
                Some(item) => match item.disposition {
                    ItemDisposition::Success => result.success += 1,
                    ItemDisposition::Duplicate => {
                        result.success += 1;
                        result.duplicates += 1;
                    }
                    ItemDisposition::Failed(category) => result.push_error(ItemError {
                        content_id,
                        status: Some(item.status),
                        status_text: item.status_text.clone(),
                        category,
                    }),
                },
                None => result.push_error(ItemError {
                    content_id,
                    status: None,
                    status_text: "no response for item".to_string(),
                    category: ErrorCategory::Missing,
                }),
            }
        }
        result
    }

    /// Every item failed for the same reason (network, malformed response, ...).
    pub fn all_failed(
        total: usize,
        category: ErrorCategory,
        status: Option<u16>,
        status_text: &str,
    ) -> Self {
        let mut result = Self {
            total,
            ..Self::default()
        };
        for content_id in 1..=total {
            result.push_error(ItemError {
                content_id,
                status,
                status_text: status_text.to_string(),
                category,
            });
        }
        result
    }

    fn push_error(&mut self, error: ItemError) {
        self.failed += 1;
        *self.categories.entry(error.category).or_default() += 1;
        self.errors.push(error);
    }

    /// Content ids (1-based) of failed items, ascending.
    pub fn failed_content_ids(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.errors.iter().map(|e| e.content_id).collect();
        ids.sort_unstable();
        ids
    }

    /// Fold another result into this one.
    pub fn absorb(&mut self, other: &BatchResult) {
        self.total += other.total;
        self.success += other.success;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
        self.errors.extend(other.errors.iter().cloned());
        for (category, count) in &other.categories {
            *self.categories.entry(*category).or_default() += count;
        }
    }
}
