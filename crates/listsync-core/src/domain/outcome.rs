//! Outcome model: the tagged result of one dispatch attempt.

use super::errors::ListStoreError;
use super::etag::ETag;
use super::status::StatusClass;

/// Result of exactly one request against the list store.
///
/// The variant is fully determined by the response status
/// (see [`StatusClass::of`]).
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Success {
        status: u16,
        data: Option<serde_json::Value>,
        etag: Option<ETag>,
    },
    NotFound {
        status: u16,
    },
    Conflict {
        status: u16,
    },
    /// 412 (stale token) or 428 (token required).
    PreconditionFailed {
        status: u16,
    },
    TransientError {
        status: u16,
        body: Option<String>,
    },
    HardError {
        status: u16,
        message: String,
    },
}

impl WriteOutcome {
    /// Build the outcome for a received status.
    ///
    /// `data`/`etag` are only kept for 2xx; `message` only for hard errors.
    pub fn from_status(
        status: u16,
        data: Option<serde_json::Value>,
        etag: Option<ETag>,
        message: impl FnOnce() -> String,
        body: Option<String>,
    ) -> Self {
        match StatusClass::of(status) {
            StatusClass::Success => WriteOutcome::Success { status, data, etag },
            StatusClass::NotFound => WriteOutcome::NotFound { status },
            StatusClass::Conflict => WriteOutcome::Conflict { status },
            StatusClass::StaleToken | StatusClass::PreconditionRequired => {
                WriteOutcome::PreconditionFailed { status }
            }
            StatusClass::Transient => WriteOutcome::TransientError { status, body },
            StatusClass::Hard => WriteOutcome::HardError {
                status,
                message: message(),
            },
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            WriteOutcome::Success { status, .. }
            | WriteOutcome::NotFound { status }
            | WriteOutcome::Conflict { status }
            | WriteOutcome::PreconditionFailed { status }
            | WriteOutcome::TransientError { status, .. }
            | WriteOutcome::HardError { status, .. } => *status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WriteOutcome::Success { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, WriteOutcome::TransientError { .. })
    }

    /// True for the 412 that the conflict resolver handles.
    pub fn is_stale_token(&self) -> bool {
        matches!(self, WriteOutcome::PreconditionFailed { status: 412 })
    }

    /// Convert into the caller-facing result.
    pub fn into_result(
        self,
        list: &str,
        item_id: Option<u64>,
        attempts: u32,
    ) -> Result<WriteSuccess, ListStoreError> {
        match self {
            WriteOutcome::Success { status, data, etag } => Ok(WriteSuccess { status, data, etag }),
            WriteOutcome::NotFound { .. } => Err(ListStoreError::NotFound {
                list: list.to_string(),
                item_id,
            }),
            WriteOutcome::Conflict { status } => Err(ListStoreError::Conflict {
                list: list.to_string(),
                status,
            }),
            WriteOutcome::PreconditionFailed { status } => {
                Err(ListStoreError::PreconditionFailed {
                    list: list.to_string(),
                    status,
                })
            }
            WriteOutcome::TransientError { status, body } => Err(ListStoreError::Transient {
                status,
                attempts,
                body,
            }),
            WriteOutcome::HardError { status, message } => {
                Err(ListStoreError::Hard { status, message })
            }
        }
    }
}

/// Successful write (or read) as returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSuccess {
    pub status: u16,
    pub data: Option<serde_json::Value>,
    pub etag: Option<ETag>,
}
