//! Errors - エラー型と分類
//!
//! - `ListStoreError`: リモート list store への書き込みの失敗（呼び出し側に返す）
//! - `TransportError`: HTTP 層の失敗（fetch が reject した状態）
//! - `StoreError`: ローカルの pending キューの I/O 失敗

use thiserror::Error;

use super::status::ErrorCategory;

/// Transport-level failure: no HTTP status was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Failure of a write against the remote list store.
#[derive(Debug, Error)]
pub enum ListStoreError {
    #[error("item {item_id:?} not found in list '{list}'")]
    NotFound { list: String, item_id: Option<u64> },

    #[error("conflict in list '{list}' (status {status})")]
    Conflict { list: String, status: u16 },

    #[error("precondition failed in list '{list}' (status {status})")]
    PreconditionFailed { list: String, status: u16 },

    #[error("no concurrency token returned for item {item_id} in list '{list}'")]
    MissingConcurrencyToken { list: String, item_id: u64 },

    #[error("transient failure (status {status}) after {attempts} attempt(s)")]
    Transient {
        status: u16,
        attempts: u32,
        body: Option<String>,
    },

    #[error("request rejected with status {status}: {message}")]
    Hard { status: u16, message: String },

    #[error("transport failure after {attempts} attempt(s): {source}")]
    Network {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("malformed batch response: {0}")]
    MalformedBatchResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ListStoreError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ListStoreError::NotFound { .. } => ErrorCategory::NotFound,
            ListStoreError::Conflict { .. } => ErrorCategory::Conflict,
            ListStoreError::PreconditionFailed { .. }
            | ListStoreError::MissingConcurrencyToken { .. } => ErrorCategory::Precondition,
            ListStoreError::Transient { .. } => ErrorCategory::Transient,
            ListStoreError::Hard { .. } | ListStoreError::InvalidRequest(_) => ErrorCategory::Hard,
            ListStoreError::Network { .. } => ErrorCategory::Network,
            ListStoreError::MalformedBatchResponse(_) => ErrorCategory::Malformed,
        }
    }

    /// HTTP status behind this error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ListStoreError::NotFound { .. } => Some(404),
            ListStoreError::Conflict { status, .. }
            | ListStoreError::PreconditionFailed { status, .. }
            | ListStoreError::Transient { status, .. }
            | ListStoreError::Hard { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure of the local pending-write queue.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("pending queue I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("pending queue is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn network_error_keeps_original_source() {
        let err = ListStoreError::Network {
            attempts: 3,
            source: TransportError::Connect("refused".into()),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.status(), None);
        let source = err.source().unwrap().to_string();
        assert!(source.contains("refused"));
    }

    #[test]
    fn statuses_are_exposed() {
        let err = ListStoreError::Transient {
            status: 503,
            attempts: 3,
            body: None,
        };
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("3 attempt"));
    }
}
