//! Status-code classification shared by single dispatch and batch decoding.

use serde::{Deserialize, Serialize};

/// What a response status means for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Success,
    NotFound,
    Conflict,
    /// 412: stale token. Only the conflict resolver acts on it.
    StaleToken,
    /// 428: the store demanded a token and none was sent.
    PreconditionRequired,
    Transient,
    Hard,
}

impl StatusClass {
    pub fn of(status: u16) -> Self {
        match status {
            200..=299 => StatusClass::Success,
            404 => StatusClass::NotFound,
            409 => StatusClass::Conflict,
            412 => StatusClass::StaleToken,
            428 => StatusClass::PreconditionRequired,
            429 | 500..=599 => StatusClass::Transient,
            _ => StatusClass::Hard,
        }
    }

    pub fn is_retryable(self) -> bool {
        self == StatusClass::Transient
    }
}

/// Failure buckets reported in batch results and sync metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Transient,
    NotFound,
    Conflict,
    Precondition,
    Hard,
    Network,
    Malformed,
    /// The batch response said nothing about this item.
    Missing,
}

impl ErrorCategory {
    /// Category of a failed status. Never called for 2xx.
    pub fn of_status(status: u16) -> Self {
        match StatusClass::of(status) {
            StatusClass::Transient => ErrorCategory::Transient,
            StatusClass::NotFound => ErrorCategory::NotFound,
            StatusClass::Conflict => ErrorCategory::Conflict,
            StatusClass::StaleToken | StatusClass::PreconditionRequired => {
                ErrorCategory::Precondition
            }
            StatusClass::Success | StatusClass::Hard => ErrorCategory::Hard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(200, StatusClass::Success)]
    #[case(201, StatusClass::Success)]
    #[case(204, StatusClass::Success)]
    #[case(404, StatusClass::NotFound)]
    #[case(409, StatusClass::Conflict)]
    #[case(412, StatusClass::StaleToken)]
    #[case(428, StatusClass::PreconditionRequired)]
    #[case(429, StatusClass::Transient)]
    #[case(500, StatusClass::Transient)]
    #[case(503, StatusClass::Transient)]
    #[case(504, StatusClass::Transient)]
    #[case(400, StatusClass::Hard)]
    #[case(401, StatusClass::Hard)]
    #[case(403, StatusClass::Hard)]
    #[case(302, StatusClass::Hard)]
    fn classifies_status(#[case] status: u16, #[case] expected: StatusClass) {
        assert_eq!(StatusClass::of(status), expected);
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(StatusClass::of(429).is_retryable());
        assert!(StatusClass::of(502).is_retryable());
        for status in [409, 412, 428, 400, 404] {
            assert!(!StatusClass::of(status).is_retryable(), "status {status}");
        }
    }

    #[test]
    fn categories_follow_classification() {
        assert_eq!(ErrorCategory::of_status(503), ErrorCategory::Transient);
        assert_eq!(ErrorCategory::of_status(412), ErrorCategory::Precondition);
        assert_eq!(ErrorCategory::of_status(428), ErrorCategory::Precondition);
        assert_eq!(ErrorCategory::of_status(422), ErrorCategory::Hard);
    }
}
