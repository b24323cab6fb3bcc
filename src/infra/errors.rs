// src/infra/errors.rs — Error types for revbench

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RevBenchError {
    // Judge errors (possibly retriable)
    #[error("Judge error: {message}")]
    Judge { message: String, retriable: bool },

    #[error("Judge call timed out after {timeout_ms}ms")]
    JudgeTimeout { timeout_ms: u64 },

    #[error("Rate limited by judge, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    // Case-level errors (contained, never abort the run)
    #[error("Decomposition of review '{review_id}' rejected: {reason}")]
    Decomposition { review_id: String, reason: String },

    #[error("Provider error fetching {what}: {message}")]
    Provider { what: String, message: String },

    // Internal assertion — a Matcher bug, always fatal
    #[error("Aggregation invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RevBenchError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            RevBenchError::Judge {
                retriable: true,
                ..
            } | RevBenchError::JudgeTimeout { .. }
                | RevBenchError::RateLimited { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_judge_error() {
        let err = RevBenchError::Judge {
            message: "HTTP 500".into(),
            retriable: true,
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn test_non_retriable_judge_error() {
        let err = RevBenchError::Judge {
            message: "HTTP 400".into(),
            retriable: false,
        };
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_timeout_is_retriable() {
        assert!(RevBenchError::JudgeTimeout { timeout_ms: 5000 }.is_retriable());
    }

    #[test]
    fn test_rate_limited_is_retriable() {
        assert!(RevBenchError::RateLimited {
            retry_after_ms: 1000
        }
        .is_retriable());
    }

    #[test]
    fn test_decomposition_not_retriable() {
        let err = RevBenchError::Decomposition {
            review_id: "case-1-r0".into(),
            reason: "empty requirement list".into(),
        };
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_invariant_violation_not_retriable() {
        assert!(!RevBenchError::InvariantViolation("double match".into()).is_retriable());
    }
}
