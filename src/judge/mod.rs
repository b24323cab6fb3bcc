// src/judge/mod.rs — Semantic judge layer

pub mod llm;
pub mod parser;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::types::{Comment, GroundTruthReview, NoiseCategory, Requirement, Severity};
use crate::infra::errors::RevBenchError;

/// One atomic concern extracted by the judge from a ground-truth review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposedItem {
    pub text: String,
    pub severity: Severity,
}

/// Judge verdict on how noisy a single comment is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseVerdict {
    /// Noise in [0,1]: 0.0 = clean, 1.0 = pure noise.
    pub score: f64,
    pub category: Option<NoiseCategory>,
}

/// Context handed to the judge when assessing a comment's noise.
#[derive(Debug, Clone, Default)]
pub struct NoiseContext<'a> {
    pub case_id: &'a str,
    pub diff: Option<&'a str>,
    /// Text of the requirement this comment was matched to, if any.
    pub matched_requirement: Option<&'a str>,
}

/// The external semantic oracle. Three request shapes, all synchronous
/// request/response; implementations must be usable concurrently.
#[async_trait]
pub trait SemanticJudge: Send + Sync {
    /// Split one ground-truth review into atomic severity-tagged concerns.
    async fn decompose(
        &self,
        review: &GroundTruthReview,
    ) -> Result<Vec<DecomposedItem>, RevBenchError>;

    /// Continuous quality in [0,1] of a comment against a requirement:
    /// 1.0 = fully and clearly addressed, 0.0 = unrelated.
    async fn match_quality(
        &self,
        requirement: &Requirement,
        comment: &Comment,
    ) -> Result<f64, RevBenchError>;

    /// Noise score + category for one comment, independent of match quality.
    async fn assess_noise(
        &self,
        comment: &Comment,
        context: &NoiseContext<'_>,
    ) -> Result<NoiseVerdict, RevBenchError>;
}

/// Thread-safe token accounting across all judge calls in a run.
#[derive(Debug, Default)]
pub struct JudgeUsage {
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
}

impl JudgeUsage {
    pub fn record(&self, input: u64, output: u64) {
        self.input_tokens.fetch_add(input, Ordering::Relaxed);
        self.output_tokens.fetch_add(output, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UsageSummary {
        UsageSummary {
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl UsageSummary {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_accumulates() {
        let usage = JudgeUsage::default();
        usage.record(100, 40);
        usage.record(50, 10);
        let summary = usage.snapshot();
        assert_eq!(summary.input_tokens, 150);
        assert_eq!(summary.output_tokens, 50);
        assert_eq!(summary.total(), 200);
    }

    #[test]
    fn test_usage_default_is_zero() {
        assert_eq!(JudgeUsage::default().snapshot().total(), 0);
    }
}
