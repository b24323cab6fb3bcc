// src/corpus/mod.rs — Benchmark data providers

pub mod github;
pub mod local;

use async_trait::async_trait;

use crate::core::types::{BenchmarkCase, Comment};
use crate::infra::errors::RevBenchError;

/// Supplies the benchmark cases: diff metadata, ground-truth reviews,
/// category, difficulty.
#[async_trait]
pub trait CaseProvider: Send + Sync {
    async fn fetch_cases(&self) -> Result<Vec<BenchmarkCase>, RevBenchError>;
}

/// Supplies the agent's review comments for one case. When present, the
/// Scheduler uses this instead of any comments bundled with the case.
#[async_trait]
pub trait CommentProvider: Send + Sync {
    async fn fetch_comments(&self, case_id: &str) -> Result<Vec<Comment>, RevBenchError>;

    /// Unified diff of the change under review, when the provider has one.
    /// Feeds the judge's noise context; `None` means score without it.
    async fn fetch_diff(&self, _case_id: &str) -> Result<Option<String>, RevBenchError> {
        Ok(None)
    }
}
