// src/judge/retry.rs — Retry with exponential backoff around a semantic judge
//
// Wraps any SemanticJudge with a per-call timeout and bounded retry on
// transient failures (rate limits, server errors, timeouts). Non-retriable
// errors pass through immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{DecomposedItem, NoiseContext, NoiseVerdict, SemanticJudge};
use crate::core::types::{Comment, EvalConfig, GroundTruthReview, Requirement};
use crate::infra::errors::RevBenchError;

const INITIAL_DELAY_MS: u64 = 1_000;
const BACKOFF_FACTOR: f64 = 2.0;
const MAX_DELAY_MS: u64 = 30_000;
const JITTER_FRACTION: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub call_timeout: Duration,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            call_timeout: Duration::from_secs(60),
            initial_delay: Duration::from_millis(INITIAL_DELAY_MS),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(MAX_DELAY_MS),
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

impl RetryConfig {
    pub fn from_eval_config(config: &EvalConfig) -> Self {
        Self {
            max_retries: config.judge_retries,
            call_timeout: config.judge_timeout,
            ..Default::default()
        }
    }
}

/// A judge wrapper that adds per-call timeout and retry with backoff.
pub struct RetryJudge {
    inner: Arc<dyn SemanticJudge>,
    config: RetryConfig,
}

impl RetryJudge {
    pub fn new(inner: Arc<dyn SemanticJudge>) -> Self {
        Self {
            inner,
            config: RetryConfig::default(),
        }
    }

    pub fn with_config(inner: Arc<dyn SemanticJudge>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    fn delay_for_attempt(&self, attempt: u32, rate_limit_delay: Option<Duration>) -> Duration {
        if let Some(rl_delay) = rate_limit_delay {
            return rl_delay + Duration::from_millis(100);
        }

        let base_ms = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);
        let jitter = deterministic_jitter(attempt, self.config.jitter_fraction);
        Duration::from_millis((capped_ms * jitter).max(50.0) as u64)
    }

    async fn call_with_retry<T, F, Fut>(&self, mut call: F) -> Result<T, RevBenchError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, RevBenchError>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            let outcome = match tokio::time::timeout(self.config.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(RevBenchError::JudgeTimeout {
                    timeout_ms: self.config.call_timeout.as_millis() as u64,
                }),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retriable() || attempt == self.config.max_retries {
                        return Err(e);
                    }

                    let rl_delay = rate_limit_delay(&e);
                    let delay = self.delay_for_attempt(attempt, rl_delay);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying judge call after error: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(RevBenchError::Judge {
            message: "all retries exhausted".into(),
            retriable: false,
        }))
    }
}

fn rate_limit_delay(error: &RevBenchError) -> Option<Duration> {
    match error {
        RevBenchError::RateLimited { retry_after_ms } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Deterministic jitter for a given attempt to keep retries reproducible in
/// tests. Returns a multiplier in [1 - fraction, 1 + fraction].
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * hash - 1.0)
}

#[async_trait]
impl SemanticJudge for RetryJudge {
    async fn decompose(
        &self,
        review: &GroundTruthReview,
    ) -> Result<Vec<DecomposedItem>, RevBenchError> {
        self.call_with_retry(|| self.inner.decompose(review)).await
    }

    async fn match_quality(
        &self,
        requirement: &Requirement,
        comment: &Comment,
    ) -> Result<f64, RevBenchError> {
        self.call_with_retry(|| self.inner.match_quality(requirement, comment))
            .await
    }

    async fn assess_noise(
        &self,
        comment: &Comment,
        context: &NoiseContext<'_>,
    ) -> Result<NoiseVerdict, RevBenchError> {
        self.call_with_retry(|| self.inner.assess_noise(comment, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SourceLocation;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with a retriable error a fixed number of times, then succeeds.
    struct FlakyJudge {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyJudge {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl SemanticJudge for FlakyJudge {
        async fn decompose(
            &self,
            _review: &GroundTruthReview,
        ) -> Result<Vec<DecomposedItem>, RevBenchError> {
            Err(RevBenchError::Judge {
                message: "not used".into(),
                retriable: false,
            })
        }

        async fn match_quality(
            &self,
            _requirement: &Requirement,
            _comment: &Comment,
        ) -> Result<f64, RevBenchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(RevBenchError::Judge {
                    message: "HTTP 503".into(),
                    retriable: true,
                })
            } else {
                Ok(0.9)
            }
        }

        async fn assess_noise(
            &self,
            _comment: &Comment,
            _context: &NoiseContext<'_>,
        ) -> Result<NoiseVerdict, RevBenchError> {
            Err(RevBenchError::Judge {
                message: "not used".into(),
                retriable: false,
            })
        }
    }

    fn sample_requirement() -> Requirement {
        Requirement {
            review_id: "r0".into(),
            text: "missing null check".into(),
            severity: crate::core::types::Severity::Major,
            location: SourceLocation::new("src/app.py", 10),
        }
    }

    fn sample_comment() -> Comment {
        Comment {
            location: SourceLocation::new("src/app.py", 11),
            body: "this may be None".into(),
        }
    }

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            call_timeout: Duration::from_secs(5),
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let judge = RetryJudge::with_config(Arc::new(FlakyJudge::new(2)), fast_config(3));
        let quality = judge
            .match_quality(&sample_requirement(), &sample_comment())
            .await
            .unwrap();
        assert_eq!(quality, 0.9);
    }

    #[tokio::test]
    async fn test_exhausts_retries() {
        let judge = RetryJudge::with_config(Arc::new(FlakyJudge::new(10)), fast_config(2));
        let result = judge
            .match_quality(&sample_requirement(), &sample_comment())
            .await;
        assert!(matches!(
            result,
            Err(RevBenchError::Judge { retriable: true, .. })
        ));
    }

    #[tokio::test]
    async fn test_non_retriable_passes_through_once() {
        struct AlwaysBadRequest(AtomicU32);

        #[async_trait]
        impl SemanticJudge for AlwaysBadRequest {
            async fn decompose(
                &self,
                _review: &GroundTruthReview,
            ) -> Result<Vec<DecomposedItem>, RevBenchError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(RevBenchError::Judge {
                    message: "HTTP 400".into(),
                    retriable: false,
                })
            }
            async fn match_quality(
                &self,
                _requirement: &Requirement,
                _comment: &Comment,
            ) -> Result<f64, RevBenchError> {
                unreachable!()
            }
            async fn assess_noise(
                &self,
                _comment: &Comment,
                _context: &NoiseContext<'_>,
            ) -> Result<NoiseVerdict, RevBenchError> {
                unreachable!()
            }
        }

        let inner = Arc::new(AlwaysBadRequest(AtomicU32::new(0)));
        let judge = RetryJudge::with_config(inner.clone(), fast_config(5));
        let review = GroundTruthReview {
            id: "r0".into(),
            location: SourceLocation::new("a", 1),
            body: "x".into(),
        };
        assert!(judge.decompose(&review).await.is_err());
        assert_eq!(inner.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_uses_rate_limit_hint() {
        let judge = RetryJudge::new(Arc::new(FlakyJudge::new(0)));
        let d = judge.delay_for_attempt(0, Some(Duration::from_millis(10_000)));
        assert_eq!(d.as_millis(), 10_100);
    }

    #[test]
    fn test_delay_exponential_and_capped() {
        let judge = RetryJudge::new(Arc::new(FlakyJudge::new(0)));
        let d0 = judge.delay_for_attempt(0, None);
        let d1 = judge.delay_for_attempt(1, None);
        assert!(d0.as_millis() >= 800 && d0.as_millis() <= 1200);
        assert!(d1.as_millis() >= 1600 && d1.as_millis() <= 2400);
        // Far beyond the cap
        let d10 = judge.delay_for_attempt(10, None);
        assert!(d10.as_millis() <= 36_000);
    }

    #[test]
    fn test_deterministic_jitter_range() {
        for attempt in 0..20 {
            let j = deterministic_jitter(attempt, 0.2);
            assert!((0.8..=1.2).contains(&j), "jitter {j} out of range");
        }
    }
}
