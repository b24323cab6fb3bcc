// src/core/scheduler.rs — Bounded-concurrency evaluation pipeline
//
// Fan-out over the case set with a semaphore bound (the judge is rate
// limited), fan-in into the shared accumulator. Cases are independent; each
// case's pipeline is sequential internally: Decompose → Match → Score →
// Aggregate. Per-case errors are contained; only an invariant violation
// aborts the run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use super::aggregate::AggregateState;
use super::decompose;
use super::matcher::{self, AssignmentStrategy, Greedy};
use super::scorer;
use super::types::{BenchmarkCase, CaseOutcome, EvalConfig, ProgressEvent};
use crate::corpus::{CaseProvider, CommentProvider};
use crate::infra::errors::RevBenchError;
use crate::judge::SemanticJudge;

type ProgressFn = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

pub struct Scheduler {
    cases: Arc<dyn CaseProvider>,
    comments: Option<Arc<dyn CommentProvider>>,
    judge: Arc<dyn SemanticJudge>,
    strategy: Arc<dyn AssignmentStrategy>,
    config: EvalConfig,
    state: Arc<Mutex<AggregateState>>,
    cancel: Option<watch::Receiver<bool>>,
    on_progress: Option<ProgressFn>,
}

impl Scheduler {
    /// The accumulator is passed in, not owned globally, so one process can
    /// host multiple independent runs.
    pub fn new(
        cases: Arc<dyn CaseProvider>,
        judge: Arc<dyn SemanticJudge>,
        config: EvalConfig,
        state: Arc<Mutex<AggregateState>>,
    ) -> Self {
        Self {
            cases,
            comments: None,
            judge,
            strategy: Arc::new(Greedy),
            config,
            state,
            cancel: None,
            on_progress: None,
        }
    }

    /// Fetch agent comments per case instead of using any bundled with it.
    pub fn with_comment_provider(mut self, provider: Arc<dyn CommentProvider>) -> Self {
        self.comments = Some(provider);
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn AssignmentStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Cooperative cancellation: a `true` on the channel halts dispatch of
    /// new cases while in-flight cases drain normally.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_progress(mut self, progress: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(progress));
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().map(|c| *c.borrow()).unwrap_or(false)
    }

    pub async fn run(&self) -> Result<(), RevBenchError> {
        let cases = self.cases.fetch_cases().await?;
        let total = cases.len();
        tracing::info!(
            cases = total,
            concurrency = self.config.concurrency,
            "starting evaluation"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let completed = Arc::new(AtomicUsize::new(0));
        let mut join_set: JoinSet<Result<(), RevBenchError>> = JoinSet::new();

        for case in cases {
            if self.cancelled() {
                tracing::info!("cancellation requested, halting dispatch");
                break;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| RevBenchError::Other(anyhow::anyhow!("semaphore closed: {e}")))?;

            // Cancellation may have arrived while waiting for the permit.
            if self.cancelled() {
                tracing::info!("cancellation requested, halting dispatch");
                break;
            }

            let judge = self.judge.clone();
            let comments = self.comments.clone();
            let strategy = self.strategy.clone();
            let config = self.config.clone();
            let state = self.state.clone();
            let progress = self.on_progress.clone();
            let completed = completed.clone();

            join_set.spawn(async move {
                let case_id = case.id.clone();
                let outcome = run_case(
                    judge.as_ref(),
                    comments.as_deref(),
                    strategy.as_ref(),
                    &config,
                    &state,
                    case,
                )
                .await?;
                drop(permit);

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = progress {
                    progress(ProgressEvent::CaseFinished {
                        case_id,
                        completed: done,
                        total,
                        outcome,
                    });
                }
                Ok(())
            });
        }

        while let Some(joined) = join_set.join_next().await {
            joined.map_err(|e| RevBenchError::Other(anyhow::anyhow!("case task panicked: {e}")))??;
        }

        let state = lock_state(&self.state)?;
        if let Some(progress) = &self.on_progress {
            progress(ProgressEvent::Complete {
                scored: state.cases_scored() as usize,
                failed: state.failed.len(),
                skipped: state.skipped.len(),
            });
        }
        tracing::info!(
            scored = state.cases_scored(),
            failed = state.failed.len(),
            skipped = state.skipped.len(),
            "evaluation finished"
        );
        Ok(())
    }
}

fn lock_state(state: &Mutex<AggregateState>) -> Result<MutexGuard<'_, AggregateState>, RevBenchError> {
    state
        .lock()
        .map_err(|_| RevBenchError::Other(anyhow::anyhow!("aggregate lock poisoned")))
}

/// One case's full pipeline. Everything except an invariant violation is
/// contained: fetch failures skip the case, decomposition failures fail it,
/// and both land in the ledger instead of aborting the run.
async fn run_case(
    judge: &dyn SemanticJudge,
    comments: Option<&dyn CommentProvider>,
    strategy: &dyn AssignmentStrategy,
    config: &EvalConfig,
    state: &Mutex<AggregateState>,
    mut case: BenchmarkCase,
) -> Result<CaseOutcome, RevBenchError> {
    if let Some(provider) = comments {
        match provider.fetch_comments(&case.id).await {
            Ok(fetched) => case.comments = fetched,
            Err(e) => {
                tracing::warn!(case = %case.id, "skipping case, comment fetch failed: {e}");
                lock_state(state)?.record_skip(&case.id);
                return Ok(CaseOutcome::Skipped);
            }
        }
        // The diff is judge context, not scoring input; losing it degrades
        // the noise verdicts but never the case.
        match provider.fetch_diff(&case.id).await {
            Ok(Some(diff)) => case.change_ref = Some(diff),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(case = %case.id, "diff fetch failed, scoring without change context: {e}");
            }
        }
    }

    let requirements = match decompose::decompose_case(judge, &case, &config.weights).await {
        Ok(reqs) => reqs,
        Err(e) => {
            tracing::warn!(case = %case.id, "case failed to score: {e}");
            lock_state(state)?.record_failure(&case.id);
            return Ok(CaseOutcome::Failed);
        }
    };

    let pairs = matcher::match_case(
        judge,
        &requirements,
        &case.comments,
        config.line_tolerance,
        &config.weights,
        strategy,
    )
    .await?;

    let score = scorer::score_case(judge, &case, &requirements, &pairs, &config.weights).await;
    let (recall, precision) = (score.recall(), score.precision());

    // Whole-case atomic merge: one lock acquisition per case, never per field.
    lock_state(state)?.merge(&case.category, &case.difficulty, &score);

    Ok(CaseOutcome::Scored { recall, precision })
}
