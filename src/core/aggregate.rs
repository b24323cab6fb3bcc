// src/core/aggregate.rs — Run-wide accumulation
//
// One merge per completed case, whole-case atomic under the caller's lock.
// Accumulation is commutative so concurrent completion order cannot change
// the final totals.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::types::{CaseScore, NoiseCategory};

/// Summed contributions for one partition (global, a category, or a
/// difficulty level).
#[derive(Debug, Clone, Default, Serialize)]
pub struct Totals {
    pub tp_weighted: f64,
    pub fn_weighted: f64,
    pub comments: u64,
    pub noise_sum: f64,
    pub cases: u64,
}

impl Totals {
    pub fn absorb(&mut self, score: &CaseScore) {
        self.tp_weighted += score.tp_weighted;
        self.fn_weighted += score.fn_weighted;
        self.comments += score.comment_count as u64;
        self.noise_sum += score.noise_sum();
        self.cases += 1;
    }

    pub fn recall(&self) -> f64 {
        let denom = self.tp_weighted + self.fn_weighted;
        if denom > 0.0 {
            self.tp_weighted / denom
        } else {
            0.0
        }
    }

    pub fn precision(&self) -> f64 {
        if self.comments == 0 {
            1.0
        } else {
            1.0 - self.noise_sum / self.comments as f64
        }
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }

    pub fn mean_noise(&self) -> f64 {
        if self.comments == 0 {
            0.0
        } else {
            self.noise_sum / self.comments as f64
        }
    }
}

/// Process-wide accumulator. Explicitly owned and lock-guarded by the
/// Scheduler's caller, never implicit global state.
#[derive(Debug, Default, Serialize)]
pub struct AggregateState {
    pub global: Totals,
    pub by_category: BTreeMap<String, Totals>,
    pub by_difficulty: BTreeMap<String, Totals>,
    pub noise_histogram: BTreeMap<NoiseCategory, u64>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one scored case into all three partitions at once.
    pub fn merge(&mut self, category: &str, difficulty: &str, score: &CaseScore) {
        self.global.absorb(score);
        self.by_category
            .entry(category.to_string())
            .or_default()
            .absorb(score);
        self.by_difficulty
            .entry(difficulty.to_string())
            .or_default()
            .absorb(score);

        for assessment in &score.noise {
            if let Some(category) = assessment.category {
                *self.noise_histogram.entry(category).or_insert(0) += 1;
            }
        }
    }

    /// Ground truth could not be decomposed; shown in the report ledger.
    pub fn record_failure(&mut self, case_id: &str) {
        self.failed.push(case_id.to_string());
    }

    /// Inputs could not be fetched; counted separately from scored cases.
    pub fn record_skip(&mut self, case_id: &str) {
        self.skipped.push(case_id.to_string());
    }

    pub fn cases_scored(&self) -> u64 {
        self.global.cases
    }
}
