// src/report/mod.rs — Final report assembly and rendering
//
// Pure formatting over the accumulator: no raw counts are recomputed here.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::core::aggregate::{AggregateState, Totals};
use crate::core::types::NoiseCategory;
use crate::judge::UsageSummary;

/// Derived metrics for one partition.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsBlock {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub tp_weighted: f64,
    pub fn_weighted: f64,
    pub comments: u64,
    pub mean_noise: f64,
    pub cases: u64,
}

impl From<&Totals> for MetricsBlock {
    fn from(totals: &Totals) -> Self {
        Self {
            precision: totals.precision(),
            recall: totals.recall(),
            f1: totals.f1(),
            tp_weighted: totals.tp_weighted,
            fn_weighted: totals.fn_weighted,
            comments: totals.comments,
            mean_noise: totals.mean_noise(),
            cases: totals.cases,
        }
    }
}

/// The sole externally consumed artifact of a run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub generated_at: DateTime<Utc>,
    pub overall: MetricsBlock,
    pub by_category: BTreeMap<String, MetricsBlock>,
    pub by_difficulty: BTreeMap<String, MetricsBlock>,
    pub noise_histogram: BTreeMap<NoiseCategory, u64>,
    pub cases_scored: u64,
    pub cases_failed: Vec<String>,
    pub cases_skipped: Vec<String>,
    pub judge_usage: Option<UsageSummary>,
}

pub fn build_report(state: &AggregateState, judge_usage: Option<UsageSummary>) -> BenchmarkReport {
    BenchmarkReport {
        generated_at: Utc::now(),
        overall: MetricsBlock::from(&state.global),
        by_category: state
            .by_category
            .iter()
            .map(|(k, v)| (k.clone(), MetricsBlock::from(v)))
            .collect(),
        by_difficulty: state
            .by_difficulty
            .iter()
            .map(|(k, v)| (k.clone(), MetricsBlock::from(v)))
            .collect(),
        noise_histogram: state.noise_histogram.clone(),
        cases_scored: state.cases_scored(),
        cases_failed: state.failed.clone(),
        cases_skipped: state.skipped.clone(),
        judge_usage,
    }
}

/// Render the console report.
pub fn render(report: &BenchmarkReport) -> String {
    let mut out = String::new();
    let rule = "=".repeat(64);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "          AI Code Review Benchmark Results");
    let _ = writeln!(out, "{rule}");

    let _ = writeln!(out, "\n--- Overall Performance ---");
    let o = &report.overall;
    let _ = writeln!(out, "  True Positives (Weighted):   {:.2}", o.tp_weighted);
    let _ = writeln!(out, "  False Negatives (Missed):    {:.2}", o.fn_weighted);
    let _ = writeln!(out, "  Total Agent Comments:        {}", o.comments);
    let _ = writeln!(out, "  Average Noise per Comment:   {:.1}%", o.mean_noise * 100.0);
    let _ = writeln!(out, "  ---------------------------");
    let _ = writeln!(out, "  Recall:     {:.2}%", o.recall * 100.0);
    let _ = writeln!(out, "  Precision:  {:.2}%", o.precision * 100.0);
    let _ = writeln!(out, "  F1-Score:   {:.4}", o.f1);

    let total_cases =
        report.cases_scored + report.cases_failed.len() as u64 + report.cases_skipped.len() as u64;
    let _ = writeln!(
        out,
        "\n  Cases: {} scored, {} failed, {} skipped ({} total)",
        report.cases_scored,
        report.cases_failed.len(),
        report.cases_skipped.len(),
        total_cases
    );
    if !report.cases_failed.is_empty() {
        let _ = writeln!(out, "  Failed:  {}", report.cases_failed.join(", "));
    }
    if !report.cases_skipped.is_empty() {
        let _ = writeln!(out, "  Skipped: {}", report.cases_skipped.join(", "));
    }

    if !report.noise_histogram.is_empty() {
        let _ = writeln!(out, "\n--- Noise Breakdown by Type ---");
        let total: u64 = report.noise_histogram.values().sum();
        let mut sorted: Vec<(&NoiseCategory, &u64)> = report.noise_histogram.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (category, count) in sorted {
            let pct = *count as f64 / total as f64 * 100.0;
            let _ = writeln!(out, "  {:<28} {:>4} ({:>5.1}%)", category.to_string(), count, pct);
        }
    }

    render_partition(&mut out, "Performance by Category", "Category", &report.by_category);
    render_partition(
        &mut out,
        "Performance by Difficulty",
        "Difficulty",
        &report.by_difficulty,
    );

    if let Some(usage) = &report.judge_usage {
        let _ = writeln!(
            out,
            "\n--- Judge Usage ---\n  Prompt Tokens = {}, Completion Tokens = {}",
            usage.input_tokens, usage.output_tokens
        );
    }

    let _ = writeln!(out, "\n{rule}");
    out
}

fn render_partition(
    out: &mut String,
    title: &str,
    label: &str,
    blocks: &BTreeMap<String, MetricsBlock>,
) {
    if blocks.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n--- {title} ---");
    let _ = writeln!(
        out,
        "{:<20} | {:>9} | {:>9} | {:>8} | {:>7} | {:>8} | {:>9} | {:>7}",
        label, "Precision", "Recall", "F1", "TP", "Comments", "Avg Noise", "FN"
    );
    let _ = writeln!(
        out,
        "{} | {} | {} | {} | {} | {} | {} | {}",
        "-".repeat(20),
        "-".repeat(9),
        "-".repeat(9),
        "-".repeat(8),
        "-".repeat(7),
        "-".repeat(8),
        "-".repeat(9),
        "-".repeat(7)
    );
    for (name, m) in blocks {
        let _ = writeln!(
            out,
            "{:<20} | {:>8.1}% | {:>8.1}% | {:>8.4} | {:>7.2} | {:>8} | {:>8.1}% | {:>7.2}",
            name,
            m.precision * 100.0,
            m.recall * 100.0,
            m.f1,
            m.tp_weighted,
            m.comments,
            m.mean_noise * 100.0,
            m.fn_weighted
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CaseScore, NoiseAssessment};
    use pretty_assertions::assert_eq;

    fn sample_state() -> AggregateState {
        let mut state = AggregateState::new();
        state.merge(
            "null-safety",
            "easy",
            &CaseScore {
                case_id: "c1".into(),
                tp_weighted: 8.0,
                fn_weighted: 4.0,
                comment_count: 2,
                noise: vec![
                    NoiseAssessment {
                        comment: 0,
                        score: 0.0,
                        category: None,
                    },
                    NoiseAssessment {
                        comment: 1,
                        score: 1.0,
                        category: Some(NoiseCategory::Unrelated),
                    },
                ],
            },
        );
        state.record_failure("c9");
        state
    }

    #[test]
    fn test_build_report_mirrors_state() {
        let report = build_report(&sample_state(), None);
        assert_eq!(report.cases_scored, 1);
        assert_eq!(report.cases_failed, vec!["c9"]);
        assert!((report.overall.recall - 8.0 / 12.0).abs() < 1e-9);
        assert!((report.overall.precision - 0.5).abs() < 1e-9);
        assert_eq!(report.by_category.len(), 1);
        assert_eq!(report.by_difficulty.len(), 1);
        assert_eq!(
            report.noise_histogram.get(&NoiseCategory::Unrelated),
            Some(&1)
        );
    }

    #[test]
    fn test_render_contains_sections() {
        let report = build_report(
            &sample_state(),
            Some(UsageSummary {
                input_tokens: 1200,
                output_tokens: 300,
            }),
        );
        let text = render(&report);
        assert!(text.contains("Overall Performance"));
        assert!(text.contains("Noise Breakdown by Type"));
        assert!(text.contains("Performance by Category"));
        assert!(text.contains("Performance by Difficulty"));
        assert!(text.contains("1 scored, 1 failed, 0 skipped"));
        assert!(text.contains("unrelated"));
        assert!(text.contains("Prompt Tokens = 1200"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = build_report(&sample_state(), None);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cases_scored"], 1);
        assert!(json["noise_histogram"]["unrelated"].is_u64());
        assert!(json["by_category"]["null-safety"]["f1"].is_f64());
    }

    #[test]
    fn test_empty_state_renders() {
        let report = build_report(&AggregateState::new(), None);
        let text = render(&report);
        assert!(text.contains("0 scored, 0 failed, 0 skipped"));
        // Empty partitions render no tables
        assert!(!text.contains("Performance by Category"));
    }
}
