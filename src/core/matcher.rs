// src/core/matcher.rs — Requirement/comment matching
//
// Candidate pairs must be location-compatible (same file, line distance
// within tolerance) AND semantically compatible (judge quality > 0). The
// final assignment is a partial bijection maximizing total quality; the
// strategy is pluggable so tests can swap the greedy approximation for an
// exact solver.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::core::types::{Comment, MatchedPair, Requirement, SeverityWeights};
use crate::infra::errors::RevBenchError;
use crate::judge::SemanticJudge;

/// A location-compatible pair with its judge quality score.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub requirement: usize,
    pub comment: usize,
    pub quality: f64,
}

pub fn location_compatible(req: &Requirement, comment: &Comment, tolerance: u32) -> bool {
    req.location.file == comment.location.file
        && req.location.line.abs_diff(comment.location.line) <= tolerance
}

/// Selects a partial bijection from the candidate set.
pub trait AssignmentStrategy: Send + Sync {
    fn assign(
        &self,
        candidates: &[Candidate],
        requirements: &[Requirement],
        weights: &SeverityWeights,
    ) -> Vec<MatchedPair>;
}

/// Highest-quality-first greedy assignment. Ties break by requirement
/// severity weight descending, then input order, for determinism.
pub struct Greedy;

impl AssignmentStrategy for Greedy {
    fn assign(
        &self,
        candidates: &[Candidate],
        requirements: &[Requirement],
        weights: &SeverityWeights,
    ) -> Vec<MatchedPair> {
        let mut ordered: Vec<&Candidate> = candidates.iter().collect();
        ordered.sort_by(|a, b| {
            b.quality
                .partial_cmp(&a.quality)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    let wa = weights.weight(requirements[a.requirement].severity);
                    let wb = weights.weight(requirements[b.requirement].severity);
                    wb.partial_cmp(&wa).unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.requirement.cmp(&b.requirement))
                .then_with(|| a.comment.cmp(&b.comment))
        });

        let mut used_requirements = HashSet::new();
        let mut used_comments = HashSet::new();
        let mut pairs = Vec::new();
        for c in ordered {
            if used_requirements.contains(&c.requirement) || used_comments.contains(&c.comment) {
                continue;
            }
            used_requirements.insert(c.requirement);
            used_comments.insert(c.comment);
            pairs.push(MatchedPair {
                requirement: c.requirement,
                comment: c.comment,
                quality: c.quality,
            });
        }
        pairs
    }
}

/// Exhaustive maximum-total-quality assignment. Exponential in the number
/// of requirements with candidates; meant for correctness tests and small
/// cases, not the hot path.
pub struct Optimal;

impl AssignmentStrategy for Optimal {
    fn assign(
        &self,
        candidates: &[Candidate],
        _requirements: &[Requirement],
        _weights: &SeverityWeights,
    ) -> Vec<MatchedPair> {
        let mut req_ids: Vec<usize> = candidates.iter().map(|c| c.requirement).collect();
        req_ids.sort_unstable();
        req_ids.dedup();

        fn search(
            req_ids: &[usize],
            candidates: &[Candidate],
            used_comments: &mut HashSet<usize>,
        ) -> (f64, Vec<MatchedPair>) {
            let Some((&req, rest)) = req_ids.split_first() else {
                return (0.0, Vec::new());
            };

            // Leave this requirement unmatched
            let (mut best_total, mut best_pairs) = search(rest, candidates, used_comments);

            for c in candidates.iter().filter(|c| c.requirement == req) {
                if used_comments.contains(&c.comment) {
                    continue;
                }
                used_comments.insert(c.comment);
                let (sub_total, mut sub_pairs) = search(rest, candidates, used_comments);
                used_comments.remove(&c.comment);

                let total = sub_total + c.quality;
                if total > best_total {
                    sub_pairs.push(MatchedPair {
                        requirement: c.requirement,
                        comment: c.comment,
                        quality: c.quality,
                    });
                    best_total = total;
                    best_pairs = sub_pairs;
                }
            }
            (best_total, best_pairs)
        }

        let (_, mut pairs) = search(&req_ids, candidates, &mut HashSet::new());
        pairs.sort_by_key(|p| p.requirement);
        pairs
    }
}

/// Score all location-compatible pairs through the judge and assign.
///
/// Judge failures (already retried by the judge wrapper) degrade the pair to
/// non-matching instead of failing the case. Zero-quality candidates are
/// dropped so they can never occupy a slot in the bijection.
pub async fn match_case(
    judge: &dyn SemanticJudge,
    requirements: &[Requirement],
    comments: &[Comment],
    tolerance: u32,
    weights: &SeverityWeights,
    strategy: &dyn AssignmentStrategy,
) -> Result<Vec<MatchedPair>, RevBenchError> {
    let mut candidates = Vec::new();
    for (ri, req) in requirements.iter().enumerate() {
        for (ci, comment) in comments.iter().enumerate() {
            if !location_compatible(req, comment, tolerance) {
                continue;
            }
            let quality = match judge.match_quality(req, comment).await {
                Ok(q) => q.clamp(0.0, 1.0),
                Err(e) => {
                    tracing::warn!(
                        requirement = ri,
                        comment = ci,
                        "judge match call failed, treating pair as non-matching: {e}"
                    );
                    0.0
                }
            };
            if quality > 0.0 {
                candidates.push(Candidate {
                    requirement: ri,
                    comment: ci,
                    quality,
                });
            }
        }
    }

    let pairs = strategy.assign(&candidates, requirements, weights);
    verify_partial_bijection(&pairs)?;
    Ok(pairs)
}

fn verify_partial_bijection(pairs: &[MatchedPair]) -> Result<(), RevBenchError> {
    let mut seen_requirements = HashSet::new();
    let mut seen_comments = HashSet::new();
    for p in pairs {
        if !seen_requirements.insert(p.requirement) {
            return Err(RevBenchError::InvariantViolation(format!(
                "requirement {} matched more than once",
                p.requirement
            )));
        }
        if !seen_comments.insert(p.comment) {
            return Err(RevBenchError::InvariantViolation(format!(
                "comment {} matched more than once",
                p.comment
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testutil::ScriptedJudge;
    use crate::core::types::{GroundTruthReview, Severity, SourceLocation};
    use crate::judge::{DecomposedItem, NoiseContext, NoiseVerdict};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    fn requirement(text: &str, severity: Severity, line: u32) -> Requirement {
        Requirement {
            review_id: "r".into(),
            text: text.into(),
            severity,
            location: SourceLocation::new("app.py", line),
        }
    }

    fn comment(body: &str, line: u32) -> Comment {
        Comment {
            location: SourceLocation::new("app.py", line),
            body: body.into(),
        }
    }

    #[test]
    fn test_location_filter_tolerance() {
        let req = requirement("x", Severity::Major, 10);
        assert!(location_compatible(&req, &comment("c", 12), 2));
        assert!(!location_compatible(&req, &comment("c", 13), 2));
        assert!(location_compatible(&req, &comment("c", 8), 2));

        let other_file = Comment {
            location: SourceLocation::new("other.py", 10),
            body: "c".into(),
        };
        assert!(!location_compatible(&req, &other_file, 2));
    }

    #[test]
    fn test_greedy_prefers_higher_quality() {
        let requirements = vec![
            requirement("a", Severity::Major, 1),
            requirement("b", Severity::Major, 1),
        ];
        let candidates = vec![
            Candidate {
                requirement: 0,
                comment: 0,
                quality: 0.4,
            },
            Candidate {
                requirement: 1,
                comment: 0,
                quality: 0.9,
            },
        ];
        let pairs = Greedy.assign(&candidates, &requirements, &SeverityWeights::default());
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].requirement, 1);
        assert_eq!(pairs[0].quality, 0.9);
    }

    #[test]
    fn test_greedy_tie_breaks_by_severity() {
        let requirements = vec![
            requirement("style nit", Severity::Style, 1),
            requirement("crash", Severity::Critical, 1),
        ];
        // Same quality for both; the critical requirement must win the comment.
        let candidates = vec![
            Candidate {
                requirement: 0,
                comment: 0,
                quality: 0.7,
            },
            Candidate {
                requirement: 1,
                comment: 0,
                quality: 0.7,
            },
        ];
        let pairs = Greedy.assign(&candidates, &requirements, &SeverityWeights::default());
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].requirement, 1);
    }

    #[test]
    fn test_greedy_is_partial_bijection() {
        let requirements = vec![
            requirement("a", Severity::Major, 1),
            requirement("b", Severity::Major, 1),
            requirement("c", Severity::Major, 1),
        ];
        let mut candidates = Vec::new();
        for r in 0..3 {
            for c in 0..3 {
                candidates.push(Candidate {
                    requirement: r,
                    comment: c,
                    quality: 0.1 + 0.1 * (r + c) as f64,
                });
            }
        }
        let pairs = Greedy.assign(&candidates, &requirements, &SeverityWeights::default());
        assert!(verify_partial_bijection(&pairs).is_ok());
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_optimal_beats_greedy_on_crossing_case() {
        // Greedy takes (r0,c0)=0.9 and strands r1 at 0.0; optimal takes
        // (r0,c1)=0.8 + (r1,c0)=0.7 = 1.5.
        let requirements = vec![
            requirement("a", Severity::Major, 1),
            requirement("b", Severity::Major, 1),
        ];
        let candidates = vec![
            Candidate {
                requirement: 0,
                comment: 0,
                quality: 0.9,
            },
            Candidate {
                requirement: 0,
                comment: 1,
                quality: 0.8,
            },
            Candidate {
                requirement: 1,
                comment: 0,
                quality: 0.7,
            },
        ];
        let weights = SeverityWeights::default();

        let greedy_total: f64 = Greedy
            .assign(&candidates, &requirements, &weights)
            .iter()
            .map(|p| p.quality)
            .sum();
        let optimal = Optimal.assign(&candidates, &requirements, &weights);
        let optimal_total: f64 = optimal.iter().map(|p| p.quality).sum();

        assert!((greedy_total - 0.9).abs() < 1e-9);
        assert!((optimal_total - 1.5).abs() < 1e-9);
        assert!(verify_partial_bijection(&optimal).is_ok());
    }

    #[tokio::test]
    async fn test_match_case_filters_by_location_then_scores() {
        let requirements = vec![requirement("missing null check", Severity::Critical, 10)];
        let comments = vec![
            comment("null check needed", 11),
            comment("unrelated distant comment", 90),
        ];
        // Judge would also match the distant comment, but location filters it.
        let judge = ScriptedJudge::default()
            .with_quality("missing null check", "null check needed", 0.8)
            .with_quality("missing null check", "unrelated distant comment", 1.0);

        let pairs = match_case(
            &judge,
            &requirements,
            &comments,
            2,
            &SeverityWeights::default(),
            &Greedy,
        )
        .await
        .unwrap();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].comment, 0);
        assert_eq!(pairs[0].quality, 0.8);
    }

    #[tokio::test]
    async fn test_match_case_drops_zero_quality_pairs() {
        let requirements = vec![requirement("real issue", Severity::Major, 5)];
        let comments = vec![comment("nearby but unrelated", 5)];
        let judge = ScriptedJudge::default(); // unscripted pairs score 0.0

        let pairs = match_case(
            &judge,
            &requirements,
            &comments,
            2,
            &SeverityWeights::default(),
            &Greedy,
        )
        .await
        .unwrap();
        assert!(pairs.is_empty());
    }

    /// Every quality call errors, as if the judge stayed down through its
    /// retry budget.
    struct DownJudge;

    #[async_trait]
    impl SemanticJudge for DownJudge {
        async fn decompose(
            &self,
            _review: &GroundTruthReview,
        ) -> Result<Vec<DecomposedItem>, RevBenchError> {
            unreachable!()
        }

        async fn match_quality(
            &self,
            _requirement: &Requirement,
            _comment: &Comment,
        ) -> Result<f64, RevBenchError> {
            Err(RevBenchError::Judge {
                message: "HTTP 503".into(),
                retriable: true,
            })
        }

        async fn assess_noise(
            &self,
            _comment: &Comment,
            _context: &NoiseContext<'_>,
        ) -> Result<NoiseVerdict, RevBenchError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_judge_failure_degrades_pair_to_non_match() {
        let requirements = vec![requirement("real issue", Severity::Critical, 10)];
        let comments = vec![comment("right next to it", 10)];

        let pairs = match_case(
            &DownJudge,
            &requirements,
            &comments,
            2,
            &SeverityWeights::default(),
            &Greedy,
        )
        .await
        .unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_verify_partial_bijection_detects_double_match() {
        let pairs = vec![
            MatchedPair {
                requirement: 0,
                comment: 0,
                quality: 1.0,
            },
            MatchedPair {
                requirement: 0,
                comment: 1,
                quality: 1.0,
            },
        ];
        assert!(matches!(
            verify_partial_bijection(&pairs),
            Err(RevBenchError::InvariantViolation(_))
        ));
    }
}
