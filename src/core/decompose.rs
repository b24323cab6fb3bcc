// src/core/decompose.rs — Requirement decomposition
//
// One ground-truth review becomes one or more atomic, severity-tagged
// requirements. Splitting is the judge's job; this module builds the
// request, validates the response shape, and rejects decompositions that
// are empty or carry zero total weight.

use crate::core::types::{BenchmarkCase, GroundTruthReview, Requirement, SeverityWeights};
use crate::infra::errors::RevBenchError;
use crate::judge::SemanticJudge;

/// Decompose one review. Requirements inherit the review's location so the
/// Matcher's location filter applies uniformly.
pub async fn decompose_review(
    judge: &dyn SemanticJudge,
    review: &GroundTruthReview,
    weights: &SeverityWeights,
) -> Result<Vec<Requirement>, RevBenchError> {
    let items = judge
        .decompose(review)
        .await
        .map_err(|e| RevBenchError::Decomposition {
            review_id: review.id.clone(),
            reason: e.to_string(),
        })?;

    if items.is_empty() {
        return Err(RevBenchError::Decomposition {
            review_id: review.id.clone(),
            reason: "judge returned an empty requirement list".into(),
        });
    }

    let total_weight: f64 = items.iter().map(|i| weights.weight(i.severity)).sum();
    if total_weight <= 0.0 {
        return Err(RevBenchError::Decomposition {
            review_id: review.id.clone(),
            reason: format!("decomposition weight sums to {total_weight}"),
        });
    }

    Ok(items
        .into_iter()
        .map(|item| Requirement {
            review_id: review.id.clone(),
            text: item.text,
            severity: item.severity,
            location: review.location.clone(),
        })
        .collect())
}

/// Decompose every review of a case, preserving review order.
pub async fn decompose_case(
    judge: &dyn SemanticJudge,
    case: &BenchmarkCase,
    weights: &SeverityWeights,
) -> Result<Vec<Requirement>, RevBenchError> {
    let mut requirements = Vec::new();
    for review in &case.reviews {
        requirements.extend(decompose_review(judge, review, weights).await?);
    }
    tracing::debug!(
        case = %case.id,
        reviews = case.reviews.len(),
        requirements = requirements.len(),
        "decomposed ground truth"
    );
    Ok(requirements)
}
