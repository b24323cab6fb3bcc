// src/core/scorer.rs — Case-level scoring
//
// Recall side: matched requirements contribute quality × severity weight;
// whatever weight quality did not cover is a false negative. Precision side: every comment gets an independent noise verdict,
// matched or not. The two axes are never folded together here.

use crate::core::types::{
    BenchmarkCase, CaseScore, MatchedPair, NoiseAssessment, Requirement, SeverityWeights,
};
use crate::judge::{NoiseContext, SemanticJudge};

/// Compute the CaseScore for one matched case.
///
/// Judge failures during noise assessment degrade that comment to zero noise
/// (never zero precision) so a flaky judge cannot punish the agent.
pub async fn score_case(
    judge: &dyn SemanticJudge,
    case: &BenchmarkCase,
    requirements: &[Requirement],
    pairs: &[MatchedPair],
    weights: &SeverityWeights,
) -> CaseScore {
    let total_weight: f64 = requirements
        .iter()
        .map(|r| weights.weight(r.severity))
        .sum();

    let tp_weighted: f64 = pairs
        .iter()
        .map(|p| p.quality * weights.weight(requirements[p.requirement].severity))
        .sum();

    let fn_weighted = (total_weight - tp_weighted).max(0.0);

    let mut noise = Vec::with_capacity(case.comments.len());
    for (ci, comment) in case.comments.iter().enumerate() {
        let matched_requirement = pairs
            .iter()
            .find(|p| p.comment == ci)
            .map(|p| requirements[p.requirement].text.as_str());

        let context = NoiseContext {
            case_id: &case.id,
            diff: case.change_ref.as_deref(),
            matched_requirement,
        };

        let verdict = match judge.assess_noise(comment, &context).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    case = %case.id,
                    comment = ci,
                    "judge noise call failed, treating comment as clean: {e}"
                );
                crate::judge::NoiseVerdict {
                    score: 0.0,
                    category: None,
                }
            }
        };

        noise.push(NoiseAssessment {
            comment: ci,
            score: verdict.score.clamp(0.0, 1.0),
            category: verdict.category,
        });
    }

    CaseScore {
        case_id: case.id.clone(),
        tp_weighted,
        fn_weighted,
        comment_count: case.comments.len(),
        noise,
    }
}
