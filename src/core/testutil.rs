// src/core/testutil.rs — Scripted judge stub for deterministic unit tests

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::types::{Comment, GroundTruthReview, Requirement};
use crate::infra::errors::RevBenchError;
use crate::judge::{DecomposedItem, NoiseContext, NoiseVerdict, SemanticJudge};

/// Returns pre-scripted verdicts keyed by review id, requirement text, and
/// comment body. Anything unscripted decomposes to nothing, matches at 0.0,
/// and carries no noise.
#[derive(Default)]
pub struct ScriptedJudge {
    pub decompositions: HashMap<String, Vec<DecomposedItem>>,
    pub qualities: HashMap<(String, String), f64>,
    pub noise: HashMap<String, NoiseVerdict>,
}

impl ScriptedJudge {
    pub fn with_decomposition(
        mut self,
        review_id: &str,
        items: Vec<DecomposedItem>,
    ) -> Self {
        self.decompositions.insert(review_id.to_string(), items);
        self
    }

    pub fn with_quality(mut self, requirement_text: &str, comment_body: &str, q: f64) -> Self {
        self.qualities
            .insert((requirement_text.to_string(), comment_body.to_string()), q);
        self
    }

    pub fn with_noise(mut self, comment_body: &str, verdict: NoiseVerdict) -> Self {
        self.noise.insert(comment_body.to_string(), verdict);
        self
    }
}

#[async_trait]
impl SemanticJudge for ScriptedJudge {
    async fn decompose(
        &self,
        review: &GroundTruthReview,
    ) -> Result<Vec<DecomposedItem>, RevBenchError> {
        Ok(self
            .decompositions
            .get(&review.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn match_quality(
        &self,
        requirement: &Requirement,
        comment: &Comment,
    ) -> Result<f64, RevBenchError> {
        Ok(self
            .qualities
            .get(&(requirement.text.clone(), comment.body.clone()))
            .copied()
            .unwrap_or(0.0))
    }

    async fn assess_noise(
        &self,
        comment: &Comment,
        _context: &NoiseContext<'_>,
    ) -> Result<NoiseVerdict, RevBenchError> {
        Ok(self
            .noise
            .get(&comment.body)
            .cloned()
            .unwrap_or(NoiseVerdict {
                score: 0.0,
                category: None,
            }))
    }
}
