// src/corpus/local.rs — File-based corpus
//
// Layout:
//   <root>/taxonomy.json            [{"case_id", "category", "difficulty"}, ...]
//   <root>/ground_truth/<id>.json   {"reviews": [{"file", "line", "comment"}, ...]}
//   <root>/comments/<id>.json       [{"file", "line", "body"}, ...]   (optional)

use serde::Deserialize;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{CaseProvider, CommentProvider};
use crate::core::types::{BenchmarkCase, Comment, GroundTruthReview, SourceLocation};
use crate::infra::errors::RevBenchError;

pub struct LocalCorpus {
    root: PathBuf,
}

#[derive(Deserialize)]
struct TaxonomyEntry {
    case_id: String,
    category: String,
    difficulty: String,
}

#[derive(Deserialize)]
struct GroundTruthFile {
    reviews: Vec<ReviewEntry>,
    #[serde(default)]
    diff: Option<String>,
}

#[derive(Deserialize)]
struct ReviewEntry {
    file: String,
    line: u32,
    comment: String,
}

#[derive(Deserialize)]
struct CommentEntry {
    file: String,
    line: u32,
    body: String,
}

impl LocalCorpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        path: &Path,
        what: &str,
    ) -> Result<T, RevBenchError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RevBenchError::Provider {
                what: what.to_string(),
                message: format!("{}: {e}", path.display()),
            })?;
        serde_json::from_str(&raw).map_err(|e| RevBenchError::Provider {
            what: what.to_string(),
            message: format!("{}: {e}", path.display()),
        })
    }
}

#[async_trait]
impl CaseProvider for LocalCorpus {
    async fn fetch_cases(&self) -> Result<Vec<BenchmarkCase>, RevBenchError> {
        let taxonomy: Vec<TaxonomyEntry> =
            Self::read_json(&self.root.join("taxonomy.json"), "taxonomy").await?;

        let mut cases = Vec::with_capacity(taxonomy.len());
        for entry in taxonomy {
            let gt_path = self
                .root
                .join("ground_truth")
                .join(format!("{}.json", entry.case_id));
            let ground_truth: GroundTruthFile =
                Self::read_json(&gt_path, "ground truth").await?;

            let reviews = ground_truth
                .reviews
                .into_iter()
                .enumerate()
                .map(|(idx, r)| GroundTruthReview {
                    id: format!("{}-r{idx}", entry.case_id),
                    location: SourceLocation::new(r.file, r.line),
                    body: r.comment,
                })
                .collect();

            let comments = self.fetch_comments(&entry.case_id).await?;

            cases.push(BenchmarkCase {
                id: entry.case_id,
                change_ref: ground_truth.diff,
                category: entry.category,
                difficulty: entry.difficulty,
                reviews,
                comments,
            });
        }

        tracing::info!("loaded {} case(s) from {}", cases.len(), self.root.display());
        Ok(cases)
    }
}

#[async_trait]
impl CommentProvider for LocalCorpus {
    /// Missing comment files mean the agent produced nothing for the case.
    async fn fetch_comments(&self, case_id: &str) -> Result<Vec<Comment>, RevBenchError> {
        let path = self.root.join("comments").join(format!("{case_id}.json"));
        if !path.exists() {
            return Ok(Vec::new());
        }
        let entries: Vec<CommentEntry> = Self::read_json(&path, "agent comments").await?;
        Ok(entries
            .into_iter()
            .map(|c| Comment {
                location: SourceLocation::new(c.file, c.line),
                body: c.body,
            })
            .collect())
    }
}
