// src/corpus/github.rs — Agent comments from open GitHub pull requests
//
// Each benchmark case corresponds to one open PR whose head branch name
// contains the case id. Review comments on that PR are the agent's output.

use serde::Deserialize;

use async_trait::async_trait;

use super::CommentProvider;
use crate::core::types::{Comment, SourceLocation};
use crate::infra::errors::RevBenchError;

const GITHUB_API: &str = "https://api.github.com";
const PER_PAGE: u32 = 100;

pub struct GithubComments {
    client: reqwest::Client,
    token: String,
    repo: String,
    /// (head branch, PR number) for every open PR, fetched once at connect.
    open_prs: Vec<(String, u64)>,
}

#[derive(Deserialize)]
struct PullWire {
    number: u64,
    head: HeadWire,
}

#[derive(Deserialize)]
struct HeadWire {
    #[serde(rename = "ref")]
    branch: String,
}

#[derive(Deserialize)]
struct ReviewCommentWire {
    path: String,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    original_line: Option<u32>,
    body: String,
}

impl GithubComments {
    /// List all open PRs up front so per-case lookups are local.
    pub async fn connect(repo: impl Into<String>, token: String) -> Result<Self, RevBenchError> {
        let mut provider = Self {
            client: reqwest::Client::new(),
            token,
            repo: repo.into(),
            open_prs: Vec::new(),
        };

        let mut page = 1;
        loop {
            let url = format!(
                "{GITHUB_API}/repos/{}/pulls?state=open&per_page={PER_PAGE}&page={page}",
                provider.repo
            );
            let pulls: Vec<PullWire> = provider.get_json(&url, "pull request list").await?;
            let done = last_page(pulls.len());
            provider
                .open_prs
                .extend(pulls.into_iter().map(|p| (p.head.branch, p.number)));
            if done {
                break;
            }
            page += 1;
        }

        tracing::info!(
            "found {} open pull request(s) in {}",
            provider.open_prs.len(),
            provider.repo
        );
        Ok(provider)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        what: &str,
    ) -> Result<T, RevBenchError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", format!("revbench/{}", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| RevBenchError::Provider {
                what: what.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RevBenchError::Provider {
                what: what.to_string(),
                message: format!("HTTP {status}: {body}"),
            });
        }

        response.json().await.map_err(|e| RevBenchError::Provider {
            what: what.to_string(),
            message: format!("malformed response: {e}"),
        })
    }

    fn pr_for_case(&self, case_id: &str) -> Option<u64> {
        self.open_prs
            .iter()
            .find(|(branch, _)| branch.contains(case_id))
            .map(|(_, number)| *number)
    }
}

/// A short page is the last page.
fn last_page(batch_len: usize) -> bool {
    batch_len < PER_PAGE as usize
}

#[async_trait]
impl CommentProvider for GithubComments {
    async fn fetch_comments(&self, case_id: &str) -> Result<Vec<Comment>, RevBenchError> {
        let number = self.pr_for_case(case_id).ok_or_else(|| RevBenchError::Provider {
            what: "agent comments".into(),
            message: format!("no open PR branch contains case id '{case_id}'"),
        })?;

        let mut comments = Vec::new();
        let mut page = 1;
        loop {
            let url = format!(
                "{GITHUB_API}/repos/{}/pulls/{number}/comments?per_page={PER_PAGE}&page={page}",
                self.repo
            );
            let batch: Vec<ReviewCommentWire> = self.get_json(&url, "agent comments").await?;
            let done = last_page(batch.len());
            comments.extend(batch.into_iter().map(|c| Comment {
                location: SourceLocation::new(
                    c.path,
                    c.line.or(c.original_line).unwrap_or(0),
                ),
                body: c.body,
            }));
            if done {
                break;
            }
            page += 1;
        }
        Ok(comments)
    }

    /// Unified diff of the case's PR, fetched so the judge's noise context
    /// sees the change under review.
    async fn fetch_diff(&self, case_id: &str) -> Result<Option<String>, RevBenchError> {
        let number = self.pr_for_case(case_id).ok_or_else(|| RevBenchError::Provider {
            what: "pull request diff".into(),
            message: format!("no open PR branch contains case id '{case_id}'"),
        })?;
        let url = format!("{GITHUB_API}/repos/{}/pulls/{number}", self.repo);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github.v3.diff")
            .header("User-Agent", format!("revbench/{}", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| RevBenchError::Provider {
                what: "pull request diff".into(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(RevBenchError::Provider {
                what: "pull request diff".into(),
                message: format!("HTTP {}", response.status()),
            });
        }
        let diff = response.text().await.map_err(|e| RevBenchError::Provider {
            what: "pull request diff".into(),
            message: e.to_string(),
        })?;
        Ok(Some(diff))
    }
}
