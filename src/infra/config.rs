// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::types::{EvalConfig, SeverityWeights};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub judge: JudgeConfig,

    /// GitHub comment source (optional section in config.toml).
    #[serde(default)]
    pub github: Option<GithubConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Severity weight table applied to decomposed requirements.
    #[serde(default)]
    pub severity_weights: SeverityWeights,
    /// Max line distance for a comment to be location-compatible with a requirement.
    pub line_tolerance: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            severity_weights: SeverityWeights::default(),
            line_tolerance: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Concurrent case pipelines. Bounded to respect judge rate limits.
    pub concurrency: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { concurrency: 32 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// OpenAI-compatible endpoint, e.g. "https://api.openai.com/v1".
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4.1-mini".into(),
            api_key_env: "REVBENCH_JUDGE_API_KEY".into(),
            timeout_seconds: 60,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Repository in 'owner/repo' format whose open PRs hold agent comments.
    pub repo: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}

impl Config {
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read config {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Cannot parse config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// The single configuration object handed to the Scheduler.
    pub fn eval_config(&self) -> EvalConfig {
        EvalConfig {
            weights: self.scoring.severity_weights.clone(),
            line_tolerance: self.scoring.line_tolerance,
            concurrency: self.scheduler.concurrency.max(1),
            judge_timeout: Duration::from_secs(self.judge.timeout_seconds),
            judge_retries: self.judge.max_retries,
        }
    }
}
