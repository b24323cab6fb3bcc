// src/judge/llm.rs — LLM-backed semantic judge over an OpenAI-compatible API

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{parser, DecomposedItem, JudgeUsage, NoiseContext, NoiseVerdict, SemanticJudge};
use crate::core::types::{Comment, GroundTruthReview, NoiseCategory, Requirement};
use crate::infra::config::JudgeConfig;
use crate::infra::errors::RevBenchError;

const DECOMPOSE_SYSTEM: &str = "You split one code-review comment into atomic, independently \
actionable requirements. Each requirement covers exactly one concern. A comment about a single \
concern yields exactly one requirement. Severity is one of Critical, Major, Minor, Style. \
Answer with JSON only: {\"requirements\": [{\"text\": \"...\", \"severity\": \"...\"}]}";

const MATCH_SYSTEM: &str = "You judge whether an agent's review comment addresses the same \
underlying concern as a ground-truth requirement. Answer with JSON only: {\"quality\": q} where \
q is in [0,1]: 1.0 = fully and clearly addressed, 0.5 = partially or ambiguously addressed, \
0.0 = unrelated.";

const NOISE_SYSTEM: &str = "You rate how noisy a code-review comment is, independent of whether \
it found a real issue: verbosity, redundancy, off-topic content, speculation. Answer with JSON \
only: {\"noise\": n, \"category\": c} where n is in [0,1] (0 = clean, 1 = pure noise) and c is \
one of the listed categories, or null when the comment is substantially clean.";

/// Semantic judge backed by an OpenAI-compatible chat endpoint.
pub struct LlmJudge {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    usage: Arc<JudgeUsage>,
}

impl LlmJudge {
    pub fn new(config: &JudgeConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            usage: Arc::new(JudgeUsage::default()),
        }
    }

    /// Construct from config, reading the API key from the configured env var.
    pub fn from_config(config: &JudgeConfig) -> Result<Self, RevBenchError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            RevBenchError::Config(format!(
                "judge API key not found; set {}",
                config.api_key_env
            ))
        })?;
        Ok(Self::new(config, api_key))
    }

    pub fn usage(&self) -> Arc<JudgeUsage> {
        self.usage.clone()
    }

    async fn chat(&self, system: &str, user: String) -> Result<String, RevBenchError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "temperature": 0.1,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RevBenchError::JudgeTimeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    RevBenchError::Judge {
                        message: format!("request failed: {e}"),
                        retriable: e.is_connect(),
                    }
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(0);
            return Err(RevBenchError::RateLimited { retry_after_ms });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RevBenchError::Judge {
                message: format!("HTTP {status}: {text}"),
                retriable: status.is_server_error(),
            });
        }

        let parsed: ChatCompletionWire =
            response.json().await.map_err(|e| RevBenchError::Judge {
                message: format!("malformed completion response: {e}"),
                retriable: false,
            })?;

        if let Some(u) = &parsed.usage {
            self.usage.record(u.prompt_tokens, u.completion_tokens);
        }

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RevBenchError::Judge {
                message: "completion response had no choices".into(),
                retriable: false,
            })
    }
}

#[derive(Deserialize)]
struct ChatCompletionWire {
    choices: Vec<ChoiceWire>,
    usage: Option<CompletionUsageWire>,
}

#[derive(Deserialize)]
struct ChoiceWire {
    message: ChoiceMessageWire,
}

#[derive(Deserialize)]
struct ChoiceMessageWire {
    content: String,
}

#[derive(Deserialize)]
struct CompletionUsageWire {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn category_list() -> String {
    NoiseCategory::ALL
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl SemanticJudge for LlmJudge {
    async fn decompose(
        &self,
        review: &GroundTruthReview,
    ) -> Result<Vec<DecomposedItem>, RevBenchError> {
        let prompt = format!(
            "Ground-truth review at {}:{}\n\n{}",
            review.location.file, review.location.line, review.body
        );
        let reply = self.chat(DECOMPOSE_SYSTEM, prompt).await?;
        parser::parse_decomposition(&reply)
    }

    async fn match_quality(
        &self,
        requirement: &Requirement,
        comment: &Comment,
    ) -> Result<f64, RevBenchError> {
        let prompt = format!(
            "Requirement ({} severity, {}:{}):\n{}\n\nAgent comment ({}:{}):\n{}",
            requirement.severity,
            requirement.location.file,
            requirement.location.line,
            requirement.text,
            comment.location.file,
            comment.location.line,
            comment.body
        );
        let reply = self.chat(MATCH_SYSTEM, prompt).await?;
        parser::parse_match_quality(&reply)
    }

    async fn assess_noise(
        &self,
        comment: &Comment,
        context: &NoiseContext<'_>,
    ) -> Result<NoiseVerdict, RevBenchError> {
        let mut prompt = format!(
            "Categories: {}\n\nAgent comment ({}:{}):\n{}",
            category_list(),
            comment.location.file,
            comment.location.line,
            comment.body
        );
        if let Some(req) = context.matched_requirement {
            prompt.push_str(&format!(
                "\n\nThis comment was matched to the real issue: {req}"
            ));
        }
        if let Some(diff) = context.diff {
            prompt.push_str(&format!("\n\nCode change under review:\n{diff}"));
        }
        let reply = self.chat(NOISE_SYSTEM, prompt).await?;
        parser::parse_noise(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let config = JudgeConfig {
            base_url: "http://localhost:9999/v1/".into(),
            ..Default::default()
        };
        let judge = LlmJudge::new(&config, "key".into());
        assert_eq!(judge.base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn test_from_config_missing_key() {
        let config = JudgeConfig {
            api_key_env: "REVBENCH_TEST_KEY_THAT_IS_NOT_SET".into(),
            ..Default::default()
        };
        assert!(matches!(
            LlmJudge::from_config(&config),
            Err(RevBenchError::Config(_))
        ));
    }

    #[test]
    fn test_category_list_covers_closed_set() {
        let list = category_list();
        assert!(list.contains("hallucinated_warning"));
        assert!(list.contains("generic_advice"));
        assert_eq!(list.split(", ").count(), 8);
    }
}
