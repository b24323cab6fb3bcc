// src/judge/parser.rs — Parse judge replies into typed verdicts
//
// Judges are prompted to answer with a single JSON object, but real model
// output often wraps it in prose or a fenced code block. Extraction is
// tolerant: take the fenced block if present, otherwise the outermost braces.

use serde::Deserialize;

use super::{DecomposedItem, NoiseVerdict};
use crate::core::types::{NoiseCategory, Severity};
use crate::infra::errors::RevBenchError;

/// Pull the JSON payload out of a model reply.
pub fn extract_json(reply: &str) -> Option<&str> {
    if let Some(start) = reply.find("```json") {
        let rest = &reply[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim());
        }
    }
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end > start {
        Some(&reply[start..=end])
    } else {
        None
    }
}

fn payload(reply: &str) -> Result<&str, RevBenchError> {
    extract_json(reply).ok_or_else(|| RevBenchError::Judge {
        message: format!("no JSON payload in judge reply: {}", truncate(reply, 120)),
        retriable: false,
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let cut = s.char_indices().take_while(|(i, _)| *i < max).count();
        format!("{}...", &s.chars().take(cut).collect::<String>())
    }
}

#[derive(Deserialize)]
struct DecompositionWire {
    requirements: Vec<DecompositionItemWire>,
}

#[derive(Deserialize)]
struct DecompositionItemWire {
    text: String,
    severity: String,
}

/// Parse a decomposition reply. Every item must carry a recognized severity.
pub fn parse_decomposition(reply: &str) -> Result<Vec<DecomposedItem>, RevBenchError> {
    let wire: DecompositionWire =
        serde_json::from_str(payload(reply)?).map_err(|e| RevBenchError::Judge {
            message: format!("malformed decomposition reply: {e}"),
            retriable: false,
        })?;

    wire.requirements
        .into_iter()
        .map(|item| {
            let severity =
                Severity::parse(&item.severity).ok_or_else(|| RevBenchError::Judge {
                    message: format!("unrecognized severity '{}'", item.severity),
                    retriable: false,
                })?;
            Ok(DecomposedItem {
                text: item.text,
                severity,
            })
        })
        .collect()
}

#[derive(Deserialize)]
struct MatchWire {
    quality: f64,
}

/// Parse a match-quality reply, clamping into [0,1].
pub fn parse_match_quality(reply: &str) -> Result<f64, RevBenchError> {
    let wire: MatchWire =
        serde_json::from_str(payload(reply)?).map_err(|e| RevBenchError::Judge {
            message: format!("malformed match reply: {e}"),
            retriable: false,
        })?;
    Ok(wire.quality.clamp(0.0, 1.0))
}

#[derive(Deserialize)]
struct NoiseWire {
    noise: f64,
    #[serde(default)]
    category: Option<String>,
}

/// Parse a noise reply. Unknown categories degrade to no tag rather than
/// failing the comment.
pub fn parse_noise(reply: &str) -> Result<NoiseVerdict, RevBenchError> {
    let wire: NoiseWire =
        serde_json::from_str(payload(reply)?).map_err(|e| RevBenchError::Judge {
            message: format!("malformed noise reply: {e}"),
            retriable: false,
        })?;

    let category = wire.category.as_deref().and_then(|raw| {
        let parsed = NoiseCategory::parse(raw);
        if parsed.is_none() && !raw.is_empty() && raw != "null" && raw != "none" {
            tracing::debug!("judge returned unknown noise category '{raw}', dropping tag");
        }
        parsed
    });

    Ok(NoiseVerdict {
        score: wire.noise.clamp(0.0, 1.0),
        category,
    })
}
