// src/core/types.rs — Core domain types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Severity of a ground-truth requirement, ordered from most to least important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Style,
}

impl Severity {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "major" => Some(Severity::Major),
            "minor" => Some(Severity::Minor),
            "style" => Some(Severity::Style),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Critical => "Critical",
            Severity::Major => "Major",
            Severity::Minor => "Minor",
            Severity::Style => "Style",
        };
        write!(f, "{s}")
    }
}

/// Severity weight table. Defaults follow the benchmark convention
/// Critical=10, Major=5, Minor=2, Style=1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityWeights {
    pub critical: f64,
    pub major: f64,
    pub minor: f64,
    pub style: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            critical: 10.0,
            major: 5.0,
            minor: 2.0,
            style: 1.0,
        }
    }
}

impl SeverityWeights {
    pub fn weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::Major => self.major,
            Severity::Minor => self.minor,
            Severity::Style => self.style,
        }
    }
}

/// File + line position inside the change under review.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

/// One curated ground-truth review entry for a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthReview {
    pub id: String,
    pub location: SourceLocation,
    pub body: String,
}

/// One agent-produced review comment. Read-only input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub location: SourceLocation,
    pub body: String,
}

/// A benchmark case: one flawed code change plus its ground truth and the
/// agent's comments. Immutable once loaded; owned by the Scheduler while
/// its pipeline runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkCase {
    pub id: String,
    /// Reference to the code change (diff text or a locator for it).
    pub change_ref: Option<String>,
    pub category: String,
    pub difficulty: String,
    pub reviews: Vec<GroundTruthReview>,
    pub comments: Vec<Comment>,
}

/// One atomic, independently scorable concern extracted from a ground-truth
/// review. Created by the Decomposer, immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub review_id: String,
    pub text: String,
    pub severity: Severity,
    pub location: SourceLocation,
}

/// One requirement/comment pairing selected by the Matcher.
/// Indices refer into the case's requirement and comment lists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedPair {
    pub requirement: usize,
    pub comment: usize,
    /// Judge quality in [0,1]: 1.0 = fully addressed, 0.0 = unrelated.
    pub quality: f64,
}

/// Closed set of noise categories a comment can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseCategory {
    Verbosity,
    Redundancy,
    OverEngineering,
    ExcessiveMetadata,
    Unrelated,
    OutOfScopeVerification,
    HallucinatedWarning,
    GenericAdvice,
}

impl NoiseCategory {
    pub const ALL: [NoiseCategory; 8] = [
        NoiseCategory::Verbosity,
        NoiseCategory::Redundancy,
        NoiseCategory::OverEngineering,
        NoiseCategory::ExcessiveMetadata,
        NoiseCategory::Unrelated,
        NoiseCategory::OutOfScopeVerification,
        NoiseCategory::HallucinatedWarning,
        NoiseCategory::GenericAdvice,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "verbosity" => Some(NoiseCategory::Verbosity),
            "redundancy" => Some(NoiseCategory::Redundancy),
            "over_engineering" | "overengineering" => Some(NoiseCategory::OverEngineering),
            "excessive_metadata" => Some(NoiseCategory::ExcessiveMetadata),
            "unrelated" | "unrelated_incorrect" | "incorrect" => Some(NoiseCategory::Unrelated),
            "out_of_scope_verification" => Some(NoiseCategory::OutOfScopeVerification),
            "hallucinated_warning" => Some(NoiseCategory::HallucinatedWarning),
            "generic_advice" => Some(NoiseCategory::GenericAdvice),
            _ => None,
        }
    }
}

impl std::fmt::Display for NoiseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NoiseCategory::Verbosity => "verbosity",
            NoiseCategory::Redundancy => "redundancy",
            NoiseCategory::OverEngineering => "over_engineering",
            NoiseCategory::ExcessiveMetadata => "excessive_metadata",
            NoiseCategory::Unrelated => "unrelated",
            NoiseCategory::OutOfScopeVerification => "out_of_scope_verification",
            NoiseCategory::HallucinatedWarning => "hallucinated_warning",
            NoiseCategory::GenericAdvice => "generic_advice",
        };
        write!(f, "{s}")
    }
}

/// Noise verdict for one comment. Scored independently of match quality —
/// a comment can address a requirement perfectly and still be verbose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseAssessment {
    pub comment: usize,
    /// Noise in [0,1]: 0.0 = clean, 1.0 = pure noise.
    pub score: f64,
    pub category: Option<NoiseCategory>,
}

/// Per-case summary. Derived, never mutated after computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseScore {
    pub case_id: String,
    pub tp_weighted: f64,
    pub fn_weighted: f64,
    pub comment_count: usize,
    pub noise: Vec<NoiseAssessment>,
}

impl CaseScore {
    pub fn noise_sum(&self) -> f64 {
        self.noise.iter().map(|n| n.score).sum()
    }

    pub fn recall(&self) -> f64 {
        let denom = self.tp_weighted + self.fn_weighted;
        if denom > 0.0 {
            self.tp_weighted / denom
        } else {
            0.0
        }
    }

    /// 1.0 minus mean noise. An empty comment set has no noise by definition.
    pub fn precision(&self) -> f64 {
        if self.comment_count == 0 {
            1.0
        } else {
            1.0 - self.noise_sum() / self.comment_count as f64
        }
    }
}

/// How one case's pipeline ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    Scored { recall: f64, precision: f64 },
    /// Ground truth could not be decomposed — zero-recall failure, run continues.
    Failed,
    /// Inputs could not be fetched — excluded from scoring, still reported.
    Skipped,
}

/// Coarse progress emitted by the Scheduler as cases finish.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    CaseFinished {
        case_id: String,
        completed: usize,
        total: usize,
        outcome: CaseOutcome,
    },
    Complete {
        scored: usize,
        failed: usize,
        skipped: usize,
    },
}

/// The single configuration object the Scheduler is constructed with.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub weights: SeverityWeights,
    pub line_tolerance: u32,
    pub concurrency: usize,
    pub judge_timeout: Duration,
    pub judge_retries: u32,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            weights: SeverityWeights::default(),
            line_tolerance: 2,
            concurrency: 32,
            judge_timeout: Duration::from_secs(60),
            judge_retries: 3,
        }
    }
}
