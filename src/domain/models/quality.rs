//! Semantic quality assessment of a debate transcript.

use serde::{Deserialize, Serialize};

/// Category of a detected quality problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    ShallowReasoning,
    StockAgreement,
    LowDiversity,
    RoleDominance,
    RepetitiveContent,
}

/// How much an issue should weigh on moderation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
}

/// A single quality issue with the agents involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    /// What was found.
    pub kind: IssueKind,
    /// How serious it is.
    pub severity: IssueSeverity,
    /// Human-readable detail.
    pub description: String,
    #[serde(default)]
    pub agents: Vec<String>,
}

impl QualityIssue {
    /// An issue with no agents attached.
    pub fn new(kind: IssueKind, severity: IssueSeverity, description: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            description: description.into(),
            agents: Vec::new(),
        }
    }

    /// Name the agents involved.
    pub fn with_agents(mut self, agents: Vec<String>) -> Self {
        self.agents = agents;
        self
    }
}

/// Scores are on a 0..100 scale. Recomputed from the full history each round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAnalysis {
    /// Argument depth.
    pub depth_score: f64,
    /// Spread of distinct positions.
    pub diversity_score: f64,
    /// Penalized by repetition and stock agreement.
    pub originality_score: f64,
    /// Weighted mean of the three scores.
    pub overall_quality: f64,
    /// Issues found in the history.
    pub issues: Vec<QualityIssue>,
    /// Whether the next round gets moderation notes.
    pub needs_moderation: bool,
}

impl QualityAnalysis {
    /// The verdict for transcripts too short to judge.
    pub fn perfect() -> Self {
        Self {
            depth_score: 100.0,
            diversity_score: 100.0,
            originality_score: 100.0,
            overall_quality: 100.0,
            issues: Vec::new(),
            needs_moderation: false,
        }
    }

    /// Whether an issue of this kind was found.
    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }
}
