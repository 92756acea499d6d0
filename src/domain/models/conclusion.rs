//! Final conclusion synthesized from all sub-debate results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::debate::RankedOption;
use super::pattern::PatternType;

/// Whether the conclusion covers the whole plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConclusionStatus {
    Complete,
    /// Budget-truncated or cancelled run. Not a full answer.
    Incomplete { reason: String },
}

/// A result that fed the final ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConclusionInput {
    /// Contributing sub-debate.
    pub sub_debate_id: String,
    /// Its phase.
    pub phase_id: String,
    /// Weight in the merged ranking.
    pub weight: f64,
}

/// A result that did not feed the final ranking, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusedResult {
    /// Sub-debate left out.
    pub sub_debate_id: String,
    /// Its phase.
    pub phase_id: String,
    /// Why it was left out.
    pub reason: String,
}

/// An argument carried forward next to the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportingEvidence {
    pub sub_debate_id: String,
    /// Label such as `defender`, `attacker`, `round_1`, or a perspective name.
    pub stance: String,
    /// Summary of the argument.
    pub summary: String,
    /// Option the argument favoured.
    pub top_option: Option<String>,
}

/// Terminal output of one orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalConclusion {
    /// Random v4 id.
    pub id: Uuid,
    /// The question debated.
    pub question: String,
    /// Pattern that was executed.
    pub pattern: PatternType,
    /// Complete or incomplete with a reason.
    pub status: ConclusionStatus,
    /// Top of `ranking`.
    pub recommendation: Option<String>,
    /// Merged ranking, best first.
    pub ranking: Vec<RankedOption>,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Human-readable account of the run.
    pub narrative: String,
    /// Results merged into the ranking.
    pub inputs: Vec<ConclusionInput>,
    /// Every other result, with a reason.
    pub not_used: Vec<UnusedResult>,
    /// Arguments carried next to the ranking.
    pub evidence: Vec<SupportingEvidence>,
    /// Spend over the whole run.
    pub total_cost_usd: f64,
    /// Rounds over the whole run.
    pub total_rounds: u32,
    /// When synthesis ran.
    pub created_at: DateTime<Utc>,
}

impl FinalConclusion {
    /// Whether the whole plan ran.
    pub fn is_complete(&self) -> bool {
        self.status == ConclusionStatus::Complete
    }

    /// Whether a sub-debate is accounted for as an input or an unused result.
    pub fn accounts_for(&self, sub_debate_id: &str) -> bool {
        self.inputs.iter().any(|i| i.sub_debate_id == sub_debate_id)
            || self.not_used.iter().any(|u| u.sub_debate_id == sub_debate_id)
    }
}
