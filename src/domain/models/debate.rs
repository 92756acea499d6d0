//! Sub-debate runtime models: roles, messages, rounds, and results.

use serde::{Deserialize, Serialize};

use super::quality::QualityAnalysis;

// ============================================================================
// Agent roles
// ============================================================================

/// Role an agent plays in a debate. Named experts carry their matcher id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentRole {
    Optimist,
    Critic,
    Analyst,
    Synthesizer,
    Strategist,
    Expert(String),
}

impl AgentRole {
    /// Stable key used in transcripts and config.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Optimist => "optimist",
            Self::Critic => "critic",
            Self::Analyst => "analyst",
            Self::Synthesizer => "synthesizer",
            Self::Strategist => "strategist",
            Self::Expert(id) => id,
        }
    }

    /// The roster used when no matcher or forced list supplies one.
    pub fn default_roster() -> Vec<AgentRole> {
        vec![
            AgentRole::Strategist,
            AgentRole::Analyst,
            AgentRole::Critic,
            AgentRole::Synthesizer,
        ]
    }
}

impl From<String> for AgentRole {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "optimist" | "optimistic" => Self::Optimist,
            "critic" | "critical" => Self::Critic,
            "analyst" => Self::Analyst,
            "synthesizer" => Self::Synthesizer,
            "strategist" => Self::Strategist,
            _ => Self::Expert(value),
        }
    }
}

impl From<&str> for AgentRole {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<AgentRole> for String {
    fn from(role: AgentRole) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Messages and rounds
// ============================================================================

/// One agent turn. Append-only within a sub-debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateMessage {
    /// Speaker.
    #[serde(rename = "agent_key")]
    pub agent: AgentRole,
    pub content: String,
    pub tokens_used: u64,
    pub cost_usd: f64,
    /// Debate phase label, e.g. `round` or `synthesis`.
    pub phase: String,
    pub round: u32,
    /// Options this agent ranked, best first. Empty when the agent did not vote.
    #[serde(default)]
    pub ranking: Vec<String>,
}

impl DebateMessage {
    /// A turn with no cost and no ranking.
    pub fn new(agent: AgentRole, round: u32, content: impl Into<String>) -> Self {
        Self {
            agent,
            content: content.into(),
            tokens_used: 0,
            cost_usd: 0.0,
            phase: "round".to_string(),
            round,
            ranking: Vec::new(),
        }
    }

    /// Record token usage and spend.
    pub fn with_cost(mut self, tokens_used: u64, cost_usd: f64) -> Self {
        self.tokens_used = tokens_used;
        self.cost_usd = cost_usd;
        self
    }

    /// Attach the agent's ranking.
    pub fn with_ranking(mut self, ranking: Vec<String>) -> Self {
        self.ranking = ranking;
        self
    }
}

/// A completed round of agent turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebateRound {
    /// 1-based.
    pub round_number: u32,
    pub messages: Vec<DebateMessage>,
    /// Consensus measured after the round closed.
    #[serde(default)]
    pub consensus_score: f64,
}

impl DebateRound {
    /// An empty round.
    pub fn new(round_number: u32) -> Self {
        Self {
            round_number,
            ..Default::default()
        }
    }

    /// Spend summed over the round's messages.
    pub fn cost_usd(&self) -> f64 {
        self.messages.iter().map(|m| m.cost_usd).sum()
    }

    /// The latest turn of the round.
    pub fn last_message(&self) -> Option<&DebateMessage> {
        self.messages.last()
    }
}

// ============================================================================
// Results
// ============================================================================

/// An option with its aggregate score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOption {
    /// Option text as the agents wrote it.
    pub option: String,
    /// Normalized score, higher is better.
    pub score: f64,
}

impl RankedOption {
    /// A ranked option.
    pub fn new(option: impl Into<String>, score: f64) -> Self {
        Self {
            option: option.into(),
            score,
        }
    }
}

/// Terminal status of a sub-debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubDebateStatus {
    Completed,
    Failed,
    /// Never dispatched (budget ceiling or cancellation).
    Skipped,
}

impl std::fmt::Display for SubDebateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Why the convergence controller ended a sub-debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    Consensus { score: f64 },
    CostCeiling { spent_usd: f64, limit_usd: f64 },
    Stagnation { rounds: u32 },
    MaxRounds { rounds: u32 },
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Consensus { score } => write!(f, "consensus reached ({score:.2})"),
            Self::CostCeiling { spent_usd, limit_usd } => {
                write!(f, "cost ceiling ({spent_usd:.2} of {limit_usd:.2} USD)")
            }
            Self::Stagnation { rounds } => write!(f, "stagnated for {rounds} rounds"),
            Self::MaxRounds { rounds } => write!(f, "max rounds ({rounds})"),
        }
    }
}

/// Outcome of one sub-debate. Immutable once terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubDebateResult {
    /// Sub-debate this result belongs to.
    pub sub_debate_id: String,
    /// Terminal status.
    pub status: SubDebateStatus,
    /// Consensus in `[0.0, 1.0]`.
    pub consensus_score: f64,
    /// Options best first.
    pub ranking: Vec<RankedOption>,
    /// Spend including failed attempts reported by the runner.
    pub cost_usd: f64,
    /// Rounds played.
    pub rounds: u32,
    /// Short summary carried into later phases.
    #[serde(default)]
    pub summary: String,
    /// Why the round loop stopped.
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
    /// Failure or skip reason.
    #[serde(default)]
    pub error: Option<String>,
    /// Every round, for `--transcripts` output.
    #[serde(default)]
    pub transcript: Vec<DebateRound>,
    /// Quality verdict over the full history.
    #[serde(default)]
    pub quality: Option<QualityAnalysis>,
}

impl SubDebateResult {
    /// A completed result. Consensus is clamped to `[0.0, 1.0]`.
    pub fn completed(sub_debate_id: impl Into<String>, consensus_score: f64, ranking: Vec<RankedOption>) -> Self {
        Self {
            sub_debate_id: sub_debate_id.into(),
            status: SubDebateStatus::Completed,
            consensus_score: consensus_score.clamp(0.0, 1.0),
            ranking,
            cost_usd: 0.0,
            rounds: 0,
            summary: String::new(),
            stop_reason: None,
            error: None,
            transcript: Vec::new(),
            quality: None,
        }
    }

    /// A failed result carrying the error text.
    pub fn failed(sub_debate_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: SubDebateStatus::Failed,
            error: Some(error.into()),
            ..Self::completed(sub_debate_id, 0.0, Vec::new())
        }
    }

    /// A result for a sub-debate that was never dispatched.
    pub fn skipped(sub_debate_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: SubDebateStatus::Skipped,
            error: Some(reason.into()),
            ..Self::completed(sub_debate_id, 0.0, Vec::new())
        }
    }

    /// Record spend and rounds.
    pub fn with_cost(mut self, cost_usd: f64, rounds: u32) -> Self {
        self.cost_usd = cost_usd;
        self.rounds = rounds;
        self
    }

    /// Attach a summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Whether the sub-debate completed.
    pub fn is_completed(&self) -> bool {
        self.status == SubDebateStatus::Completed
    }

    /// The best-ranked option.
    pub fn top_option(&self) -> Option<&RankedOption> {
        self.ranking.first()
    }
}

// ============================================================================
// Runner requests
// ============================================================================

/// Conclusion of an earlier phase folded into a later sub-debate's prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorConclusion {
    /// Sub-debate the conclusion came from.
    pub source_id: String,
    pub summary: String,
    pub top_option: Option<String>,
    pub consensus_score: f64,
}

impl PriorConclusion {
    /// Carry a result forward as context.
    pub fn from_result(result: &SubDebateResult) -> Self {
        Self {
            source_id: result.sub_debate_id.clone(),
            summary: result.summary.clone(),
            top_option: result.top_option().map(|o| o.option.clone()),
            consensus_score: result.consensus_score,
        }
    }
}

/// Context handed to the runner with each sub-debate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebateContext {
    /// Conclusions of dependency phases, in plan order.
    pub prior_conclusions: Vec<PriorConclusion>,
}

impl DebateContext {
    /// Whether there is nothing to inherit.
    pub fn is_empty(&self) -> bool {
        self.prior_conclusions.is_empty()
    }

    /// Render the context as prompt text.
    pub fn render(&self) -> String {
        self.prior_conclusions
            .iter()
            .map(|c| match &c.top_option {
                Some(top) => format!(
                    "- [{}] favoured '{}' (consensus {:.2}): {}",
                    c.source_id, top, c.consensus_score, c.summary
                ),
                None => format!("- [{}] {}", c.source_id, c.summary),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Input to the Core Debate Runner for a single sub-debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateRequest {
    /// Sub-debate to run.
    pub sub_debate_id: String,
    /// Question for this sub-debate.
    pub question: String,
    /// Inherited conclusions.
    pub context: DebateContext,
    /// Roster override; bypasses the expert matcher.
    pub forced_experts: Option<Vec<String>>,
}

impl DebateRequest {
    /// A request with empty context.
    pub fn new(sub_debate_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            sub_debate_id: sub_debate_id.into(),
            question: question.into(),
            context: DebateContext::default(),
            forced_experts: None,
        }
    }

    /// Attach inherited context.
    pub fn with_context(mut self, context: DebateContext) -> Self {
        self.context = context;
        self
    }

    /// Force the roster.
    pub fn with_forced_experts(mut self, experts: Option<Vec<String>>) -> Self {
        self.forced_experts = experts;
        self
    }
}

// ============================================================================
// Round state machine states
// ============================================================================

/// Lifecycle of a single sub-debate inside the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "round", rename_all = "snake_case")]
pub enum DebateState {
    Initializing,
    Round(u32),
    Synthesizing,
    Completed,
    Failed,
}

impl DebateState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: &DebateState) -> bool {
        match (self, next) {
            (_, Self::Failed) => !self.is_terminal(),
            (Self::Initializing, Self::Round(1)) => true,
            (Self::Round(n), Self::Round(m)) => *m == n + 1,
            (Self::Round(_), Self::Synthesizing) => true,
            (Self::Synthesizing, Self::Completed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for DebateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Round(n) => write!(f, "round_{n}"),
            Self::Synthesizing => write!(f, "synthesizing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_string() {
        assert_eq!(AgentRole::from("Critic"), AgentRole::Critic);
        assert_eq!(AgentRole::from("cfo-latam"), AgentRole::Expert("cfo-latam".into()));
        assert_eq!(String::from(AgentRole::Synthesizer), "synthesizer");
    }

    #[test]
    fn test_debate_state_transitions() {
        assert!(DebateState::Initializing.can_transition_to(&DebateState::Round(1)));
        assert!(DebateState::Round(1).can_transition_to(&DebateState::Round(2)));
        assert!(!DebateState::Round(1).can_transition_to(&DebateState::Round(3)));
        assert!(DebateState::Round(2).can_transition_to(&DebateState::Synthesizing));
        assert!(!DebateState::Initializing.can_transition_to(&DebateState::Synthesizing));
        assert!(!DebateState::Completed.can_transition_to(&DebateState::Failed));
    }

    #[test]
    fn test_failed_result_has_no_ranking() {
        let result = SubDebateResult::failed("d1", "provider down");
        assert_eq!(result.status, SubDebateStatus::Failed);
        assert!(result.ranking.is_empty());
        assert_eq!(result.error.as_deref(), Some("provider down"));
    }

    #[test]
    fn test_context_render() {
        let ctx = DebateContext {
            prior_conclusions: vec![PriorConclusion {
                source_id: "overview/1".into(),
                summary: "Focus on LATAM".into(),
                top_option: Some("Mexico".into()),
                consensus_score: 0.8,
            }],
        };
        assert_eq!(ctx.render(), "- [overview/1] favoured 'Mexico' (consensus 0.80): Focus on LATAM");
    }
}
