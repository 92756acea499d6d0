//! Agent turn port: the single external LLM call per agent turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentRole, DebateContext, DebateMessage};

/// Everything an agent sees before speaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    /// Sub-debate being played.
    pub sub_debate_id: String,
    /// Who speaks.
    pub agent: AgentRole,
    /// 1-based round number.
    pub round: u32,
    /// Question of the sub-debate.
    pub question: String,
    /// Conclusions inherited from earlier phases.
    pub context: DebateContext,
    /// Every message so far, including earlier turns of this round.
    pub history: Vec<DebateMessage>,
    /// Notes raised by the quality monitor for this round.
    pub moderation_notes: Vec<String>,
}

/// One parsed model response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentTurn {
    /// Text of the turn.
    pub content: String,
    /// Tokens billed for the turn.
    pub tokens_used: u64,
    /// Spend for the turn.
    pub cost_usd: f64,
    /// Options ranked best first; empty if the agent did not vote.
    #[serde(default)]
    pub ranking: Vec<String>,
}

/// Produces one agent's contribution. Prompt rendering and response parsing
/// live behind this seam.
#[async_trait]
pub trait AgentTurnProvider: Send + Sync {
    /// Produce one turn. Provider errors are retried by the executor.
    async fn take_turn(&self, request: TurnRequest) -> DomainResult<AgentTurn>;
}
