//! Debate round state machine: the in-process Core Debate Runner.
//!
//! `initializing → round_n → synthesizing → completed | failed`. Agents speak
//! one at a time so each turn sees every earlier message. After each round
//! the quality monitor scores the full history and the convergence
//! controller decides whether another round is played.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AgentRole, Config, DebateMessage, DebateRequest, DebateRound, DebateState, RankedOption,
    StopReason, SubDebateResult,
};
use crate::domain::ports::{AgentTurnProvider, DebateRunner, ExpertMatcher, TurnRequest};
use crate::services::convergence_controller::{ConvergenceController, RoundSnapshot};
use crate::services::lexicon;
use crate::services::quality_monitor::QualityMonitor;
use crate::services::router_engine::{RouterEngine, RouterRule};

const SUMMARY_MAX_CHARS: usize = 280;
const PREMATURE_CONSENSUS_NOTE: &str =
    "Agreement came early: test the leading option against its strongest objection.";

/// In-process debate runner: plays rounds of agent turns until convergence.
pub struct RoundStateMachine {
    turns: Arc<dyn AgentTurnProvider>,
    matcher: Option<Arc<dyn ExpertMatcher>>,
    quality: QualityMonitor,
    convergence: ConvergenceController,
    rules: Vec<RouterRule>,
    default_roster: Vec<AgentRole>,
}

impl RoundStateMachine {
    /// A runner over `turns` with the default routing rules.
    pub fn new(turns: Arc<dyn AgentTurnProvider>, config: &Config) -> Self {
        let default_roster: Vec<AgentRole> = config
            .debate
            .default_roster
            .iter()
            .map(|r| AgentRole::from(r.as_str()))
            .collect();
        Self {
            turns,
            matcher: None,
            quality: QualityMonitor::new(config.quality.clone()),
            convergence: ConvergenceController::new(
                config.convergence.clone(),
                config.debate.max_rounds,
            ),
            rules: RouterRule::defaults(&config.debate),
            default_roster: if default_roster.is_empty() {
                AgentRole::default_roster()
            } else {
                default_roster
            },
        }
    }

    /// Pick rosters with `matcher` when no experts are forced.
    pub fn with_matcher(mut self, matcher: Arc<dyn ExpertMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Replace the routing rules.
    pub fn with_rules(mut self, rules: Vec<RouterRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Forced experts, else the matcher's roster, else the default roster.
    async fn resolve_roster(&self, request: &DebateRequest) -> Vec<AgentRole> {
        if let Some(forced) = request.forced_experts.as_ref().filter(|f| !f.is_empty()) {
            return forced.iter().map(|r| AgentRole::from(r.as_str())).collect();
        }

        if let Some(matcher) = &self.matcher {
            match matcher.roster_for(&request.question).await {
                Ok(roster) if !roster.is_empty() => return roster,
                Ok(_) => {}
                Err(e) => warn!(
                    sub_debate_id = %request.sub_debate_id,
                    error = %e,
                    "Expert matcher failed, using default roster"
                ),
            }
        }

        self.default_roster.clone()
    }

    async fn run_rounds(
        &self,
        request: &DebateRequest,
        state: &mut DebateState,
    ) -> DomainResult<SubDebateResult> {
        let roster = self.resolve_roster(request).await;
        let router = RouterEngine::new(roster);

        let mut history: Vec<DebateMessage> = Vec::new();
        let mut transcript: Vec<DebateRound> = Vec::new();
        let mut snapshots: Vec<RoundSnapshot> = Vec::new();
        let mut notes: Vec<String> = Vec::new();
        let mut cost_usd = 0.0;
        let mut round_number = 0u32;

        let stop_reason: StopReason = loop {
            round_number += 1;
            advance(state, DebateState::Round(round_number))?;

            let mut round = DebateRound::new(round_number);
            let order = router.route(&history, &round, &self.rules);

            for agent in order {
                let turn = self
                    .turns
                    .take_turn(TurnRequest {
                        sub_debate_id: request.sub_debate_id.clone(),
                        agent: agent.clone(),
                        round: round_number,
                        question: request.question.clone(),
                        context: request.context.clone(),
                        history: history.clone(),
                        moderation_notes: notes.clone(),
                    })
                    .await
                    .map_err(|e| as_provider_error(&request.sub_debate_id, e))?;

                let message = DebateMessage::new(agent, round_number, turn.content)
                    .with_cost(turn.tokens_used, turn.cost_usd)
                    .with_ranking(turn.ranking);
                cost_usd += message.cost_usd;
                history.push(message.clone());
                round.messages.push(message);
            }

            round.consensus_score = round_consensus(&round.messages);
            let leader = borda(&round.messages).into_iter().next().map(|o| o.option);

            let analysis = self.quality.analyze(&history);
            notes = if analysis.needs_moderation {
                self.quality.moderation_notes(&analysis)
            } else {
                Vec::new()
            };
            if self.quality.detect_premature_consensus(&history, round_number) {
                notes.push(PREMATURE_CONSENSUS_NOTE.to_string());
            }

            debug!(
                sub_debate_id = %request.sub_debate_id,
                round = round_number,
                consensus = round.consensus_score,
                quality = analysis.overall_quality,
                notes = notes.len(),
                "Round closed"
            );

            snapshots.push(RoundSnapshot {
                round: round_number,
                consensus: round.consensus_score,
                top_option: leader,
                cumulative_cost_usd: cost_usd,
            });
            transcript.push(round);

            if let Some(reason) = self.convergence.decide(&snapshots).stop_reason() {
                break reason.clone();
            }
        };

        advance(state, DebateState::Synthesizing)?;

        let last_round = transcript.last();
        let consensus = last_round.map_or(0.0, |r| r.consensus_score);
        let ranking = last_round.map(|r| borda(&r.messages)).unwrap_or_default();
        let summary = last_round.map(summarize).unwrap_or_default();

        let mut result = SubDebateResult::completed(&request.sub_debate_id, consensus, ranking)
            .with_cost(cost_usd, round_number)
            .with_summary(summary);
        result.stop_reason = Some(stop_reason);
        result.transcript = transcript;
        result.quality = Some(self.quality.analyze(&history));

        advance(state, DebateState::Completed)?;
        Ok(result)
    }
}

#[async_trait]
impl DebateRunner for RoundStateMachine {
    fn name(&self) -> &'static str {
        "round_state_machine"
    }

    async fn run_debate(&self, request: DebateRequest) -> DomainResult<SubDebateResult> {
        let mut state = DebateState::Initializing;

        match self.run_rounds(&request, &mut state).await {
            Ok(result) => {
                info!(
                    sub_debate_id = %result.sub_debate_id,
                    rounds = result.rounds,
                    consensus = result.consensus_score,
                    cost_usd = result.cost_usd,
                    stop_reason = %result.stop_reason.as_ref().map(ToString::to_string).unwrap_or_default(),
                    "Sub-debate completed"
                );
                Ok(result)
            }
            Err(e) => {
                if state.can_transition_to(&DebateState::Failed) {
                    state = DebateState::Failed;
                }
                warn!(
                    sub_debate_id = %request.sub_debate_id,
                    state = %state,
                    error = %e,
                    "Sub-debate failed"
                );
                Err(e)
            }
        }
    }
}

fn advance(state: &mut DebateState, next: DebateState) -> DomainResult<()> {
    if !state.can_transition_to(&next) {
        return Err(DomainError::InvalidStateTransition {
            from: state.to_string(),
            to: next.to_string(),
        });
    }
    *state = next;
    Ok(())
}

fn as_provider_error(sub_debate_id: &str, err: DomainError) -> DomainError {
    match err {
        DomainError::Provider { .. } => err,
        other => DomainError::provider(sub_debate_id, other.to_string()),
    }
}

/// Plurality share of the voters' top choices. Without votes, the share of
/// messages that agree without disagreeing.
pub fn round_consensus(messages: &[DebateMessage]) -> f64 {
    let tops: Vec<String> = messages
        .iter()
        .filter_map(|m| m.ranking.first())
        .map(|top| lexicon::fold(top))
        .collect();

    if !tops.is_empty() {
        let best = tops
            .iter()
            .map(|t| tops.iter().filter(|o| *o == t).count())
            .max()
            .unwrap_or(0);
        return best as f64 / tops.len() as f64;
    }

    if messages.is_empty() {
        return 0.0;
    }
    let agreeing = messages
        .iter()
        .filter(|m| {
            lexicon::agreement_density(&m.content) > 0.0
                && lexicon::disagreement_density(&m.content) == 0.0
        })
        .count();
    agreeing as f64 / messages.len() as f64
}

/// Borda count over the messages' rankings, normalized to `[0.0, 1.0]`.
/// Ties keep the order in which options were first ranked.
pub fn borda(messages: &[DebateMessage]) -> Vec<RankedOption> {
    let votes: Vec<&[String]> = messages
        .iter()
        .map(|m| m.ranking.as_slice())
        .filter(|r| !r.is_empty())
        .collect();
    let Some(width) = votes.iter().map(|r| r.len()).max() else {
        return Vec::new();
    };

    let mut points: Vec<(String, String, f64)> = Vec::new();
    for ranking in &votes {
        for (i, option) in ranking.iter().enumerate() {
            let key = lexicon::fold(option);
            let award = (ranking.len() - i) as f64;
            match points.iter_mut().find(|(k, _, _)| *k == key) {
                Some(entry) => entry.2 += award,
                None => points.push((key, option.trim().to_string(), award)),
            }
        }
    }

    let max_points = (votes.len() * width) as f64;
    let mut ranked: Vec<RankedOption> = points
        .into_iter()
        .map(|(_, option, p)| RankedOption::new(option, p / max_points))
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// The synthesizer's closing words if it spoke, else the last message.
fn summarize(round: &DebateRound) -> String {
    let message = round
        .messages
        .iter()
        .rev()
        .find(|m| m.agent == AgentRole::Synthesizer)
        .or_else(|| round.last_message());
    let content = message.map(|m| m.content.trim()).unwrap_or_default();
    if content.chars().count() <= SUMMARY_MAX_CHARS {
        content.to_string()
    } else {
        let cut: String = content.chars().take(SUMMARY_MAX_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}
