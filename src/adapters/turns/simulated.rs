//! Deterministic offline agent turns.
//!
//! Lets the engine run end to end without a model. Each agent opens with an
//! option picked from a hash of its role and the sub-debate id, then follows
//! the leading option once earlier rounds exist, so debates converge.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentRole, DebateMessage};
use crate::domain::ports::{AgentTurn, AgentTurnProvider, TurnRequest};
use crate::services::lexicon;
use crate::services::signal_detector::SignalDetector;

const FALLBACK_OPTIONS: [&str; 2] = ["proceed", "hold"];
const DEFAULT_COST_PER_1K_TOKENS: f64 = 0.003;
/// Rough prompt overhead per earlier message.
const TOKENS_PER_HISTORY_MESSAGE: u64 = 40;

/// Deterministic offline agent turns built from the question's options.
pub struct SimulatedTurnProvider {
    detector: SignalDetector,
    cost_per_1k_tokens: f64,
}

impl SimulatedTurnProvider {
    /// A provider with the default token price.
    pub fn new() -> Self {
        Self {
            detector: SignalDetector::new(),
            cost_per_1k_tokens: DEFAULT_COST_PER_1K_TOKENS,
        }
    }

    /// Set the token price. Negative prices are treated as zero.
    pub fn with_cost_per_1k_tokens(mut self, cost: f64) -> Self {
        self.cost_per_1k_tokens = cost.max(0.0);
        self
    }

    fn options_for(&self, question: &str) -> Vec<String> {
        self.detector
            .detect(question)
            .ok()
            .map(|d| d.parameters.options)
            .filter(|o| o.len() >= 2)
            .unwrap_or_else(|| FALLBACK_OPTIONS.iter().map(|o| (*o).to_string()).collect())
    }
}

impl Default for SimulatedTurnProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentTurnProvider for SimulatedTurnProvider {
    async fn take_turn(&self, request: TurnRequest) -> DomainResult<AgentTurn> {
        let options = self.options_for(&request.question);
        let seed = fnv1a(&format!("{}|{}", request.agent, request.sub_debate_id));
        let own = seed as usize % options.len();

        let top = if request.round > 1 {
            leading_option(&request.history, &options).unwrap_or(own)
        } else {
            own
        };
        let alternative = (top + 1) % options.len();

        let mut ranking = vec![options[top].clone()];
        ranking.extend(
            options
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != top)
                .map(|(_, o)| o.clone()),
        );

        let mut content = compose(
            &request.agent,
            request.round,
            &options[top],
            &options[alternative],
            seed,
        );
        if !request.moderation_notes.is_empty() {
            content.push_str(" Addressing the moderator: the figures above come from 2 independent sources.");
        }

        let words = lexicon::word_count(&content) as u64;
        let tokens_used = words * 4 / 3
            + request.history.len() as u64 * TOKENS_PER_HISTORY_MESSAGE
            + lexicon::word_count(&request.context.render()) as u64;
        let cost_usd = tokens_used as f64 / 1000.0 * self.cost_per_1k_tokens;

        Ok(AgentTurn {
            content,
            tokens_used,
            cost_usd,
            ranking,
        })
    }
}

/// Index of the option with the most first-choice votes so far. Ties go to
/// the option listed first.
fn leading_option(history: &[DebateMessage], options: &[String]) -> Option<usize> {
    let mut votes: HashMap<usize, usize> = HashMap::new();
    for message in history {
        if let Some(first) = message.ranking.first() {
            if let Some(idx) = options.iter().position(|o| o == first) {
                *votes.entry(idx).or_default() += 1;
            }
        }
    }
    votes
        .into_iter()
        .max_by(|(ia, va), (ib, vb)| va.cmp(vb).then(ib.cmp(ia)))
        .map(|(idx, _)| idx)
}

fn compose(agent: &AgentRole, round: u32, top: &str, alternative: &str, seed: u64) -> String {
    let pct = 10 + seed % 20;
    match agent {
        AgentRole::Strategist => format!(
            "{top} aligns best with the long-term position because it compounds our existing \
             advantages; for example, it scores higher than {alternative} on 3 of 4 strategic criteria."
        ),
        AgentRole::Analyst => format!(
            "The data favours {top}: the estimate shows roughly {pct}% better expected return than \
             {alternative}, because demand there is more stable."
        ),
        AgentRole::Critic if round <= 1 => format!(
            "I disagree with treating {alternative} as the safe choice, because its downside risk \
             is understated; {top} has fewer failure modes."
        ),
        AgentRole::Critic => format!(
            "My remaining objection to {top} is execution risk, but the evidence in round {round} \
             still puts it ahead of {alternative}."
        ),
        AgentRole::Synthesizer => format!(
            "Weighing the arguments, {top} leads since the analysis and the strategic case \
             converge; {alternative} remains the fallback."
        ),
        AgentRole::Optimist => format!(
            "{top} offers the biggest upside because it opens a market about {pct}% larger than \
             {alternative}."
        ),
        AgentRole::Expert(name) => format!(
            "From the {name} perspective, {top} fits the operating constraints better than \
             {alternative}, because 2 comparable cases point that way."
        ),
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}
