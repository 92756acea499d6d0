//! Router engine: decides the speaking order for the next round.
//!
//! Routing is a pure function of the history, the round, and the rule list.
//! There is no hidden state and no randomness, so identical input always
//! produces an identical order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::models::{AgentRole, DebateConfig, DebateMessage, DebateRound};
use crate::services::lexicon::{self, fold};

/// Property of the most recent message that a rule tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RouterCondition {
    /// Disagreement keyword density at or above the value.
    DisagreementAbove(f64),
    /// Agreement keyword density at or above the value.
    AgreementAbove(f64),
    /// The message names this option or ranks it first.
    MentionsOption(String),
    LastSpeaker(AgentRole),
    Always,
}

/// How a matching rule reshapes the default order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RouterAction {
    /// Move this role to the front. Only applies when the role is on the roster.
    Prepend(AgentRole),
    /// Listed roles first, in this order; the rest keep their default order.
    Fixed(Vec<AgentRole>),
}

/// A named condition and the reordering it triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterRule {
    /// Name logged when the rule fires.
    pub name: String,
    /// When the rule applies.
    pub condition: RouterCondition,
    /// How the order changes.
    pub action: RouterAction,
}

impl RouterRule {
    /// A rule.
    pub fn new(name: impl Into<String>, condition: RouterCondition, action: RouterAction) -> Self {
        Self {
            name: name.into(),
            condition,
            action,
        }
    }

    /// Critic after strong disagreement, synthesizer after near-consensus.
    pub fn defaults(config: &DebateConfig) -> Vec<RouterRule> {
        vec![
            RouterRule::new(
                "disagreement_brings_critic",
                RouterCondition::DisagreementAbove(config.disagreement_density),
                RouterAction::Prepend(AgentRole::Critic),
            ),
            RouterRule::new(
                "agreement_brings_synthesizer",
                RouterCondition::AgreementAbove(config.agreement_density),
                RouterAction::Prepend(AgentRole::Synthesizer),
            ),
        ]
    }
}

/// Speaking-order router over a fixed roster.
#[derive(Debug, Clone)]
pub struct RouterEngine {
    default_order: Vec<AgentRole>,
}

impl RouterEngine {
    /// A router over `default_order`.
    pub fn new(default_order: Vec<AgentRole>) -> Self {
        Self { default_order }
    }

    /// The roster in default speaking order.
    pub fn default_order(&self) -> &[AgentRole] {
        &self.default_order
    }

    /// Order for the next turns. `round` is the round being played; when it
    /// has no messages yet the last message of `history` is inspected.
    pub fn route(
        &self,
        history: &[DebateMessage],
        round: &DebateRound,
        rules: &[RouterRule],
    ) -> Vec<AgentRole> {
        let Some(last) = round.last_message().or_else(|| history.last()) else {
            return self.default_order.clone();
        };

        for rule in rules {
            if !condition_holds(&rule.condition, last) {
                continue;
            }
            if let Some(order) = self.apply(&rule.action) {
                debug!(
                    rule = %rule.name,
                    round = round.round_number,
                    first = %order.first().map(AgentRole::as_str).unwrap_or("-"),
                    "Router rule matched"
                );
                return order;
            }
        }

        self.default_order.clone()
    }

    fn apply(&self, action: &RouterAction) -> Option<Vec<AgentRole>> {
        match action {
            RouterAction::Prepend(role) => {
                let pos = self.default_order.iter().position(|r| r == role)?;
                let mut order = self.default_order.clone();
                let role = order.remove(pos);
                order.insert(0, role);
                Some(order)
            }
            RouterAction::Fixed(listed) => {
                let mut order: Vec<AgentRole> = listed
                    .iter()
                    .filter(|r| self.default_order.contains(r))
                    .cloned()
                    .collect();
                if order.is_empty() {
                    return None;
                }
                for role in &self.default_order {
                    if !order.contains(role) {
                        order.push(role.clone());
                    }
                }
                Some(order)
            }
        }
    }
}

fn condition_holds(condition: &RouterCondition, last: &DebateMessage) -> bool {
    match condition {
        RouterCondition::DisagreementAbove(threshold) => {
            lexicon::disagreement_density(&last.content) >= *threshold
        }
        RouterCondition::AgreementAbove(threshold) => {
            lexicon::agreement_density(&last.content) >= *threshold
        }
        RouterCondition::MentionsOption(option) => {
            let needle = fold(option);
            last.ranking.first().is_some_and(|top| fold(top) == needle)
                || fold(&last.content).contains(&needle)
        }
        RouterCondition::LastSpeaker(role) => &last.agent == role,
        RouterCondition::Always => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RouterEngine {
        RouterEngine::new(AgentRole::default_roster())
    }

    fn rules() -> Vec<RouterRule> {
        RouterRule::defaults(&DebateConfig::default())
    }

    fn msg(agent: AgentRole, content: &str) -> DebateMessage {
        DebateMessage::new(agent, 1, content)
    }

    #[test]
    fn test_empty_history_uses_default_order() {
        let order = engine().route(&[], &DebateRound::new(1), &rules());
        assert_eq!(order, AgentRole::default_roster());
    }

    #[test]
    fn test_disagreement_puts_critic_first() {
        let history = vec![msg(
            AgentRole::Analyst,
            "No estoy de acuerdo, los datos son incorrectos y el plan falla",
        )];
        let order = engine().route(&history, &DebateRound::new(2), &rules());
        assert_eq!(order[0], AgentRole::Critic);
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn test_agreement_puts_synthesizer_first() {
        let history = vec![msg(AgentRole::Critic, "Totalmente de acuerdo, buen punto")];
        let order = engine().route(&history, &DebateRound::new(2), &rules());
        assert_eq!(order[0], AgentRole::Synthesizer);
    }

    #[test]
    fn test_prepend_skips_roles_not_on_roster() {
        let engine = RouterEngine::new(vec![AgentRole::Optimist, AgentRole::Analyst]);
        let history = vec![msg(AgentRole::Analyst, "I disagree, that is wrong")];
        let order = engine.route(&history, &DebateRound::new(2), &rules());
        assert_eq!(order, vec![AgentRole::Optimist, AgentRole::Analyst]);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            RouterRule::new(
                "mexico_goes_to_analyst",
                RouterCondition::MentionsOption("México".into()),
                RouterAction::Fixed(vec![AgentRole::Analyst]),
            ),
            RouterRule::new("always", RouterCondition::Always, RouterAction::Prepend(AgentRole::Critic)),
        ];
        let history = vec![msg(AgentRole::Strategist, "Mexico has the larger market")];
        let order = engine().route(&history, &DebateRound::new(2), &rules);
        assert_eq!(order[0], AgentRole::Analyst);
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn test_routing_is_pure() {
        let history = vec![
            msg(AgentRole::Strategist, "However I think the risk is wrong"),
            msg(AgentRole::Critic, "Agreed, good point"),
        ];
        let round = DebateRound::new(3);
        let first = engine().route(&history, &round, &rules());
        for _ in 0..10 {
            assert_eq!(engine().route(&history, &round, &rules()), first);
        }
    }
}
