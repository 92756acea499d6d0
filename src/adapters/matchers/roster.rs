//! Static keyword-to-expert roster matcher.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::AgentRole;
use crate::domain::ports::ExpertMatcher;
use crate::services::lexicon;

/// Adds named experts to a base roster when their keywords appear in the
/// question. Keywords match on the accent-folded form.
#[derive(Debug, Clone)]
pub struct RosterMatcher {
    base: Vec<AgentRole>,
    experts: Vec<(String, AgentRole)>,
}

impl RosterMatcher {
    /// A matcher over `base` with no named experts.
    pub fn new(base: Vec<AgentRole>) -> Self {
        Self {
            base,
            experts: Vec::new(),
        }
    }

    /// Add an expert joining when `keyword` appears in the question.
    pub fn with_expert(mut self, keyword: &str, expert: impl Into<String>) -> Self {
        let keyword = lexicon::fold(keyword).trim().to_string();
        if !keyword.is_empty() {
            self.experts.push((keyword, AgentRole::Expert(expert.into())));
        }
        self
    }

    /// Base roster plus finance, legal, and market experts.
    pub fn with_common_experts(self) -> Self {
        self.with_expert("costo", "finance")
            .with_expert("cost", "finance")
            .with_expert("precio", "finance")
            .with_expert("price", "finance")
            .with_expert("regulacion", "legal")
            .with_expert("regulation", "legal")
            .with_expert("mercado", "market")
            .with_expert("market", "market")
    }
}

impl Default for RosterMatcher {
    fn default() -> Self {
        Self::new(AgentRole::default_roster())
    }
}

#[async_trait]
impl ExpertMatcher for RosterMatcher {
    async fn roster_for(&self, question: &str) -> DomainResult<Vec<AgentRole>> {
        let folded = lexicon::fold(question);
        let mut roster = self.base.clone();
        for (keyword, expert) in &self.experts {
            if lexicon::count_hits(&folded, &[keyword.as_str()]) > 0 && !roster.contains(expert) {
                roster.push(expert.clone());
            }
        }
        Ok(roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keywords_add_experts_once() {
        let matcher = RosterMatcher::new(vec![AgentRole::Analyst]).with_common_experts();
        let roster = matcher
            .roster_for("¿Qué mercado tiene menor costo y mejor precio?")
            .await
            .unwrap();
        assert_eq!(
            roster,
            vec![
                AgentRole::Analyst,
                AgentRole::Expert("finance".into()),
                AgentRole::Expert("market".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_match_returns_base() {
        let roster = RosterMatcher::default().roster_for("Hola equipo").await.unwrap();
        assert_eq!(roster, AgentRole::default_roster());
    }
}
