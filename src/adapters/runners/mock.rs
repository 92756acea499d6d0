//! Mock debate runner for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DebateRequest, RankedOption, SubDebateResult};
use crate::domain::ports::DebateRunner;

/// Mock runner configuration applied to every sub-debate without a script.
#[derive(Debug, Clone)]
pub struct MockOutcome {
    /// Consensus reported by the debate
    pub consensus: f64,
    /// Final ranking
    pub ranking: Vec<RankedOption>,
    /// Cost of one sub-debate
    pub cost_usd: f64,
    /// Rounds played
    pub rounds: u32,
}

impl Default for MockOutcome {
    fn default() -> Self {
        Self {
            consensus: 0.8,
            ranking: vec![RankedOption::new("approve", 0.8), RankedOption::new("reject", 0.2)],
            cost_usd: 0.05,
            rounds: 2,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    scripted: HashMap<String, SubDebateResult>,
    /// Remaining provider failures per sub-debate id.
    failures: HashMap<String, u32>,
    calls: HashMap<String, usize>,
    requests: HashMap<String, DebateRequest>,
}

/// Debate runner with scripted results and failure injection.
#[derive(Debug, Default)]
pub struct MockDebateRunner {
    default_outcome: MockOutcome,
    state: Mutex<MockState>,
}

impl MockDebateRunner {
    /// A runner that completes every sub-debate with the default outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner with a custom default outcome.
    pub fn with_default_outcome(outcome: MockOutcome) -> Self {
        Self {
            default_outcome: outcome,
            ..Self::default()
        }
    }

    /// Cost charged by every unscripted sub-debate.
    pub fn with_cost(mut self, cost_usd: f64) -> Self {
        self.default_outcome.cost_usd = cost_usd;
        self
    }

    /// Return `result` for the given sub-debate id.
    pub fn with_result(self, sub_debate_id: &str, result: SubDebateResult) -> Self {
        self.lock().scripted.insert(sub_debate_id.to_string(), result);
        self
    }

    /// Fail the first `times` calls for the sub-debate with a provider error.
    pub fn fail_times(self, sub_debate_id: &str, times: u32) -> Self {
        self.lock().failures.insert(sub_debate_id.to_string(), times);
        self
    }

    /// Fail every call for the sub-debate with a provider error.
    pub fn fail_always(self, sub_debate_id: &str) -> Self {
        self.fail_times(sub_debate_id, u32::MAX)
    }

    /// Calls seen for a sub-debate, retries included.
    pub fn calls_for(&self, sub_debate_id: &str) -> usize {
        self.lock().calls.get(sub_debate_id).copied().unwrap_or(0)
    }

    /// Calls seen across every sub-debate.
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// The last request seen for the sub-debate.
    pub fn request_for(&self, sub_debate_id: &str) -> Option<DebateRequest> {
        self.lock().requests.get(sub_debate_id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DebateRunner for MockDebateRunner {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn run_debate(&self, request: DebateRequest) -> DomainResult<SubDebateResult> {
        let id = request.sub_debate_id.clone();
        let mut state = self.lock();
        *state.calls.entry(id.clone()).or_insert(0) += 1;
        state.requests.insert(id.clone(), request);

        if let Some(remaining) = state.failures.get_mut(&id) {
            if *remaining > 0 {
                *remaining = remaining.saturating_sub(1);
                return Err(DomainError::provider(&id, "mock provider failure"));
            }
        }

        if let Some(result) = state.scripted.get(&id) {
            return Ok(result.clone());
        }

        let outcome = &self.default_outcome;
        Ok(
            SubDebateResult::completed(&id, outcome.consensus, outcome.ranking.clone())
                .with_cost(outcome.cost_usd, outcome.rounds)
                .with_summary(format!("Mock conclusion for {id}")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failure_injection_then_success() {
        let runner = MockDebateRunner::new().fail_times("a", 1);
        assert!(runner.run_debate(DebateRequest::new("a", "q")).await.is_err());
        let result = runner.run_debate(DebateRequest::new("a", "q")).await.unwrap();
        assert!(result.is_completed());
        assert_eq!(runner.calls_for("a"), 2);
    }

    #[tokio::test]
    async fn test_scripted_result() {
        let runner = MockDebateRunner::new()
            .with_result("b", SubDebateResult::completed("b", 0.3, Vec::new()));
        let result = runner.run_debate(DebateRequest::new("b", "q")).await.unwrap();
        assert!((result.consensus_score - 0.3).abs() < 1e-9);
        assert_eq!(runner.request_for("b").unwrap().question, "q");
    }
}
