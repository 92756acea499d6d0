//! Expert matcher port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::AgentRole;

/// Supplies the candidate agent roster for a sub-debate question.
#[async_trait]
pub trait ExpertMatcher: Send + Sync {
    async fn roster_for(&self, question: &str) -> DomainResult<Vec<AgentRole>>;
}
