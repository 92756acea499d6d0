//! Core Debate Runner port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DebateRequest, SubDebateResult};

/// Runs one complete sub-debate to a terminal result.
///
/// Implementations may return [`DomainError::Provider`](crate::domain::errors::DomainError::Provider)
/// when an underlying LLM call fails. The executor records that as a failed
/// sub-debate and never lets it cancel sibling work.
#[async_trait]
pub trait DebateRunner: Send + Sync {
    /// Runner name, for logs.
    fn name(&self) -> &'static str;

    async fn run_debate(&self, request: DebateRequest) -> DomainResult<SubDebateResult>;
}
