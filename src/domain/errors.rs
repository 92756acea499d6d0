//! Domain errors for the Agora debate orchestration engine.

use thiserror::Error;

/// Domain-level errors that can occur while planning or running debates.
///
/// Only [`DomainError::SignalDetection`], [`DomainError::UnknownPattern`] and
/// [`DomainError::InvalidStructure`] ever reach a caller of the orchestrator.
/// Provider, budget and branch errors are recovered inside the executor and
/// surface as data (failed results, truncated reports, else-branch decisions).
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Signal detection failed: {0}")]
    SignalDetection(String),

    #[error("Provider error in sub-debate {sub_debate_id}: {message}")]
    Provider {
        sub_debate_id: String,
        message: String,
    },

    #[error("Budget exceeded: {0}")]
    BudgetExceeded(String),

    #[error("Branch evaluation failed for phase {phase_id}: {reason}")]
    BranchEvaluation { phase_id: String, reason: String },

    #[error("Invalid debate structure: {0}")]
    InvalidStructure(String),

    #[error("Unknown debate pattern: {0}")]
    UnknownPattern(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Execution cancelled")]
    Cancelled,
}

impl DomainError {
    /// Shorthand for a provider failure attributed to one sub-debate.
    pub fn provider(sub_debate_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            sub_debate_id: sub_debate_id.into(),
            message: message.into(),
        }
    }

    /// Whether the executor recovers from this error locally.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. } | Self::BudgetExceeded(_) | Self::BranchEvaluation { .. } | Self::Cancelled
        )
    }
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::ValidationFailed(err.to_string())
    }
}
