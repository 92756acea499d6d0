pub mod conclusion;
pub mod config;
pub mod debate;
pub mod execution;
pub mod graph;
pub mod pattern;
pub mod quality;
pub mod signal;
pub mod strategy;
pub mod structure;

pub use conclusion::{
    ConclusionInput, ConclusionStatus, FinalConclusion, SupportingEvidence, UnusedResult,
};
pub use config::{
    Config, ContinuationShape, ConvergenceConfig, DebateConfig, ExecutionConfig, LogFormat,
    LoggingConfig, QualityConfig, RotationPolicy, SimilarityMode, StructureConfig,
};
pub use debate::{
    AgentRole, DebateContext, DebateMessage, DebateRequest, DebateRound, DebateState,
    PriorConclusion, RankedOption, StopReason, SubDebateResult, SubDebateStatus,
};
pub use execution::{
    BranchDecision, ExecutionReport, PhaseAggregate, PhaseOutcome, PhaseTransition, Truncation,
};
pub use graph::{EdgeKind, GraphEdge, GraphNode, NodeKind, StructureGraph};
pub use pattern::{PatternScore, PatternType};
pub use quality::{IssueKind, IssueSeverity, QualityAnalysis, QualityIssue};
pub use signal::{DetectionResult, QuestionParameters, Signal, SignalType};
pub use strategy::{StrategyAnalysis, StrategyOverride, StrategyPreview};
pub use structure::{
    BranchCondition, ConditionOperator, DebateStructure, ExecutionMode, Phase, PhaseStatus,
    PhaseType, SubDebate,
};
