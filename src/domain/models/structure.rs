//! Debate structure domain models.
//!
//! A [`DebateStructure`] is an immutable, ordered plan of [`Phase`]s. Each phase
//! owns its [`SubDebate`]s and declares the earlier phases it depends on. The
//! executor only understands this generic shape; pattern-specific topology is
//! encoded entirely by the structure generator.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::pattern::PatternType;
use crate::domain::errors::{DomainError, DomainResult};

// ============================================================================
// Phase types
// ============================================================================

/// What a phase does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    /// Runs its sub-debates.
    Debate,
    /// Evaluates a condition and picks the next phase. Has no debates.
    Branch,
    /// Debates whose job is to merge earlier conclusions.
    Synthesis,
}

/// How sub-debates within a phase are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

/// Comparison operator for branch conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl ConditionOperator {
    /// Apply the operator as `left <op> right`.
    pub fn compare(self, left: f64, right: f64) -> bool {
        match self {
            Self::Gt => left > right,
            Self::Gte => left >= right,
            Self::Lt => left < right,
            Self::Lte => left <= right,
            Self::Eq => (left - right).abs() < f64::EPSILON,
        }
    }
}

impl std::fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Eq => "==",
        };
        f.write_str(symbol)
    }
}

/// Condition evaluated by a branch phase against its dependencies' aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchCondition {
    /// Aggregate field name, e.g. `consensus_score`.
    pub field: String,
    /// Comparison applied as `field <op> value`.
    pub operator: ConditionOperator,
    /// Threshold compared against.
    pub value: f64,
    /// Phase taken when the condition holds.
    pub then_phase: String,
    /// Phase taken otherwise, or when the field is unresolved.
    pub else_phase: String,
}

// ============================================================================
// Sub-debates and phases
// ============================================================================

/// A single debate owned by exactly one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubDebate {
    /// Unique id, `<phase>/<n>` or `<phase>/<name>`.
    pub id: String,
    /// Question put to the agents.
    pub question: String,
    /// Fold the conclusions of the phase's dependencies into the prompt.
    pub inherit_context: bool,
    /// Planning estimate, not a budget.
    pub estimated_cost_usd: f64,
    /// Planning estimate in minutes.
    pub estimated_time_minutes: f64,
    /// Roster forced by a manual override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_experts: Option<Vec<String>>,
}

impl SubDebate {
    /// A sub-debate with no estimates.
    pub fn new(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            inherit_context: false,
            estimated_cost_usd: 0.0,
            estimated_time_minutes: 0.0,
            force_experts: None,
        }
    }

    /// Fold dependency conclusions into this sub-debate's context.
    pub fn inheriting(mut self) -> Self {
        self.inherit_context = true;
        self
    }

    /// Set cost and time estimates.
    pub fn with_estimate(mut self, cost_usd: f64, minutes: f64) -> Self {
        self.estimated_cost_usd = cost_usd;
        self.estimated_time_minutes = minutes;
        self
    }

    /// Force the roster for this sub-debate.
    pub fn with_experts<S: Into<String>>(mut self, experts: impl IntoIterator<Item = S>) -> Self {
        self.force_experts = Some(experts.into_iter().map(Into::into).collect());
        self
    }
}

/// A scheduling unit of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Unique id within the structure.
    pub id: String,
    /// Display name.
    pub name: String,
    /// 1-based position in the structure.
    pub order: usize,
    /// Debate, branch or synthesis.
    #[serde(rename = "type")]
    pub phase_type: PhaseType,
    /// How the phase dispatches its sub-debates.
    pub execution: ExecutionMode,
    /// Phases that must complete first.
    pub depends_on: Vec<String>,
    /// Owned sub-debates. Empty for branch phases.
    pub debates: Vec<SubDebate>,
    /// Set only on branch phases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<BranchCondition>,
}

impl Phase {
    /// A debate phase with no sub-debates yet.
    pub fn debate(id: impl Into<String>, name: impl Into<String>, execution: ExecutionMode) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order: 0,
            phase_type: PhaseType::Debate,
            execution,
            depends_on: Vec::new(),
            debates: Vec::new(),
            condition: None,
        }
    }

    /// A branch phase evaluating `condition`.
    pub fn branch(id: impl Into<String>, condition: BranchCondition) -> Self {
        Self {
            name: "branch".to_string(),
            phase_type: PhaseType::Branch,
            condition: Some(condition),
            ..Self::debate(id, "", ExecutionMode::Sequential)
        }
    }

    /// Mark the phase as the synthesis step.
    pub fn synthesis(mut self) -> Self {
        self.phase_type = PhaseType::Synthesis;
        self
    }

    /// Add dependencies.
    pub fn depends_on<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Add a sub-debate.
    pub fn with_debate(mut self, debate: SubDebate) -> Self {
        self.debates.push(debate);
        self
    }

    /// Whether this is a branch phase.
    pub fn is_branch(&self) -> bool {
        self.phase_type == PhaseType::Branch
    }

    /// Linear sum of the sub-debate cost estimates.
    pub fn estimated_cost_usd(&self) -> f64 {
        self.debates.iter().map(|d| d.estimated_cost_usd).sum()
    }

    /// Linear sum of the sub-debate time estimates.
    pub fn estimated_time_minutes(&self) -> f64 {
        self.debates.iter().map(|d| d.estimated_time_minutes).sum()
    }

    /// Wall-clock estimate: parallel phases take as long as their slowest debate.
    pub fn estimated_wall_minutes(&self) -> f64 {
        match self.execution {
            ExecutionMode::Sequential => self.estimated_time_minutes(),
            ExecutionMode::Parallel => self
                .debates
                .iter()
                .map(|d| d.estimated_time_minutes)
                .fold(0.0, f64::max),
        }
    }
}

// ============================================================================
// Phase status
// ============================================================================

/// Lifecycle of a phase during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Ready,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl PhaseStatus {
    /// Completed, failed or skipped.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

// ============================================================================
// Debate structure
// ============================================================================

/// Ordered, acyclic plan of phases for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateStructure {
    /// Pattern the structure was built for.
    pub pattern: PatternType,
    /// The original question.
    pub question: String,
    /// Phases in plan order.
    pub phases: Vec<Phase>,
}

impl DebateStructure {
    /// An empty structure.
    pub fn new(pattern: PatternType, question: impl Into<String>) -> Self {
        Self {
            pattern,
            question: question.into(),
            phases: Vec::new(),
        }
    }

    /// Append a phase, assigning its order from its position.
    pub fn push_phase(&mut self, mut phase: Phase) {
        phase.order = self.phases.len() + 1;
        self.phases.push(phase);
    }

    /// Phase by id.
    pub fn phase(&self, id: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == id)
    }

    /// Arena index of a phase by id.
    pub fn phase_index(&self, id: &str) -> Option<usize> {
        self.phases.iter().position(|p| p.id == id)
    }

    /// Sub-debates across every phase.
    pub fn debate_count(&self) -> usize {
        self.phases.iter().map(|p| p.debates.len()).sum()
    }

    /// Every sub-debate with its owning phase.
    pub fn sub_debates(&self) -> impl Iterator<Item = (&Phase, &SubDebate)> {
        self.phases
            .iter()
            .flat_map(|p| p.debates.iter().map(move |d| (p, d)))
    }

    /// Linear sum of every phase's cost estimate.
    pub fn estimated_cost_usd(&self) -> f64 {
        self.phases.iter().map(Phase::estimated_cost_usd).sum()
    }

    /// Sum of each phase's wall-clock estimate.
    pub fn estimated_time_minutes(&self) -> f64 {
        self.phases.iter().map(Phase::estimated_wall_minutes).sum()
    }

    /// Force the given experts onto every sub-debate.
    pub fn force_experts(&mut self, experts: &[String]) {
        for phase in &mut self.phases {
            for debate in &mut phase.debates {
                debate.force_experts = Some(experts.to_vec());
            }
        }
    }

    /// Check the structural invariants the executor relies on.
    pub fn validate(&self) -> DomainResult<()> {
        if self.phases.is_empty() {
            return Err(DomainError::InvalidStructure("structure has no phases".into()));
        }

        let mut declared: HashSet<&str> = HashSet::new();
        let mut debate_ids: HashSet<&str> = HashSet::new();

        for phase in &self.phases {
            for dep in &phase.depends_on {
                if !declared.contains(dep.as_str()) {
                    return Err(DomainError::InvalidStructure(format!(
                        "phase '{}' depends on '{}' which is not declared earlier",
                        phase.id, dep
                    )));
                }
            }

            if !declared.insert(phase.id.as_str()) {
                return Err(DomainError::InvalidStructure(format!(
                    "duplicate phase id '{}'",
                    phase.id
                )));
            }

            for debate in &phase.debates {
                if !debate_ids.insert(debate.id.as_str()) {
                    return Err(DomainError::InvalidStructure(format!(
                        "duplicate sub-debate id '{}'",
                        debate.id
                    )));
                }
            }

            match (phase.phase_type, &phase.condition) {
                (PhaseType::Branch, None) => {
                    return Err(DomainError::InvalidStructure(format!(
                        "branch phase '{}' has no condition",
                        phase.id
                    )));
                }
                (PhaseType::Branch, Some(_)) if !phase.debates.is_empty() => {
                    return Err(DomainError::InvalidStructure(format!(
                        "branch phase '{}' must not own sub-debates",
                        phase.id
                    )));
                }
                (PhaseType::Branch, Some(_)) if phase.depends_on.is_empty() => {
                    return Err(DomainError::InvalidStructure(format!(
                        "branch phase '{}' has nothing to evaluate",
                        phase.id
                    )));
                }
                (PhaseType::Debate | PhaseType::Synthesis, _) if phase.debates.is_empty() => {
                    return Err(DomainError::InvalidStructure(format!(
                        "phase '{}' has no sub-debates",
                        phase.id
                    )));
                }
                _ => {}
            }
        }

        // Branch targets must exist and come after the branch.
        for (idx, phase) in self.phases.iter().enumerate() {
            if let Some(cond) = &phase.condition {
                for target in [&cond.then_phase, &cond.else_phase] {
                    match self.phase_index(target) {
                        Some(t) if t > idx => {}
                        Some(_) => {
                            return Err(DomainError::InvalidStructure(format!(
                                "branch '{}' targets '{}' which is not declared after it",
                                phase.id, target
                            )));
                        }
                        None => {
                            return Err(DomainError::InvalidStructure(format!(
                                "branch '{}' targets unknown phase '{}'",
                                phase.id, target
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
