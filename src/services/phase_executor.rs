//! Phase executor: runs a debate structure phase by phase.
//!
//! Phases live in an arena (the structure's phase vector) and the remaining
//! plan is a queue of arena indices. A branch phase resolves to a phase id
//! which is moved to the front of the queue; the branch not taken is marked
//! skipped. Control flow stays a flat loop over the queue.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    BranchDecision, DebateContext, DebateRequest, DebateStructure, ExecutionConfig, ExecutionMode,
    ExecutionReport, Phase, PhaseAggregate, PhaseOutcome, PhaseStatus, PhaseTransition,
    PriorConclusion, SubDebate, SubDebateResult, Truncation,
};
use crate::domain::ports::DebateRunner;
use crate::services::cost_accumulator::{CostAccumulator, CostDelta};

/// Event emitted during execution.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Execution started.
    Started { phase_count: usize, debate_count: usize },
    /// Phase dependencies satisfied and phase dispatched.
    PhaseStarted { phase_id: String, debate_count: usize },
    /// Phase reached a terminal status after running.
    PhaseCompleted { phase_id: String, status: PhaseStatus },
    /// Phase skipped without running.
    PhaseSkipped { phase_id: String, reason: String },
    /// A sub-debate settled with a result.
    SubDebateCompleted {
        phase_id: String,
        sub_debate_id: String,
        consensus_score: f64,
        cost_usd: f64,
    },
    /// A sub-debate failed after its last attempt.
    SubDebateFailed {
        phase_id: String,
        sub_debate_id: String,
        error: String,
    },
    /// A retryable runner error; another attempt follows after the delay.
    SubDebateRetrying {
        sub_debate_id: String,
        attempt: u32,
        max_attempts: u32,
    },
    /// A branch phase picked its next phase.
    BranchResolved(BranchDecision),
    /// A ceiling was hit or cancel was requested; nothing new is dispatched.
    BudgetExceeded(Truncation),
    /// Execution completed.
    Completed { total_cost_usd: f64, truncated: bool },
}

/// Executes debate structures against a [`DebateRunner`].
///
/// The executor holds no per-run state, so one instance can serve concurrent
/// runs. Cancellation is scoped to a run through the token passed in.
pub struct PhaseExecutor {
    runner: Arc<dyn DebateRunner>,
    config: ExecutionConfig,
}

impl PhaseExecutor {
    /// Create an executor dispatching sub-debates to `runner`.
    pub fn new(runner: Arc<dyn DebateRunner>, config: ExecutionConfig) -> Self {
        Self { runner, config }
    }

    /// Retry policy and ceilings applied to every run.
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Execute a structure.
    pub async fn execute(&self, structure: &DebateStructure) -> DomainResult<ExecutionReport> {
        // No listener: every send fails immediately and is ignored.
        let (tx, _) = mpsc::channel(1);
        self.execute_with_events(structure, tx, CancellationToken::new())
            .await
    }

    /// Execute a structure with event streaming.
    ///
    /// Cancelling `cancel` stops dispatching new phases and sub-debates for
    /// this run only. Work already in flight finishes and is recorded.
    pub async fn execute_with_events(
        &self,
        structure: &DebateStructure,
        event_tx: mpsc::Sender<ExecutionEvent>,
        cancel: CancellationToken,
    ) -> DomainResult<ExecutionReport> {
        structure.validate()?;

        let mut run = RunState::new(structure, &self.config, cancel);
        let mut plan: VecDeque<usize> = (0..structure.phases.len()).collect();

        info!(
            pattern = %structure.pattern,
            phases = structure.phases.len(),
            debates = structure.debate_count(),
            runner = self.runner.name(),
            "Starting debate execution"
        );
        let _ = event_tx
            .send(ExecutionEvent::Started {
                phase_count: structure.phases.len(),
                debate_count: structure.debate_count(),
            })
            .await;

        while let Some(idx) = plan.pop_front() {
            if run.statuses[idx].is_terminal() {
                continue;
            }
            let phase = &structure.phases[idx];

            if run.truncation.is_none() {
                if let Some(truncation) = run.stop_signal() {
                    self.truncate(&mut run, truncation, &event_tx).await;
                }
            }
            if let Some(truncation) = &run.truncation {
                let reason = truncation.to_string();
                run.skip(idx, &reason);
                send_skipped(&event_tx, phase, reason).await;
                continue;
            }

            match run.blocking_dependency(idx) {
                Some(Blocker::Unfinished(dep)) => {
                    // A spliced phase can reach the front ahead of a dependency.
                    if let Some(pos) = plan.iter().position(|&p| p == dep) {
                        plan.insert(pos + 1, idx);
                        continue;
                    }
                    let reason = format!(
                        "dependency '{}' never ran",
                        structure.phases[dep].id
                    );
                    run.skip(idx, &reason);
                    send_skipped(&event_tx, phase, reason).await;
                    continue;
                }
                Some(Blocker::Terminal(dep, status)) => {
                    let reason = format!("dependency '{}' {status}", structure.phases[dep].id);
                    run.skip(idx, &reason);
                    send_skipped(&event_tx, phase, reason).await;
                    continue;
                }
                None => run.transition(idx, PhaseStatus::Ready),
            }

            run.transition(idx, PhaseStatus::Running);
            info!(phase_id = %phase.id, debates = phase.debates.len(), "Phase started");
            let _ = event_tx
                .send(ExecutionEvent::PhaseStarted {
                    phase_id: phase.id.clone(),
                    debate_count: phase.debates.len(),
                })
                .await;

            if phase.is_branch() {
                let (outcome, decision) = resolve_branch(phase, &run)?;
                run.finish(idx, outcome);
                let _ = event_tx
                    .send(ExecutionEvent::PhaseCompleted {
                        phase_id: phase.id.clone(),
                        status: PhaseStatus::Completed,
                    })
                    .await;

                let chosen = run.index_of(&decision.chosen_phase_id)?;
                let not_taken = run.index_of(&decision.skipped_phase_id)?;
                plan.retain(|&p| p != chosen);
                plan.push_front(chosen);
                if !run.statuses[not_taken].is_terminal() {
                    let reason = format!(
                        "branch '{}' chose '{}'",
                        decision.branch_phase_id, decision.chosen_phase_id
                    );
                    run.skip(not_taken, &reason);
                    send_skipped(&event_tx, &structure.phases[not_taken], reason).await;
                }

                info!(
                    branch = %decision.branch_phase_id,
                    chosen = %decision.chosen_phase_id,
                    condition_met = decision.condition_met,
                    "Branch resolved"
                );
                run.decisions.push(decision.clone());
                let _ = event_tx.send(ExecutionEvent::BranchResolved(decision)).await;
                continue;
            }

            let outcome = self.run_phase(phase, &mut run, &event_tx).await;
            let status = outcome.status;
            info!(
                phase_id = %phase.id,
                status = %status,
                completed = outcome.aggregate.completed,
                failed = outcome.aggregate.failed,
                total_cost_usd = run.accumulator.total_cost_usd(),
                "Phase finished"
            );
            run.finish(idx, outcome);
            let _ = event_tx
                .send(ExecutionEvent::PhaseCompleted {
                    phase_id: phase.id.clone(),
                    status,
                })
                .await;
        }

        let report = run.into_report();
        info!(
            total_cost_usd = report.total_cost_usd,
            elapsed_ms = report.elapsed.as_millis() as u64,
            truncated = report.is_truncated(),
            "Debate execution finished"
        );
        let _ = event_tx
            .send(ExecutionEvent::Completed {
                total_cost_usd: report.total_cost_usd,
                truncated: report.is_truncated(),
            })
            .await;
        Ok(report)
    }

    async fn truncate(
        &self,
        run: &mut RunState<'_>,
        truncation: Truncation,
        event_tx: &mpsc::Sender<ExecutionEvent>,
    ) {
        match &truncation {
            Truncation::Cancelled => warn!("Execution cancelled, skipping remaining work"),
            other => warn!(
                error = %DomainError::BudgetExceeded(other.to_string()),
                "Ceiling reached, skipping remaining work"
            ),
        }
        let _ = event_tx
            .send(ExecutionEvent::BudgetExceeded(truncation.clone()))
            .await;
        run.truncation = Some(truncation);
    }

    async fn run_phase(
        &self,
        phase: &Phase,
        run: &mut RunState<'_>,
        event_tx: &mpsc::Sender<ExecutionEvent>,
    ) -> PhaseOutcome {
        let inherited = run.dependency_context(phase);

        let results = match phase.execution {
            ExecutionMode::Parallel => {
                let dispatched = phase.debates.iter().map(|debate| {
                    let context = if debate.inherit_context {
                        inherited.clone()
                    } else {
                        DebateContext::default()
                    };
                    self.run_sub_debate(&phase.id, debate, context, event_tx)
                });
                let results = join_all(dispatched).await;
                run.accumulator
                    .fold_in(results.iter().map(CostDelta::from_result));
                results
            }
            ExecutionMode::Sequential => {
                let mut results: Vec<SubDebateResult> = Vec::with_capacity(phase.debates.len());
                for debate in &phase.debates {
                    if run.truncation.is_none() {
                        if let Some(truncation) = run.stop_signal() {
                            self.truncate(run, truncation, event_tx).await;
                        }
                    }
                    if let Some(truncation) = &run.truncation {
                        results.push(SubDebateResult::skipped(&debate.id, truncation.to_string()));
                        continue;
                    }

                    let context = if debate.inherit_context {
                        let mut context = inherited.clone();
                        context.prior_conclusions.extend(
                            results
                                .iter()
                                .filter(|r| r.is_completed())
                                .map(PriorConclusion::from_result),
                        );
                        context
                    } else {
                        DebateContext::default()
                    };
                    let result = self.run_sub_debate(&phase.id, debate, context, event_tx).await;
                    run.accumulator.fold_in([CostDelta::from_result(&result)]);
                    results.push(result);
                }
                results
            }
        };

        let aggregate = PhaseAggregate::from_results(&results);
        let status = if aggregate.completed > 0 {
            PhaseStatus::Completed
        } else if aggregate.failed > 0 {
            PhaseStatus::Failed
        } else {
            PhaseStatus::Skipped
        };
        let skip_reason = (status == PhaseStatus::Skipped)
            .then(|| run.truncation.as_ref().map(ToString::to_string))
            .flatten();

        PhaseOutcome {
            phase_id: phase.id.clone(),
            status,
            results,
            aggregate,
            skip_reason,
            branch: None,
        }
    }

    async fn run_sub_debate(
        &self,
        phase_id: &str,
        debate: &SubDebate,
        context: DebateContext,
        event_tx: &mpsc::Sender<ExecutionEvent>,
    ) -> SubDebateResult {
        let request = DebateRequest::new(&debate.id, &debate.question)
            .with_context(context)
            .with_forced_experts(debate.force_experts.clone());

        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 0;

        let mut result = loop {
            attempt += 1;
            match self.runner.run_debate(request.clone()).await {
                Ok(result) => break result,
                Err(e @ DomainError::Provider { .. }) if attempt < max_attempts => {
                    warn!(
                        sub_debate_id = %debate.id,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Sub-debate failed, retrying"
                    );
                    let _ = event_tx
                        .send(ExecutionEvent::SubDebateRetrying {
                            sub_debate_id: debate.id.clone(),
                            attempt,
                            max_attempts,
                        })
                        .await;
                    sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
                Err(e) => {
                    warn!(sub_debate_id = %debate.id, attempt, error = %e, "Sub-debate failed");
                    break SubDebateResult::failed(&debate.id, e.to_string());
                }
            }
        };
        result.sub_debate_id.clone_from(&debate.id);

        let event = if result.is_completed() {
            debug!(
                sub_debate_id = %debate.id,
                consensus = result.consensus_score,
                cost_usd = result.cost_usd,
                "Sub-debate settled"
            );
            ExecutionEvent::SubDebateCompleted {
                phase_id: phase_id.to_string(),
                sub_debate_id: debate.id.clone(),
                consensus_score: result.consensus_score,
                cost_usd: result.cost_usd,
            }
        } else {
            ExecutionEvent::SubDebateFailed {
                phase_id: phase_id.to_string(),
                sub_debate_id: debate.id.clone(),
                error: result.error.clone().unwrap_or_default(),
            }
        };
        let _ = event_tx.send(event).await;
        result
    }
}

async fn send_skipped(event_tx: &mpsc::Sender<ExecutionEvent>, phase: &Phase, reason: String) {
    info!(phase_id = %phase.id, reason = %reason, "Phase skipped");
    let _ = event_tx
        .send(ExecutionEvent::PhaseSkipped {
            phase_id: phase.id.clone(),
            reason,
        })
        .await;
}

/// Evaluate a branch against the combined aggregate of its dependencies.
/// An unresolvable field takes the else branch.
fn resolve_branch(phase: &Phase, run: &RunState<'_>) -> DomainResult<(PhaseOutcome, BranchDecision)> {
    let condition = phase.condition.as_ref().ok_or_else(|| {
        DomainError::InvalidStructure(format!("branch phase '{}' has no condition", phase.id))
    })?;

    let aggregate = run.dependency_aggregate(phase);
    let observed = aggregate.field(&condition.field);

    let (condition_met, fallback_reason) = match observed {
        Some(value) => (condition.operator.compare(value, condition.value), None),
        None => {
            let err = DomainError::BranchEvaluation {
                phase_id: phase.id.clone(),
                reason: format!("field '{}' is missing or not numeric", condition.field),
            };
            warn!(error = %err, else_phase = %condition.else_phase, "Taking else branch");
            (false, Some(err.to_string()))
        }
    };

    let (chosen, skipped) = if condition_met {
        (&condition.then_phase, &condition.else_phase)
    } else {
        (&condition.else_phase, &condition.then_phase)
    };
    debug!(
        branch = %phase.id,
        field = %condition.field,
        observed = ?observed,
        operator = %condition.operator,
        threshold = condition.value,
        "Evaluated branch condition"
    );

    let decision = BranchDecision {
        branch_phase_id: phase.id.clone(),
        chosen_phase_id: chosen.clone(),
        skipped_phase_id: skipped.clone(),
        observed_value: observed,
        condition_met,
        fallback_reason,
    };

    let outcome = PhaseOutcome {
        phase_id: phase.id.clone(),
        status: PhaseStatus::Completed,
        results: Vec::new(),
        aggregate,
        skip_reason: None,
        branch: Some(decision.clone()),
    };
    Ok((outcome, decision))
}

enum Blocker {
    /// Dependency has not reached a terminal status yet.
    Unfinished(usize),
    /// Dependency ended failed or skipped.
    Terminal(usize, PhaseStatus),
}

/// Mutable state of one execution.
struct RunState<'s> {
    structure: &'s DebateStructure,
    index: HashMap<&'s str, usize>,
    statuses: Vec<PhaseStatus>,
    outcomes: Vec<Option<PhaseOutcome>>,
    order: Vec<usize>,
    timeline: Vec<PhaseTransition>,
    decisions: Vec<BranchDecision>,
    accumulator: CostAccumulator,
    truncation: Option<Truncation>,
    cancel: CancellationToken,
}

impl<'s> RunState<'s> {
    fn new(structure: &'s DebateStructure, config: &ExecutionConfig, cancel: CancellationToken) -> Self {
        let n = structure.phases.len();
        Self {
            structure,
            index: structure
                .phases
                .iter()
                .enumerate()
                .map(|(i, p)| (p.id.as_str(), i))
                .collect(),
            statuses: vec![PhaseStatus::Pending; n],
            outcomes: vec![None; n],
            order: Vec::with_capacity(n),
            timeline: Vec::new(),
            decisions: Vec::new(),
            accumulator: CostAccumulator::new(config),
            truncation: None,
            cancel,
        }
    }

    fn stop_signal(&self) -> Option<Truncation> {
        if self.cancel.is_cancelled() {
            return Some(Truncation::Cancelled);
        }
        self.accumulator.breached_ceiling()
    }

    fn index_of(&self, id: &str) -> DomainResult<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| DomainError::InvalidStructure(format!("unknown phase '{id}'")))
    }

    fn transition(&mut self, idx: usize, status: PhaseStatus) {
        self.statuses[idx] = status;
        self.timeline.push(PhaseTransition {
            phase_id: self.structure.phases[idx].id.clone(),
            status,
        });
    }

    fn finish(&mut self, idx: usize, outcome: PhaseOutcome) {
        self.transition(idx, outcome.status);
        self.outcomes[idx] = Some(outcome);
        self.order.push(idx);
    }

    /// Record a phase as skipped. Its sub-debates are recorded as skipped too
    /// so every planned sub-debate appears in the report.
    fn skip(&mut self, idx: usize, reason: &str) {
        let phase = &self.structure.phases[idx];
        let mut outcome = PhaseOutcome::skipped(&phase.id, reason);
        outcome.results = phase
            .debates
            .iter()
            .map(|d| SubDebateResult::skipped(&d.id, reason))
            .collect();
        self.finish(idx, outcome);
    }

    fn blocking_dependency(&self, idx: usize) -> Option<Blocker> {
        self.structure.phases[idx]
            .depends_on
            .iter()
            .filter_map(|dep| self.index.get(dep.as_str()).copied())
            .find_map(|dep| match self.statuses[dep] {
                PhaseStatus::Completed => None,
                status @ (PhaseStatus::Failed | PhaseStatus::Skipped) => {
                    Some(Blocker::Terminal(dep, status))
                }
                _ => Some(Blocker::Unfinished(dep)),
            })
    }

    /// Phases whose results feed `phase`. Branch dependencies are looked
    /// through to the phases they evaluated.
    fn sources(&self, phase: &Phase) -> Vec<usize> {
        let mut sources = Vec::new();
        let mut stack: Vec<&str> = phase.depends_on.iter().rev().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            let Some(&idx) = self.index.get(id) else {
                continue;
            };
            let dep = &self.structure.phases[idx];
            if dep.is_branch() {
                stack.extend(dep.depends_on.iter().rev().map(String::as_str));
            } else if !sources.contains(&idx) {
                sources.push(idx);
            }
        }
        sources
    }

    fn dependency_context(&self, phase: &Phase) -> DebateContext {
        let prior_conclusions = self
            .sources(phase)
            .into_iter()
            .filter_map(|idx| self.outcomes[idx].as_ref())
            .flat_map(|o| o.results.iter())
            .filter(|r| r.is_completed())
            .map(PriorConclusion::from_result)
            .collect();
        DebateContext { prior_conclusions }
    }

    fn dependency_aggregate(&self, phase: &Phase) -> PhaseAggregate {
        let parts: Vec<&PhaseAggregate> = phase
            .depends_on
            .iter()
            .filter_map(|dep| self.index.get(dep.as_str()))
            .filter_map(|&idx| self.outcomes[idx].as_ref())
            .map(|o| &o.aggregate)
            .collect();
        PhaseAggregate::combine(&parts)
    }

    fn into_report(mut self) -> ExecutionReport {
        let outcomes = self
            .order
            .iter()
            .filter_map(|&idx| self.outcomes[idx].take())
            .collect();
        ExecutionReport {
            outcomes,
            timeline: self.timeline,
            branch_decisions: self.decisions,
            total_cost_usd: self.accumulator.total_cost_usd(),
            elapsed: self.accumulator.elapsed(),
            truncation: self.truncation,
        }
    }
}
