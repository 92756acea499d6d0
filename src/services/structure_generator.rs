//! Structure generation: one phase-shape builder per pattern.
//!
//! Builders only lay out phases and sub-debates. All pattern-specific topology
//! lives here so the executor can stay pattern-agnostic.

use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    BranchCondition, ConditionOperator, ContinuationShape, DebateStructure, ExecutionMode, Phase,
    PatternType, QuestionParameters, StructureConfig, SubDebate,
};

/// Phase a conditional structure takes when consensus is high.
pub const THEN_PHASE_ID: &str = "conclude";
/// Phase a conditional structure takes otherwise.
pub const ELSE_PHASE_ID: &str = "deepen";

/// Builds the phase structure for a pattern.
#[derive(Debug, Clone, Default)]
pub struct StructureGenerator {
    config: StructureConfig,
}

impl StructureGenerator {
    /// A generator using `config` for defaults and estimates.
    pub fn new(config: StructureConfig) -> Self {
        Self { config }
    }

    /// Build and validate the structure for `pattern`.
    pub fn generate(
        &self,
        pattern: PatternType,
        params: &QuestionParameters,
    ) -> DomainResult<DebateStructure> {
        let mut builder = Builder::new(&self.config, pattern, &params.question);

        match pattern {
            PatternType::Simple => builder.simple(),
            PatternType::Sequential => builder.sequential(&params.factors),
            PatternType::Parallel => builder.parallel(&params.factors),
            PatternType::Tournament => builder.tournament(&params.options),
            PatternType::Adversarial => builder.adversarial(),
            PatternType::Iterative => builder.iterative(),
            PatternType::Ensemble => builder.ensemble(),
            PatternType::Hierarchical => builder.hierarchical(&params.factors),
            PatternType::Conditional => builder.conditional(&params.factors),
        }

        let structure = builder.finish();
        structure.validate()?;

        debug!(
            pattern = %pattern,
            phases = structure.phases.len(),
            debates = structure.debate_count(),
            "Generated debate structure"
        );
        Ok(structure)
    }
}

struct Builder<'a> {
    config: &'a StructureConfig,
    question: &'a str,
    structure: DebateStructure,
}

impl<'a> Builder<'a> {
    fn new(config: &'a StructureConfig, pattern: PatternType, question: &'a str) -> Self {
        Self {
            config,
            question,
            structure: DebateStructure::new(pattern, question),
        }
    }

    fn finish(self) -> DebateStructure {
        self.structure
    }

    fn debate(&self, id: String, question: String) -> SubDebate {
        SubDebate::new(id, question)
            .with_estimate(self.config.cost_per_debate_usd, self.config.minutes_per_debate)
    }

    fn push(&mut self, phase: Phase) {
        self.structure.push_phase(phase);
    }

    /// Factors from the question, or the configured fallback list.
    fn or_default<'b>(factors: &'b [String], fallback: &'b [String]) -> &'b [String] {
        if factors.is_empty() {
            fallback
        } else {
            factors
        }
    }

    fn simple(&mut self) {
        let phase = Phase::debate("main", "main", ExecutionMode::Sequential)
            .with_debate(self.debate("main/1".into(), self.question.to_string()));
        self.push(phase);
    }

    fn sequential(&mut self, factors: &[String]) {
        let stages = Self::or_default(factors, &self.config.default_stages).to_vec();
        let n = stages.len();
        let mut previous: Option<String> = None;

        for (i, stage) in stages.iter().enumerate() {
            let id = format!("stage-{}", i + 1);
            let mut debate = self.debate(
                format!("{id}/1"),
                format!("{} (stage {} of {n}: {stage})", self.question, i + 1),
            );
            if previous.is_some() {
                debate = debate.inheriting();
            }
            let phase = Phase::debate(&id, stage.as_str(), ExecutionMode::Sequential)
                .depends_on(previous.take())
                .with_debate(debate);
            self.push(phase);
            previous = Some(id);
        }
    }

    fn parallel(&mut self, factors: &[String]) {
        let dimensions = Self::or_default(factors, &self.config.default_dimensions).to_vec();
        let mut phase = Phase::debate("dimensions", "dimensions", ExecutionMode::Parallel);
        for (i, dimension) in dimensions.iter().enumerate() {
            phase = phase.with_debate(self.debate(
                format!("dimensions/{}", i + 1),
                format!("{} (dimension: {dimension})", self.question),
            ));
        }
        self.push(phase);
    }

    fn tournament(&mut self, options: &[String]) {
        if options.len() < 2 {
            // Nothing to pair: a single open debate on the question.
            let phase = Phase::debate("round-1", "round 1", ExecutionMode::Parallel)
                .with_debate(self.debate("round-1/1".into(), self.question.to_string()));
            self.push(phase);
            return;
        }

        let mut round = Phase::debate("round-1", "round 1", ExecutionMode::Parallel);
        for (i, pair) in options.chunks(2).enumerate() {
            let question = match pair {
                [a, b] => format!("{} Compare '{a}' against '{b}'.", self.question),
                [a] => format!("{} Assess '{a}' as a finalist.", self.question),
                _ => continue,
            };
            round = round.with_debate(self.debate(format!("round-1/{}", i + 1), question));
        }
        self.push(round);

        if options.len() > 2 {
            let final_phase = Phase::debate("final", "final", ExecutionMode::Sequential)
                .depends_on(["round-1"])
                .with_debate(
                    self.debate(
                        "final/1".into(),
                        format!("{} Choose among the round 1 winners.", self.question),
                    )
                    .inheriting(),
                );
            self.push(final_phase);
        }
    }

    fn adversarial(&mut self) {
        let arguments = Phase::debate("arguments", "arguments", ExecutionMode::Parallel)
            .with_debate(
                self.debate(
                    "arguments/defender".into(),
                    format!("Make the strongest case for: {}", self.question),
                )
                .with_experts(["optimist"]),
            )
            .with_debate(
                self.debate(
                    "arguments/attacker".into(),
                    format!("Expose the weaknesses and risks of: {}", self.question),
                )
                .with_experts(["critic"]),
            );
        self.push(arguments);

        let judge = Phase::debate("judge", "judge", ExecutionMode::Sequential)
            .depends_on(["arguments"])
            .with_debate(
                self.debate(
                    "judge/1".into(),
                    format!("Weigh the defence against the attack and decide: {}", self.question),
                )
                .inheriting()
                .with_experts(["analyst", "synthesizer"]),
            );
        self.push(judge);
    }

    fn iterative(&mut self) {
        let initial = Phase::debate("initial", "initial", ExecutionMode::Sequential)
            .with_debate(self.debate("initial/1".into(), self.question.to_string()));
        self.push(initial);

        let mut previous = "initial".to_string();
        for pass in 1..=self.config.refinement_passes.max(1) {
            let id = format!("refine-{pass}");
            let phase = Phase::debate(&id, "refine", ExecutionMode::Sequential)
                .depends_on([previous.clone()])
                .with_debate(
                    self.debate(
                        format!("{id}/1"),
                        format!("Refine the previous conclusion: {}", self.question),
                    )
                    .inheriting(),
                );
            self.push(phase);
            previous = id;
        }
    }

    fn ensemble(&mut self) {
        let perspectives = self.config.ensemble_perspectives.clone();
        let mut phase = Phase::debate("perspectives", "perspectives", ExecutionMode::Parallel);
        for perspective in &perspectives {
            phase = phase.with_debate(self.debate(
                format!("perspectives/{perspective}"),
                format!("{} (perspective: {perspective})", self.question),
            ));
        }
        self.push(phase);
    }

    fn hierarchical(&mut self, factors: &[String]) {
        let overview = Phase::debate("overview", "overview", ExecutionMode::Sequential)
            .with_debate(self.debate("overview/1".into(), format!("Overview: {}", self.question)));
        self.push(overview);

        if factors.is_empty() {
            return;
        }

        let mut drilldown = Phase::debate("drilldown", "drilldown", ExecutionMode::Parallel)
            .depends_on(["overview"]);
        for (i, factor) in factors.iter().enumerate() {
            drilldown = drilldown.with_debate(
                self.debate(
                    format!("drilldown/{}", i + 1),
                    format!("{} (drill-down: {factor})", self.question),
                )
                .inheriting(),
            );
        }
        self.push(drilldown);
    }

    fn conditional(&mut self, factors: &[String]) {
        let explore = Phase::debate("explore", "explore", ExecutionMode::Sequential)
            .with_debate(self.debate("explore/1".into(), self.question.to_string()));
        self.push(explore);

        let condition = BranchCondition {
            field: self.config.branch_field.clone(),
            operator: ConditionOperator::Gte,
            value: self.config.branch_threshold,
            then_phase: THEN_PHASE_ID.to_string(),
            else_phase: ELSE_PHASE_ID.to_string(),
        };
        self.push(Phase::branch("branch", condition).depends_on(["explore"]));

        let then_phase = self.continuation(THEN_PHASE_ID, self.config.then_shape, factors);
        let else_phase = self.continuation(ELSE_PHASE_ID, self.config.else_shape, factors);
        self.push(then_phase);
        self.push(else_phase);
    }

    fn continuation(&self, id: &str, shape: ContinuationShape, factors: &[String]) -> Phase {
        match shape {
            ContinuationShape::Conclusion => Phase::debate(id, id, ExecutionMode::Sequential)
                .synthesis()
                .depends_on(["branch"])
                .with_debate(
                    self.debate(format!("{id}/1"), format!("Conclude: {}", self.question))
                        .inheriting(),
                ),
            ContinuationShape::Refinement => Phase::debate(id, id, ExecutionMode::Sequential)
                .depends_on(["branch"])
                .with_debate(
                    self.debate(
                        format!("{id}/1"),
                        format!("Surface the open disagreements on: {}", self.question),
                    )
                    .inheriting(),
                )
                .with_debate(
                    self.debate(
                        format!("{id}/2"),
                        format!("Resolve the disagreements and decide: {}", self.question),
                    )
                    .inheriting(),
                ),
            ContinuationShape::Drilldown => {
                let dimensions = Self::or_default(factors, &self.config.default_dimensions);
                let mut phase =
                    Phase::debate(id, id, ExecutionMode::Parallel).depends_on(["branch"]);
                for (i, dimension) in dimensions.iter().enumerate() {
                    phase = phase.with_debate(
                        self.debate(
                            format!("{id}/{}", i + 1),
                            format!("{} (drill-down: {dimension})", self.question),
                        )
                        .inheriting(),
                    );
                }
                phase
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PhaseType;

    fn params(options: &[&str], factors: &[&str]) -> QuestionParameters {
        QuestionParameters {
            question: "Where should we expand?".into(),
            options: options.iter().map(|s| s.to_string()).collect(),
            factors: factors.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn generate(pattern: PatternType, p: &QuestionParameters) -> DebateStructure {
        StructureGenerator::default().generate(pattern, p).unwrap()
    }

    #[test]
    fn test_simple_is_one_debate() {
        let s = generate(PatternType::Simple, &params(&[], &[]));
        assert_eq!(s.phases.len(), 1);
        assert_eq!(s.debate_count(), 1);
    }

    #[test]
    fn test_tournament_four_options() {
        let s = generate(PatternType::Tournament, &params(&["a", "b", "c", "d"], &[]));
        assert_eq!(s.phases.len(), 2);
        assert_eq!(s.phases[0].debates.len(), 2);
        assert_eq!(s.phases[0].execution, ExecutionMode::Parallel);
        assert_eq!(s.phases[1].depends_on, vec!["round-1"]);
        assert!(s.phases[1].debates[0].inherit_context);
    }

    #[test]
    fn test_tournament_three_options() {
        let s = generate(PatternType::Tournament, &params(&["a", "b", "c"], &[]));
        assert_eq!(s.phases[0].debates.len(), 2);
        assert!(s.phases[0].debates[1].question.contains("finalist"));
        assert_eq!(s.phases.len(), 2);
    }

    #[test]
    fn test_tournament_two_options_has_no_final() {
        let s = generate(PatternType::Tournament, &params(&["a", "b"], &[]));
        assert_eq!(s.phases.len(), 1);
        assert_eq!(s.phases[0].debates.len(), 1);
    }

    #[test]
    fn test_sequential_inherits_after_first() {
        let s = generate(PatternType::Sequential, &params(&[], &["cost", "talent", "law"]));
        assert_eq!(s.phases.len(), 3);
        assert!(!s.phases[0].debates[0].inherit_context);
        assert!(s.phases[2].debates[0].inherit_context);
        assert_eq!(s.phases[2].depends_on, vec!["stage-2"]);
    }

    #[test]
    fn test_parallel_falls_back_to_default_dimensions() {
        let s = generate(PatternType::Parallel, &params(&[], &[]));
        assert_eq!(s.phases.len(), 1);
        assert_eq!(s.debate_count(), 3);
        assert!(s.phases[0].depends_on.is_empty());
    }

    #[test]
    fn test_adversarial_forces_roles() {
        let s = generate(PatternType::Adversarial, &params(&[], &[]));
        let args = s.phase("arguments").unwrap();
        assert_eq!(args.debates[0].force_experts.as_deref(), Some(&["optimist".to_string()][..]));
        assert_eq!(args.debates[1].force_experts.as_deref(), Some(&["critic".to_string()][..]));
        let judge = s.phase("judge").unwrap();
        assert_eq!(judge.debates[0].force_experts.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_hierarchical_without_factors_has_only_overview() {
        let s = generate(PatternType::Hierarchical, &params(&[], &[]));
        assert_eq!(s.phases.len(), 1);
        let s = generate(PatternType::Hierarchical, &params(&[], &["a", "b"]));
        assert_eq!(s.phase("drilldown").unwrap().debates.len(), 2);
    }

    #[test]
    fn test_conditional_branch_shape() {
        let s = generate(PatternType::Conditional, &params(&[], &[]));
        let branch = s.phase("branch").unwrap();
        assert_eq!(branch.phase_type, PhaseType::Branch);
        assert!(branch.debates.is_empty());
        let cond = branch.condition.as_ref().unwrap();
        assert_eq!(cond.field, "consensus_score");
        assert!((cond.value - 0.7).abs() < f64::EPSILON);
        assert_eq!(s.phase(THEN_PHASE_ID).unwrap().phase_type, PhaseType::Synthesis);
        assert_eq!(s.phase(ELSE_PHASE_ID).unwrap().debates.len(), 2);
    }

    #[test]
    fn test_conditional_shapes_are_configurable() {
        let config = StructureConfig {
            else_shape: ContinuationShape::Drilldown,
            ..Default::default()
        };
        let s = StructureGenerator::new(config)
            .generate(PatternType::Conditional, &params(&[], &["x", "y"]))
            .unwrap();
        let deepen = s.phase(ELSE_PHASE_ID).unwrap();
        assert_eq!(deepen.execution, ExecutionMode::Parallel);
        assert_eq!(deepen.debates.len(), 2);
    }

    #[test]
    fn test_estimates_are_linear() {
        let s = generate(PatternType::Ensemble, &params(&[], &[]));
        assert!((s.estimated_cost_usd() - 0.45).abs() < 1e-9);
        // Parallel phase: wall time is the slowest debate.
        assert!((s.estimated_time_minutes() - 3.0).abs() < 1e-9);
    }
}
