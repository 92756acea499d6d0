//! `agora analyze`: strategy selection without execution.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::{build_orchestrator, phase_kind, QuestionArgs};
use crate::cli::output::{output, table, truncate, CommandOutput};
use crate::domain::models::{Config, ExecutionMode, StrategyAnalysis};

/// Arguments of `agora analyze`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub question: QuestionArgs,
}

#[derive(Debug, Serialize)]
struct SignalRow {
    signal: String,
    strength: f64,
    evidence: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PhaseRow {
    id: String,
    kind: &'static str,
    execution: &'static str,
    depends_on: Vec<String>,
    debates: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AnalyzeOutput {
    question: String,
    pattern: String,
    confidence: f64,
    forced: bool,
    alternatives: Vec<String>,
    signals: Vec<SignalRow>,
    phases: Vec<PhaseRow>,
    estimated_cost_usd: f64,
    estimated_time_minutes: f64,
}

impl From<&StrategyAnalysis> for AnalyzeOutput {
    fn from(analysis: &StrategyAnalysis) -> Self {
        Self {
            question: analysis.structure.question.clone(),
            pattern: analysis.recommended_pattern.to_string(),
            confidence: analysis.confidence,
            forced: analysis.forced,
            alternatives: analysis.alternatives.iter().map(ToString::to_string).collect(),
            signals: analysis
                .signals
                .iter()
                .map(|s| SignalRow {
                    signal: s.signal_type.to_string(),
                    strength: s.strength,
                    evidence: s.evidence.clone(),
                })
                .collect(),
            phases: analysis
                .structure
                .phases
                .iter()
                .map(|p| PhaseRow {
                    id: p.id.clone(),
                    kind: phase_kind(p.phase_type),
                    execution: match p.execution {
                        ExecutionMode::Parallel => "parallel",
                        ExecutionMode::Sequential => "sequential",
                    },
                    depends_on: p.depends_on.clone(),
                    debates: p.debates.iter().map(|d| d.question.clone()).collect(),
                })
                .collect(),
            estimated_cost_usd: analysis.estimated_cost_usd,
            estimated_time_minutes: analysis.estimated_time_minutes,
        }
    }
}

impl CommandOutput for AnalyzeOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Question:   {}", self.question),
            format!(
                "Pattern:    {} ({}confidence {:.2})",
                console::style(&self.pattern).cyan().bold(),
                if self.forced { "forced, " } else { "" },
                self.confidence
            ),
        ];
        if !self.alternatives.is_empty() {
            lines.push(format!("Alternates: {}", self.alternatives.join(", ")));
        }
        lines.push(format!(
            "Estimate:   ${:.2}, {:.0} min",
            self.estimated_cost_usd, self.estimated_time_minutes
        ));

        if !self.signals.is_empty() {
            let mut signals = table(&["Signal", "Strength", "Evidence"]);
            for s in &self.signals {
                signals.add_row(vec![
                    s.signal.clone(),
                    format!("{:.2}", s.strength),
                    truncate(&s.evidence.join(", "), 50),
                ]);
            }
            lines.push(String::new());
            lines.push(signals.to_string());
        }

        let mut phases = table(&["Phase", "Type", "Mode", "Depends on", "Sub-debates"]);
        for p in &self.phases {
            phases.add_row(vec![
                p.id.clone(),
                p.kind.to_string(),
                p.execution.to_string(),
                if p.depends_on.is_empty() {
                    "-".to_string()
                } else {
                    p.depends_on.join(", ")
                },
                p.debates
                    .iter()
                    .map(|d| truncate(d, 60))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ]);
        }
        lines.push(String::new());
        lines.push(phases.to_string());
        lines.join("\n")
    }
}

/// Run `agora analyze`.
pub async fn execute(args: AnalyzeArgs, config: &Config, json_mode: bool) -> Result<()> {
    let orchestrator = build_orchestrator(config);
    let overrides = args.question.overrides()?;
    let analysis = orchestrator.analyze_with_override(&args.question.question, &overrides)?;
    output(&AnalyzeOutput::from(&analysis), json_mode);
    Ok(())
}
