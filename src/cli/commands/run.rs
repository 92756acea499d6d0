//! `agora run`: analyze, execute, and synthesize.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{build_orchestrator, QuestionArgs};
use crate::cli::output::{create_spinner, output, table, truncate, CommandOutput};
use crate::domain::models::{BranchDecision, Config, FinalConclusion};
use crate::services::orchestrator::OrchestrationResult;
use crate::services::phase_executor::ExecutionEvent;

/// Arguments of `agora run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub question: QuestionArgs,

    /// Cost ceiling for the whole debate (USD)
    #[arg(long)]
    pub max_cost: Option<f64>,

    /// Wall-clock ceiling for the whole debate (seconds)
    #[arg(long)]
    pub max_duration: Option<u64>,

    /// Include every round transcript in JSON output
    #[arg(long)]
    pub transcripts: bool,
}

#[derive(Debug, Serialize)]
struct PhaseRow {
    phase_id: String,
    status: String,
    completed: usize,
    failed: usize,
    cost_usd: f64,
    note: Option<String>,
}

#[derive(Debug, Serialize)]
struct RunOutput {
    conclusion: FinalConclusion,
    phases: Vec<PhaseRow>,
    branch_decisions: Vec<BranchDecision>,
    elapsed_secs: f64,
    truncation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcripts: Option<serde_json::Value>,
}

impl RunOutput {
    fn new(result: &OrchestrationResult, with_transcripts: bool) -> Self {
        let report = &result.report;
        Self {
            conclusion: result.conclusion.clone(),
            phases: report
                .outcomes
                .iter()
                .map(|o| PhaseRow {
                    phase_id: o.phase_id.clone(),
                    status: o.status.to_string(),
                    completed: o.aggregate.completed,
                    failed: o.aggregate.failed,
                    cost_usd: o.aggregate.cost_usd,
                    note: o
                        .skip_reason
                        .clone()
                        .or_else(|| o.branch.as_ref().map(|b| format!("-> {}", b.chosen_phase_id))),
                })
                .collect(),
            branch_decisions: report.branch_decisions.clone(),
            elapsed_secs: report.elapsed.as_secs_f64(),
            truncation: report.truncation.as_ref().map(ToString::to_string),
            transcripts: with_transcripts.then(|| {
                let by_debate: serde_json::Map<String, serde_json::Value> = report
                    .all_results()
                    .map(|(_, r)| {
                        (
                            r.sub_debate_id.clone(),
                            serde_json::to_value(&r.transcript).unwrap_or_default(),
                        )
                    })
                    .collect();
                serde_json::Value::Object(by_debate)
            }),
        }
    }
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let c = &self.conclusion;
        let status = if c.is_complete() {
            console::style("COMPLETE").green().bold().to_string()
        } else {
            console::style("INCOMPLETE").red().bold().to_string()
        };

        let mut lines = vec![
            format!("Question: {}", c.question),
            format!("Pattern:  {}   Status: {status}", c.pattern),
        ];
        match &c.recommendation {
            Some(top) => lines.push(format!(
                "Recommendation: {} (confidence {:.2})",
                console::style(top).cyan().bold(),
                c.confidence
            )),
            None => lines.push("Recommendation: none".to_string()),
        }
        if let Some(reason) = &self.truncation {
            lines.push(format!("Stopped early: {reason}"));
        }

        if !c.ranking.is_empty() {
            let mut ranking = table(&["#", "Option", "Score"]);
            for (i, option) in c.ranking.iter().enumerate() {
                ranking.add_row(vec![
                    (i + 1).to_string(),
                    option.option.clone(),
                    format!("{:.2}", option.score),
                ]);
            }
            lines.push(String::new());
            lines.push(ranking.to_string());
        }

        let mut phases = table(&["Phase", "Status", "Completed", "Failed", "Cost", "Note"]);
        for p in &self.phases {
            phases.add_row(vec![
                p.phase_id.clone(),
                p.status.clone(),
                p.completed.to_string(),
                p.failed.to_string(),
                format!("${:.4}", p.cost_usd),
                p.note.as_deref().map(|n| truncate(n, 40)).unwrap_or_default(),
            ]);
        }
        lines.push(String::new());
        lines.push(phases.to_string());

        if !c.not_used.is_empty() {
            lines.push(String::new());
            lines.push("Not used in the final decision:".to_string());
            for unused in &c.not_used {
                lines.push(format!("  {} ({})", unused.sub_debate_id, unused.reason));
            }
        }

        lines.push(String::new());
        lines.push(c.narrative.clone());
        lines.push(format!(
            "Cost: ${:.4} over {} rounds in {:.1}s",
            c.total_cost_usd, c.total_rounds, self.elapsed_secs
        ));
        lines.join("\n")
    }
}

fn describe(event: &ExecutionEvent) -> Option<String> {
    match event {
        ExecutionEvent::PhaseStarted { phase_id, debate_count } => {
            Some(format!("Phase {phase_id}: {debate_count} sub-debate(s)"))
        }
        ExecutionEvent::SubDebateCompleted { sub_debate_id, consensus_score, .. } => {
            Some(format!("{sub_debate_id} settled (consensus {consensus_score:.2})"))
        }
        ExecutionEvent::SubDebateRetrying { sub_debate_id, attempt, max_attempts } => {
            Some(format!("{sub_debate_id} retrying ({attempt}/{max_attempts})"))
        }
        ExecutionEvent::BranchResolved(decision) => {
            Some(format!("Branch {} -> {}", decision.branch_phase_id, decision.chosen_phase_id))
        }
        ExecutionEvent::BudgetExceeded(truncation) => Some(format!("Stopping: {truncation}")),
        _ => None,
    }
}

/// Run `agora run`. Ctrl-C cancels the run; in-flight sub-debates finish.
pub async fn execute(args: RunArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut config = config.clone();
    if let Some(max_cost) = args.max_cost {
        config.execution.max_cost_usd = Some(max_cost);
    }
    if let Some(max_duration) = args.max_duration {
        config.execution.max_duration_secs = Some(max_duration);
    }
    crate::infrastructure::config::ConfigLoader::validate(&config)?;

    let orchestrator = build_orchestrator(&config);
    let overrides = args.question.overrides()?;

    let spinner = (!json_mode).then(|| create_spinner("Planning debate"));
    let (tx, mut rx) = mpsc::channel(100);
    let progress = spinner.clone();
    let events = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let (Some(bar), Some(message)) = (&progress, describe(&event)) {
                bar.set_message(message);
            }
        }
    });

    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing in-flight work");
                cancel.cancel();
            }
        })
    };

    let result = orchestrator
        .run_with_events(&args.question.question, &overrides, tx, cancel)
        .await;
    canceller.abort();
    let _ = events.await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let result = result?;
    output(&RunOutput::new(&result, args.transcripts), json_mode);
    Ok(())
}
