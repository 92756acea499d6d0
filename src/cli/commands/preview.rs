//! `agora preview`: counts and estimates only.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::{build_orchestrator, QuestionArgs};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, StrategyPreview};

/// Arguments of `agora preview`.
#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub question: QuestionArgs,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct PreviewOutput(StrategyPreview);

impl CommandOutput for PreviewOutput {
    fn to_human(&self) -> String {
        let p = &self.0;
        format!(
            "Pattern:     {} (confidence {:.2})\nPhases:      {}\nSub-debates: {}\nEstimate:    ${:.2}, {:.0} min",
            p.pattern, p.confidence, p.phase_count, p.debate_count, p.estimated_cost_usd, p.estimated_time_minutes
        )
    }
}

/// Run `agora preview`.
pub async fn execute(args: PreviewArgs, config: &Config, json_mode: bool) -> Result<()> {
    let orchestrator = build_orchestrator(config);
    let overrides = args.question.overrides()?;
    let preview = orchestrator.preview(&args.question.question, &overrides)?;
    output(&PreviewOutput(preview), json_mode);
    Ok(())
}
