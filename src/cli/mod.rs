//! Command-line interface.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::{
    analyze::AnalyzeArgs, graph::GraphArgs, preview::PreviewArgs, run::RunArgs,
};

/// Agora: plan and run structured multi-agent debates.
#[derive(Parser, Debug)]
#[command(name = "agora", version, about, long_about = None)]
pub struct Cli {
    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .agora/config.yaml and .agora/local.yaml)
    #[arg(long, global = true, env = "AGORA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect signals, pick a pattern, and show the planned structure
    Analyze(AnalyzeArgs),
    /// Show phase and debate counts with cost and time estimates
    Preview(PreviewArgs),
    /// Emit the planned structure as a node/edge graph
    Graph(GraphArgs),
    /// Run the full debate and print the final conclusion
    Run(RunArgs),
}

/// Print an error in the selected output mode and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("error:").red().bold());
    }
    std::process::exit(1);
}
