//! `agora graph`: the planned structure as nodes and edges.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::{build_orchestrator, QuestionArgs};
use crate::cli::output::{output, table, truncate, CommandOutput};
use crate::domain::models::{Config, EdgeKind, NodeKind, StructureGraph};

/// Arguments of `agora graph`.
#[derive(Args, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub question: QuestionArgs,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct GraphOutput(StructureGraph);

const fn node_kind(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Phase => "phase",
        NodeKind::Branch => "branch",
        NodeKind::Synthesis => "synthesis",
        NodeKind::SubDebate => "sub_debate",
    }
}

const fn edge_kind(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::DependsOn => "depends_on",
        EdgeKind::Contains => "contains",
        EdgeKind::BranchThen => "then",
        EdgeKind::BranchElse => "else",
    }
}

impl CommandOutput for GraphOutput {
    fn to_human(&self) -> String {
        let mut nodes = table(&["Node", "Kind", "Label"]);
        for node in &self.0.nodes {
            nodes.add_row(vec![
                node.id.clone(),
                node_kind(node.kind).to_string(),
                truncate(&node.label, 60),
            ]);
        }

        let mut edges = table(&["From", "To", "Kind"]);
        for edge in &self.0.edges {
            edges.add_row(vec![
                edge.from.clone(),
                edge.to.clone(),
                edge_kind(edge.kind).to_string(),
            ]);
        }

        format!("{nodes}\n\n{edges}")
    }
}

/// Run `agora graph`.
pub async fn execute(args: GraphArgs, config: &Config, json_mode: bool) -> Result<()> {
    let orchestrator = build_orchestrator(config);
    let overrides = args.question.overrides()?;
    let graph = orchestrator.visualize(&args.question.question, &overrides)?;
    output(&GraphOutput(graph), json_mode);
    Ok(())
}
