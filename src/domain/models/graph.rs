//! Generic graph form of a debate structure for external renderers.

use serde::{Deserialize, Serialize};

use super::structure::{DebateStructure, PhaseType};

/// Kind of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A debate phase.
    Phase,
    /// A branch phase.
    Branch,
    /// The synthesis phase.
    Synthesis,
    /// A sub-debate owned by a phase.
    SubDebate,
}

/// Kind of a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Phase `to` waits for phase `from`.
    DependsOn,
    /// Phase `from` owns sub-debate `to`.
    Contains,
    /// Branch `from` continues at `to` when its condition holds.
    BranchThen,
    /// Branch `from` continues at `to` otherwise.
    BranchElse,
}

/// A phase or sub-debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Phase or sub-debate id.
    pub id: String,
    /// Phase name or sub-debate question.
    pub label: String,
    /// Node kind.
    pub kind: NodeKind,
}

/// A directed edge between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node id.
    pub from: String,
    /// Target node id.
    pub to: String,
    /// Edge kind.
    pub kind: EdgeKind,
}

/// Nodes and edges of a structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureGraph {
    /// Phases first, each followed by its sub-debates.
    pub nodes: Vec<GraphNode>,
    /// Dependency, containment and branch edges.
    pub edges: Vec<GraphEdge>,
}

impl StructureGraph {
    /// Build the graph of a structure.
    pub fn from_structure(structure: &DebateStructure) -> Self {
        let mut graph = Self::default();

        for phase in &structure.phases {
            let kind = match phase.phase_type {
                PhaseType::Debate => NodeKind::Phase,
                PhaseType::Branch => NodeKind::Branch,
                PhaseType::Synthesis => NodeKind::Synthesis,
            };
            graph.nodes.push(GraphNode {
                id: phase.id.clone(),
                label: phase.name.clone(),
                kind,
            });

            for dep in &phase.depends_on {
                graph.edges.push(GraphEdge {
                    from: dep.clone(),
                    to: phase.id.clone(),
                    kind: EdgeKind::DependsOn,
                });
            }

            for debate in &phase.debates {
                graph.nodes.push(GraphNode {
                    id: debate.id.clone(),
                    label: debate.question.clone(),
                    kind: NodeKind::SubDebate,
                });
                graph.edges.push(GraphEdge {
                    from: phase.id.clone(),
                    to: debate.id.clone(),
                    kind: EdgeKind::Contains,
                });
            }

            if let Some(cond) = &phase.condition {
                graph.edges.push(GraphEdge {
                    from: phase.id.clone(),
                    to: cond.then_phase.clone(),
                    kind: EdgeKind::BranchThen,
                });
                graph.edges.push(GraphEdge {
                    from: phase.id.clone(),
                    to: cond.else_phase.clone(),
                    kind: EdgeKind::BranchElse,
                });
            }
        }

        graph
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }
}
