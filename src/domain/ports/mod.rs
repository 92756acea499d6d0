//! Ports to the collaborators the orchestration core depends on.

pub mod agent_turn;
pub mod debate_runner;
pub mod expert_matcher;

pub use agent_turn::{AgentTurn, AgentTurnProvider, TurnRequest};
pub use debate_runner::DebateRunner;
pub use expert_matcher::ExpertMatcher;
