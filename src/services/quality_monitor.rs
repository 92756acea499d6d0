//! Quality monitor: depth, diversity and originality of a debate transcript.
//!
//! Every analysis is recomputed from the full message list. Nothing is carried
//! between calls, so the monitor can be shared freely across sub-debates.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::models::{
    DebateMessage, IssueKind, IssueSeverity, QualityAnalysis, QualityConfig, QualityIssue,
};
use crate::services::lexicon::{self, fold};

const LENGTH_CREDIT: f64 = 40.0;
const DATA_CREDIT: f64 = 25.0;
const CAUSAL_CREDIT: f64 = 25.0;
const COMBINED_CREDIT: f64 = 10.0;
/// Replies this short carry no argument.
const MIN_SUBSTANTIVE_WORDS: usize = 2;
/// Messages a history needs before agreement stops looking premature.
const PREMATURE_MIN_MESSAGES: usize = 4;
const PREMATURE_MIN_ROUND: u32 = 3;

/// Scores debate quality and flags issues for moderation.
#[derive(Debug, Clone, Default)]
pub struct QualityMonitor {
    config: QualityConfig,
}

impl QualityMonitor {
    /// A monitor with the given thresholds and weights.
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Thresholds and weights in use.
    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Score the full message history of one sub-debate.
    pub fn analyze(&self, messages: &[DebateMessage]) -> QualityAnalysis {
        if messages.is_empty() || messages.len() < self.config.min_messages {
            return QualityAnalysis::perfect();
        }

        let mut issues = Vec::new();

        let depth_score = self.depth(messages, &mut issues);
        let diversity_score = self.diversity(messages, &mut issues);
        let originality_score = self.originality(messages, &mut issues);

        let overall_quality = (self.config.depth_weight * depth_score
            + self.config.diversity_weight * diversity_score
            + self.config.originality_weight * originality_score)
            .clamp(0.0, 100.0);
        let needs_moderation = overall_quality < self.config.moderation_threshold;

        debug!(
            messages = messages.len(),
            depth = depth_score,
            diversity = diversity_score,
            originality = originality_score,
            overall = overall_quality,
            needs_moderation,
            "Analyzed debate quality"
        );

        QualityAnalysis {
            depth_score,
            diversity_score,
            originality_score,
            overall_quality,
            issues,
            needs_moderation,
        }
    }

    /// Agreement clustering early in a debate. Independent of overall quality.
    pub fn detect_premature_consensus(&self, messages: &[DebateMessage], current_round: u32) -> bool {
        if messages.is_empty() {
            return false;
        }
        if current_round >= PREMATURE_MIN_ROUND && messages.len() >= PREMATURE_MIN_MESSAGES {
            return false;
        }

        let disagreement = messages
            .iter()
            .any(|m| lexicon::disagreement_density(&m.content) > 0.0);
        if disagreement {
            return false;
        }

        let agreeing = messages
            .iter()
            .filter(|m| {
                lexicon::agreement_density(&m.content) > 0.0 || lexicon::is_stock_agreement(&m.content)
            })
            .count();
        agreeing * 2 >= messages.len()
    }

    /// Guidance for the next turn derived from an analysis.
    pub fn moderation_notes(&self, analysis: &QualityAnalysis) -> Vec<String> {
        let mut notes: Vec<String> = analysis
            .issues
            .iter()
            .map(|issue| match issue.kind {
                IssueKind::ShallowReasoning => {
                    "Back every claim with data or a causal argument.".to_string()
                }
                IssueKind::StockAgreement => {
                    "Do not just agree: state what you would change and why.".to_string()
                }
                IssueKind::LowDiversity => {
                    "Speak from your own role and bring a different angle.".to_string()
                }
                IssueKind::RoleDominance => format!(
                    "Let other roles respond before {} speaks again.",
                    issue.agents.join(", ")
                ),
                IssueKind::RepetitiveContent => {
                    "Avoid repeating earlier points; add something new.".to_string()
                }
            })
            .collect();
        notes.dedup();
        notes
    }

    fn message_depth(&self, message: &DebateMessage) -> f64 {
        let words = lexicon::word_count(&message.content);
        if words <= MIN_SUBSTANTIVE_WORDS || lexicon::is_stock_agreement(&message.content) {
            return 0.0;
        }

        let folded = fold(&message.content);
        let floor = self.config.min_depth_words.max(1) as f64;
        let mut score = LENGTH_CREDIT * (words as f64 / floor).min(1.0);

        let data = lexicon::count_hits(&folded, lexicon::DATA_REFERENCES) > 0
            || message.content.chars().any(|c| c.is_ascii_digit());
        let causal = lexicon::count_hits(&folded, lexicon::CAUSAL) > 0;
        if data {
            score += DATA_CREDIT;
        }
        if causal {
            score += CAUSAL_CREDIT;
        }
        if data && causal {
            score += COMBINED_CREDIT;
        }
        score.min(100.0)
    }

    fn depth(&self, messages: &[DebateMessage], issues: &mut Vec<QualityIssue>) -> f64 {
        let scores: Vec<f64> = messages.iter().map(|m| self.message_depth(m)).collect();
        let depth = scores.iter().sum::<f64>() / scores.len() as f64;

        let stock: Vec<&DebateMessage> = messages
            .iter()
            .filter(|m| lexicon::is_stock_agreement(&m.content))
            .collect();
        if !stock.is_empty() {
            let severity = if stock.len() * 2 >= messages.len() {
                IssueSeverity::High
            } else {
                IssueSeverity::Medium
            };
            issues.push(
                QualityIssue::new(
                    IssueKind::StockAgreement,
                    severity,
                    format!("{} of {} messages are stock agreement", stock.len(), messages.len()),
                )
                .with_agents(distinct_agents(stock.into_iter())),
            );
        }

        if depth < LENGTH_CREDIT {
            let shallow = messages
                .iter()
                .zip(&scores)
                .filter(|(_, s)| **s < LENGTH_CREDIT)
                .map(|(m, _)| m);
            let severity = if depth < LENGTH_CREDIT / 2.0 {
                IssueSeverity::High
            } else {
                IssueSeverity::Medium
            };
            issues.push(
                QualityIssue::new(
                    IssueKind::ShallowReasoning,
                    severity,
                    format!("average depth {depth:.0} is below {LENGTH_CREDIT:.0}"),
                )
                .with_agents(distinct_agents(shallow)),
            );
        }

        depth
    }

    fn diversity(&self, messages: &[DebateMessage], issues: &mut Vec<QualityIssue>) -> f64 {
        let speakers: HashSet<&str> = messages.iter().map(|m| m.agent.as_str()).collect();
        let substantive: HashSet<&str> = messages
            .iter()
            .filter(|m| self.message_depth(m) > 0.0)
            .map(|m| m.agent.as_str())
            .collect();
        let role_share = substantive.len() as f64 / speakers.len().max(1) as f64;

        let switch_ratio = if messages.len() < 2 {
            1.0
        } else {
            let switches = messages
                .windows(2)
                .filter(|w| w[0].agent != w[1].agent)
                .count();
            switches as f64 / (messages.len() - 1) as f64
        };

        // Longest run of consecutive turns by one role.
        let mut longest = (1usize, messages[0].agent.as_str());
        let mut run = 1usize;
        for w in messages.windows(2) {
            if w[0].agent == w[1].agent {
                run += 1;
                if run > longest.0 {
                    longest = (run, w[1].agent.as_str());
                }
            } else {
                run = 1;
            }
        }
        if longest.0 >= self.config.dominance_run {
            issues.push(
                QualityIssue::new(
                    IssueKind::RoleDominance,
                    IssueSeverity::Medium,
                    format!("{} spoke {} turns in a row", longest.1, longest.0),
                )
                .with_agents(vec![longest.1.to_string()]),
            );
        }

        let diversity = 50.0 * role_share + 50.0 * switch_ratio;
        if diversity < 50.0 {
            issues.push(QualityIssue::new(
                IssueKind::LowDiversity,
                IssueSeverity::Medium,
                format!(
                    "{} of {} roles contributed substantively",
                    substantive.len(),
                    speakers.len()
                ),
            ));
        }
        diversity
    }

    fn originality(&self, messages: &[DebateMessage], issues: &mut Vec<QualityIssue>) -> f64 {
        let threshold = self.config.similarity_threshold();
        let duplicates: Vec<&DebateMessage> = messages
            .iter()
            .enumerate()
            .filter(|(i, m)| {
                messages[..*i]
                    .iter()
                    .any(|earlier| lexicon::jaccard(&earlier.content, &m.content) >= threshold)
            })
            .map(|(_, m)| m)
            .collect();

        if !duplicates.is_empty() {
            let severity = if duplicates.len() * 2 >= messages.len() {
                IssueSeverity::High
            } else {
                IssueSeverity::Low
            };
            issues.push(
                QualityIssue::new(
                    IssueKind::RepetitiveContent,
                    severity,
                    format!("{} near-duplicate messages", duplicates.len()),
                )
                .with_agents(distinct_agents(duplicates.iter().copied())),
            );
        }

        100.0 * (1.0 - duplicates.len() as f64 / messages.len() as f64)
    }
}

fn distinct_agents<'a>(messages: impl Iterator<Item = &'a DebateMessage>) -> Vec<String> {
    let mut seen = Vec::new();
    for m in messages {
        let name = m.agent.as_str().to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}
