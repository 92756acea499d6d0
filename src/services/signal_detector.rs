//! Signal detection: lexical and structural cues in a raw question.
//!
//! Detection is non-exclusive. Every cue is checked independently and carries
//! a strength derived from match counts and keyword density. A question with
//! no cues yields an empty signal set; only an empty question is an error.

use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DetectionResult, QuestionParameters, Signal, SignalType};
use crate::services::lexicon::{self, fold};

/// Separators between the last two items of an enumerated list.
const LIST_TAIL_SEPARATORS: &[&str] = &["o", "or", "u", "y", "and", "e"];
/// Separators between factors after a factor marker.
const FACTOR_SEPARATORS: &[&str] = &["y", "e", "and"];
/// In a two-piece split, a longer piece is a clause rather than an option.
const MAX_OPTION_WORDS: usize = 6;

/// Detects signals and extracts options and factors from a question.
#[derive(Debug, Clone, Default)]
pub struct SignalDetector;

impl SignalDetector {
    /// A detector with the built-in lexicon.
    pub fn new() -> Self {
        Self
    }

    /// Detect signals and extract options and factors. Fails only on an empty question.
    pub fn detect(&self, question: &str) -> DomainResult<DetectionResult> {
        let trimmed = question.trim();
        if trimmed.is_empty() {
            return Err(DomainError::SignalDetection("question is empty".to_string()));
        }

        let folded = fold(trimmed);
        let total_words = folded.split_whitespace().count();
        if total_words == 0 {
            return Err(DomainError::SignalDetection(format!(
                "question has no words: {trimmed:?}"
            )));
        }

        let (head, tail) = split_at_factor_marker(trimmed);
        let extraction = extract_options(&head);
        let factors = tail.as_deref().map(extract_factors).unwrap_or_default();

        let mut signals = Vec::new();

        if let Some(signal) = binary_choice(trimmed, &folded, &extraction) {
            signals.push(signal);
        }

        if extraction.from_list && extraction.options.len() >= 2 {
            let n = extraction.options.len();
            signals.push(Signal::new(
                SignalType::MultipleOptions,
                0.55 + 0.1 * n as f64,
                extraction.options.clone(),
            ));
        }

        if !factors.is_empty() {
            signals.push(Signal::new(
                SignalType::FactorList,
                0.4 + 0.15 * factors.len() as f64,
                factors.clone(),
            ));
        }

        let keyword_cues: [(SignalType, &[&str]); 6] = [
            (SignalType::BroadStrategic, lexicon::BROAD_STRATEGIC),
            (SignalType::SequentialSteps, lexicon::SEQUENTIAL_STEPS),
            (SignalType::Conditional, lexicon::CONDITIONAL),
            (SignalType::RiskFocus, lexicon::RISK_FOCUS),
            (SignalType::Refinement, lexicon::REFINEMENT),
            (SignalType::MultiPerspective, lexicon::MULTI_PERSPECTIVE),
        ];
        for (signal_type, phrases) in keyword_cues {
            if let Some(signal) = keyword_signal(signal_type, &folded, total_words, phrases) {
                signals.push(signal);
            }
        }

        debug!(
            signal_count = signals.len(),
            options = extraction.options.len(),
            factors = factors.len(),
            "Detected question signals"
        );

        Ok(DetectionResult {
            signals,
            parameters: QuestionParameters {
                question: trimmed.to_string(),
                options: extraction.options,
                factors,
            },
        })
    }
}

/// Options pulled from the part of the question before any factor marker.
#[derive(Debug, Default)]
struct OptionExtraction {
    options: Vec<String>,
    /// True when the options came from a comma, slash or `vs` list.
    from_list: bool,
}

fn keyword_signal(
    signal_type: SignalType,
    folded: &str,
    total_words: usize,
    phrases: &[&str],
) -> Option<Signal> {
    let hits = lexicon::count_hits(folded, phrases);
    if hits == 0 {
        return None;
    }
    let density = hits as f64 / total_words as f64;
    let strength = 0.5 + 0.15 * (hits - 1) as f64 + density;
    Some(Signal::new(
        signal_type,
        strength,
        lexicon::matched_phrases(folded, phrases),
    ))
}

fn binary_choice(raw: &str, folded: &str, extraction: &OptionExtraction) -> Option<Signal> {
    let two_alternatives = extraction.options.len() == 2;
    let asks = raw.contains('?');
    let yes_no = lexicon::count_hits(folded, lexicon::YES_NO_PHRASES) > 0;

    if !two_alternatives && !(yes_no && asks) {
        return None;
    }

    let mut strength = 0.4;
    if two_alternatives {
        strength += 0.3;
    }
    if asks {
        strength += 0.2;
    }
    if yes_no {
        strength += 0.1;
    }

    let evidence = if two_alternatives {
        extraction.options.clone()
    } else {
        lexicon::matched_phrases(folded, lexicon::YES_NO_PHRASES)
    };
    Some(Signal::new(SignalType::BinaryChoice, strength, evidence))
}

fn folded_word(word: &str) -> String {
    fold(word).trim().to_string()
}

/// Split the question at the first factor marker, matched word by word on the
/// folded form so the original spelling survives in both halves.
fn split_at_factor_marker(question: &str) -> (String, Option<String>) {
    let raw: Vec<&str> = question.split_whitespace().collect();
    let folded: Vec<String> = raw.iter().map(|w| folded_word(w)).collect();

    let mut best: Option<(usize, usize)> = None;
    for marker in lexicon::FACTOR_MARKERS {
        let marker_words: Vec<&str> = marker.split_whitespace().collect();
        let k = marker_words.len();
        if k == 0 || k > folded.len() {
            continue;
        }
        let found = (0..=folded.len() - k).find(|&i| {
            folded[i..i + k]
                .iter()
                .zip(&marker_words)
                .all(|(w, m)| w == m)
        });
        if let Some(i) = found {
            if best.is_none_or(|(j, _)| i < j) {
                best = Some((i, k));
            }
        }
    }

    match best {
        Some((i, k)) => {
            let head = raw[..i].join(" ");
            let tail = raw[i + k..].join(" ");
            let head = head.trim_end_matches([',', ';', ' ']).to_string();
            (head, (!tail.trim().is_empty()).then_some(tail))
        }
        None => (question.to_string(), None),
    }
}

fn strip_marks(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '¿' | '?' | '¡' | '!'))
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .trim()
        .to_string()
}

/// Split on whole words whose folded form is one of `separators`.
fn split_on_words(text: &str, separators: &[&str]) -> Vec<String> {
    let mut parts = vec![Vec::new()];
    for word in text.split_whitespace() {
        if separators.contains(&folded_word(word).as_str()) {
            parts.push(Vec::new());
        } else if let Some(current) = parts.last_mut() {
            current.push(word);
        }
    }
    parts
        .into_iter()
        .map(|p| p.join(" "))
        .map(|p| p.trim_matches(|c: char| c == ',' || c.is_whitespace()).to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(folded_word(item)))
        .collect()
}

/// Drop leading question words, auxiliaries and verbs from the first option.
/// Stripping stops at a word that also opens another option, so parallel
/// phrasing ("el plan premium o el plan básico") survives intact.
fn strip_lead_in(first: &str, rest: &[String]) -> String {
    let openers: Vec<String> = rest
        .iter()
        .filter_map(|p| p.split_whitespace().next().map(folded_word))
        .collect();
    let words: Vec<&str> = first.split_whitespace().collect();
    let keep_from = words
        .iter()
        .position(|w| {
            let folded = folded_word(w);
            openers.contains(&folded) || !lexicon::OPTION_LEAD_IN.contains(&folded.as_str())
        })
        .unwrap_or(words.len().saturating_sub(1));
    words[keep_from..].join(" ")
}

/// Text up to the first question mark, when anything precedes it.
fn before_question_mark(head: &str) -> &str {
    match head.find('?') {
        Some(pos) if !strip_marks(&head[..pos]).is_empty() => &head[..pos],
        _ => head,
    }
}

fn extract_options(head: &str) -> OptionExtraction {
    let mut text = strip_marks(before_question_mark(head));
    let introduced = match text.rfind(':') {
        Some(pos) => {
            text = text[pos + 1..].trim().to_string();
            true
        }
        None => false,
    };

    // `vs` and `versus` behave like commas.
    let text = text
        .split_whitespace()
        .map(|w| match folded_word(w).as_str() {
            "vs" | "versus" => ",",
            _ => w,
        })
        .collect::<Vec<_>>()
        .join(" ");

    let from_list = text.contains(',') || text.contains('/');
    let mut pieces: Vec<String> = if from_list {
        let mut pieces: Vec<String> = text
            .split([',', '/'])
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if let Some(last) = pieces.pop() {
            pieces.extend(split_on_words(&last, LIST_TAIL_SEPARATORS));
        }
        pieces
    } else {
        let parts = split_on_words(&text, lexicon::BINARY_SEPARATORS);
        if parts.len() != 2 {
            return OptionExtraction::default();
        }
        parts
    };

    if pieces.len() < 2 {
        return OptionExtraction::default();
    }
    if !introduced {
        pieces[0] = strip_lead_in(&pieces[0], &pieces[1..]);
    }

    // A pair with a long piece is a clause and a question, not two options.
    if pieces.len() == 2
        && pieces
            .iter()
            .any(|p| p.split_whitespace().count() > MAX_OPTION_WORDS)
    {
        return OptionExtraction::default();
    }

    OptionExtraction {
        options: dedupe(pieces),
        from_list,
    }
}

fn extract_factors(tail: &str) -> Vec<String> {
    let text = strip_marks(tail);
    let factors = text
        .split([',', ';'])
        .flat_map(|piece| split_on_words(piece, FACTOR_SEPARATORS))
        .map(|f| f.trim().trim_end_matches('.').trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    dedupe(factors)
}
