//! Lexical and structural signals detected in a question.

use serde::{Deserialize, Serialize};

/// Kind of cue found in the question text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// "A o B", "A vs B", yes/no phrasing.
    BinaryChoice,
    /// Comma or slash separated alternatives. Evidence holds the options.
    MultipleOptions,
    /// Broad or strategic phrasing ("estrategia general", "escalar").
    BroadStrategic,
    /// Explicit factor list ("considerando X, Y y Z"). Evidence holds the factors.
    FactorList,
    /// Ordered steps or stages ("primero", "luego", "fases").
    SequentialSteps,
    /// Conditional phrasing ("si", "depende", "en caso de").
    Conditional,
    /// Risks, weaknesses, pros and cons.
    RiskFocus,
    /// Refinement or optimization of an existing idea.
    Refinement,
    /// Explicit request for several perspectives.
    MultiPerspective,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BinaryChoice => "binary_choice",
            Self::MultipleOptions => "multiple_options",
            Self::BroadStrategic => "broad_strategic",
            Self::FactorList => "factor_list",
            Self::SequentialSteps => "sequential_steps",
            Self::Conditional => "conditional",
            Self::RiskFocus => "risk_focus",
            Self::Refinement => "refinement",
            Self::MultiPerspective => "multi_perspective",
        };
        f.write_str(name)
    }
}

/// A typed, weighted signal. Ephemeral: produced per question, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Which cue fired.
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    /// False for placeholder signals; the scorer ignores them.
    pub detected: bool,
    /// Strength in `[0.0, 1.0]`.
    pub strength: f64,
    /// Phrases or options that triggered the cue.
    pub evidence: Vec<String>,
}

impl Signal {
    /// A detected signal. Strength is clamped to `[0.0, 1.0]`.
    pub fn new(signal_type: SignalType, strength: f64, evidence: Vec<String>) -> Self {
        Self {
            signal_type,
            detected: true,
            strength: strength.clamp(0.0, 1.0),
            evidence,
        }
    }
}

/// Parameters extracted from the question alongside its signals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionParameters {
    /// The trimmed question.
    pub question: String,
    /// Enumerated alternatives found before any factor marker.
    pub options: Vec<String>,
    /// Factors listed after a factor marker.
    pub factors: Vec<String>,
}

impl QuestionParameters {
    /// Parameters with no options or factors.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Number of extracted options.
    pub fn option_count(&self) -> usize {
        self.options.len()
    }
}

/// Output of signal detection: the signals plus extracted parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Every cue that fired, in detection order.
    pub signals: Vec<Signal>,
    /// Options and factors.
    pub parameters: QuestionParameters,
}

impl DetectionResult {
    /// The signal of a given type, if detected.
    pub fn signal(&self, signal_type: SignalType) -> Option<&Signal> {
        self.signals.iter().find(|s| s.signal_type == signal_type)
    }
}
