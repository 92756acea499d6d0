//! Keyword lexicon and text helpers shared by detection, routing and quality.
//!
//! All matching happens on a folded form of the text: lowercased, accents
//! stripped, punctuation turned into spaces, and padded with a space on each
//! side so that phrases can be matched on word boundaries with `" kw "`.

/// Binary choice separators.
pub const BINARY_SEPARATORS: &[&str] = &["o", "or", "vs", "versus", "u"];

/// Yes/no decision phrasing.
pub const YES_NO_PHRASES: &[&str] = &[
    "debemos", "deberiamos", "conviene", "vale la pena", "es mejor", "should we", "should i",
    "is it worth", "is it better", "do we",
];

/// Words that open a question before its first option: interrogatives,
/// auxiliaries, pronouns, prepositions and decision verbs.
pub const OPTION_LEAD_IN: &[&str] = &[
    "which", "what", "where", "who", "how", "when", "should", "shall", "would", "could", "can",
    "do", "does", "will", "must", "we", "i", "you", "they", "our", "us", "it", "is", "are", "be",
    "to", "into", "in", "on", "at", "for", "from", "between", "among", "with", "choose", "pick",
    "select", "prioritize", "prioritise", "launch", "enter", "expand", "open", "invest", "adopt",
    "use", "build", "buy", "hire", "go", "focus", "move", "migrate", "prefer", "pursue", "target",
    "fund", "que", "cual", "cuales", "donde", "como", "cuando", "debemos", "deberiamos",
    "conviene", "podemos", "vamos", "hay", "es", "mejor", "elegir", "escoger", "priorizar",
    "lanzar", "entrar", "expandir", "expandirnos", "abrir", "invertir", "adoptar", "usar",
    "construir", "comprar", "contratar", "ir", "apostar", "por", "en", "a", "hacia", "entre",
    "con", "para", "nos", "nosotros",
];

/// Broad strategic scope.
pub const BROAD_STRATEGIC: &[&str] = &[
    "estrategia general", "estrategia", "escalar", "largo plazo", "vision", "crecimiento",
    "transformacion", "expansion", "plan de negocio", "strategy", "strategic", "scale",
    "scaling", "long term", "overall", "growth", "roadmap",
];

/// Markers that introduce an explicit factor list.
pub const FACTOR_MARKERS: &[&str] = &[
    "considerando", "teniendo en cuenta", "en terminos de", "tomando en cuenta", "considering",
    "taking into account", "in terms of", "factoring in",
];

/// Ordered steps.
pub const SEQUENTIAL_STEPS: &[&str] = &[
    "primero", "luego", "despues", "paso a paso", "fases", "etapas", "secuencia", "first",
    "then", "step by step", "phases", "stages",
];

/// Conditional phrasing.
pub const CONDITIONAL: &[&str] = &[
    "si", "en caso de", "depende", "dependiendo", "siempre que", "if", "depending on",
    "in case", "unless",
];

/// Risk and downside focus.
pub const RISK_FOCUS: &[&str] = &[
    "riesgos", "riesgo", "pros y contras", "ventajas y desventajas", "debilidades",
    "abogado del diablo", "risks", "risk", "pros and cons", "downside", "weaknesses",
    "devil s advocate", "stress test",
];

/// Requests to refine or iterate.
pub const REFINEMENT: &[&str] = &[
    "refinar", "mejorar", "optimizar", "iterar", "pulir", "perfeccionar", "refine", "improve",
    "optimize", "iterate", "polish",
];

/// Requests for several viewpoints.
pub const MULTI_PERSPECTIVE: &[&str] = &[
    "perspectivas", "puntos de vista", "enfoques", "angulos", "perspectives", "viewpoints",
    "points of view", "angles",
];

/// Agreement markers in agent messages.
pub const AGREEMENT: &[&str] = &[
    "de acuerdo", "coincido", "exacto", "exactamente", "correcto", "totalmente", "comparto",
    "buen punto", "consenso", "agree", "agreed", "exactly", "correct", "good point",
    "consensus", "absolutely", "indeed",
];

/// Disagreement markers in agent messages.
pub const DISAGREEMENT: &[&str] = &[
    "no estoy de acuerdo", "discrepo", "en desacuerdo", "sin embargo", "pero", "error",
    "incorrecto", "falla", "objecion", "disagree", "however", "but", "wrong", "flawed",
    "object", "not convinced", "not agree", "no coincido",
];

/// Disagreement phrases that contain an agreement phrase.
const NEGATED_AGREEMENT: &[&str] = &["no estoy de acuerdo", "not agree", "no coincido"];

/// Causal connectives, a sign of argument depth.
pub const CAUSAL: &[&str] = &[
    "porque", "por ejemplo", "debido a", "ya que", "por lo tanto", "dado que", "puesto que",
    "because", "for example", "for instance", "therefore", "since", "due to",
];

/// References to data, a sign of argument depth.
pub const DATA_REFERENCES: &[&str] = &[
    "datos", "segun", "estudio", "informe", "encuesta", "estadisticas", "porcentaje",
    "data", "according to", "study", "report", "survey", "statistics", "percent",
];

/// Replies that carry no argument at all.
pub const STOCK_AGREEMENT: &[&str] = &[
    "de acuerdo", "estoy de acuerdo", "totalmente de acuerdo", "si", "ok", "vale", "correcto",
    "exacto", "coincido", "buen punto", "agree", "i agree", "agreed", "yes", "exactly",
    "correct", "good point", "same",
];

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        c if c.is_alphanumeric() => c,
        _ => ' ',
    }
}

/// Lowercase, strip accents, turn punctuation into spaces, collapse runs of
/// whitespace, and pad both ends with a single space.
pub fn fold(text: &str) -> String {
    let mapped: String = text.to_lowercase().chars().map(fold_char).collect();
    let words: Vec<&str> = mapped.split_whitespace().collect();
    format!(" {} ", words.join(" "))
}

/// Words of the folded text.
pub fn words(text: &str) -> Vec<String> {
    fold(text).split_whitespace().map(str::to_string).collect()
}

/// Number of words in the folded text.
pub fn word_count(text: &str) -> usize {
    fold(text).split_whitespace().count()
}

/// Count occurrences of each phrase in folded text, word by word, so repeats
/// that share a boundary ("de acuerdo de acuerdo") each count.
pub fn count_hits(folded: &str, phrases: &[&str]) -> usize {
    let words: Vec<&str> = folded.split_whitespace().collect();
    phrases
        .iter()
        .map(|p| {
            let needle: Vec<&str> = p.split_whitespace().collect();
            if needle.is_empty() || needle.len() > words.len() {
                return 0;
            }
            words
                .windows(needle.len())
                .filter(|w| *w == needle.as_slice())
                .count()
        })
        .sum()
}

/// The phrases that occur in folded text.
pub fn matched_phrases(folded: &str, phrases: &[&str]) -> Vec<String> {
    phrases
        .iter()
        .filter(|p| folded.contains(&format!(" {p} ")))
        .map(|p| (*p).to_string())
        .collect()
}

/// Hits per word.
pub fn density(text: &str, phrases: &[&str]) -> f64 {
    let folded = fold(text);
    let total = folded.split_whitespace().count();
    if total == 0 {
        return 0.0;
    }
    count_hits(&folded, phrases) as f64 / total as f64
}

/// Agreement hits per word, not counting negated agreement ("no estoy de acuerdo").
pub fn agreement_density(text: &str) -> f64 {
    let folded = fold(text);
    let total = folded.split_whitespace().count();
    if total == 0 {
        return 0.0;
    }
    let hits = count_hits(&folded, AGREEMENT)
        .saturating_sub(count_hits(&folded, NEGATED_AGREEMENT));
    hits as f64 / total as f64
}

/// Disagreement hits per word.
pub fn disagreement_density(text: &str) -> f64 {
    density(text, DISAGREEMENT)
}

/// Whether the whole message is a stock agreement reply.
pub fn is_stock_agreement(text: &str) -> bool {
    let folded = fold(text);
    let trimmed = folded.trim();
    STOCK_AGREEMENT.contains(&trimmed)
        || (word_count(text) <= 4 && count_hits(&folded, AGREEMENT) > 0 && count_hits(&folded, DISAGREEMENT) == 0)
}

/// Jaccard similarity over folded word sets.
pub fn jaccard(a: &str, b: &str) -> f64 {
    use std::collections::HashSet;
    let left: HashSet<String> = words(a).into_iter().collect();
    let right: HashSet<String> = words(b).into_iter().collect();
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_strips_accents_and_punctuation() {
        assert_eq!(fold("¿Expansión a México, Colombia?"), " expansion a mexico colombia ");
    }

    #[test]
    fn test_count_hits_on_word_boundaries() {
        let folded = fold("Si, pero sin embargo el riesgo es alto");
        assert_eq!(count_hits(&folded, &["si"]), 1);
        assert_eq!(count_hits(&folded, &["sin embargo", "pero"]), 2);
        assert_eq!(count_hits(&fold("siempre"), &["si"]), 0);
    }

    #[test]
    fn test_count_hits_counts_adjacent_repeats() {
        assert_eq!(count_hits(&fold("de acuerdo de acuerdo"), &["de acuerdo"]), 2);
        assert_eq!(count_hits(&fold("riesgo riesgo riesgo"), &["riesgo"]), 3);
        assert_eq!(count_hits(&fold("pros y contras"), &["pros y contras", "contras"]), 2);
    }

    #[test]
    fn test_stock_agreement() {
        assert!(is_stock_agreement("De acuerdo."));
        assert!(is_stock_agreement("Totalmente de acuerdo"));
        assert!(is_stock_agreement("Exacto"));
        assert!(!is_stock_agreement(
            "De acuerdo en parte, pero los datos de margen muestran otra cosa"
        ));
    }

    #[test]
    fn test_negated_agreement_is_not_agreement() {
        assert!(agreement_density("No estoy de acuerdo con el plan") < f64::EPSILON);
        assert!(disagreement_density("No estoy de acuerdo con el plan") > 0.0);
        assert!(agreement_density("Estoy de acuerdo") > 0.3);
    }

    #[test]
    fn test_jaccard() {
        assert!((jaccard("de acuerdo", "estoy de acuerdo") - 2.0 / 3.0).abs() < 1e-9);
        assert!(jaccard("mercado mexicano", "costos logisticos") < 0.01);
    }
}
