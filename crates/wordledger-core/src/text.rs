// ABOUTME: Rule-based ObservationSource that splits plain text into sentences and vocabulary tokens.
// ABOUTME: Lowercases tokens and drops stop words, non-alphabetic tokens, and single letters.

use crate::observation::{Observation, ObservationSource};

/// English function words that never become ledger entries.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "even",
    "few", "for", "from", "further", "get", "got", "had", "has", "have", "having", "he", "her",
    "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is",
    "it", "its", "itself", "just", "may", "me", "might", "more", "most", "much", "must", "my",
    "myself", "no", "nor", "not", "now", "of", "off", "oh", "ok", "on", "once", "only", "or",
    "other", "our", "ours", "ourselves", "out", "over", "own", "same", "shall", "she", "should",
    "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "themselves",
    "then", "there", "these", "they", "this", "those", "through", "to", "too", "under",
    "until", "up", "us", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "yeah", "yes", "you", "your",
    "yours", "yourself", "yourselves",
];

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n')
}

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

fn is_apostrophe(c: char) -> bool {
    matches!(c, '\'' | '\u{2019}')
}

/// Normalize one whitespace-separated token, or `None` if it should not be
/// recorded. Surrounding punctuation is trimmed; what remains must be letters,
/// with apostrophes allowed inside the word ("isn't"). Tokens such as "mp3"
/// are dropped whole.
fn normalize(token: &str) -> Option<String> {
    let token = token.trim_matches(|c: char| !c.is_alphanumeric());
    if token.chars().count() < 2
        || !token.chars().all(|c| c.is_alphabetic() || is_apostrophe(c))
    {
        return None;
    }
    let lemma: String = token
        .chars()
        .map(|c| if is_apostrophe(c) { '\'' } else { c })
        .collect::<String>()
        .to_lowercase();
    if is_stop_word(&lemma) {
        return None;
    }
    Some(lemma)
}

/// Split text into trimmed, non-empty sentences in document order. The
/// terminating punctuation stays attached to its sentence.
pub fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(is_sentence_end)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// The default source used by the CLI and HTTP API when no NLP model is wired in.
///
/// It does no morphological analysis: "perspectives" stays "perspectives".
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextSource;

impl PlainTextSource {
    pub fn new() -> Self {
        Self
    }
}

impl ObservationSource for PlainTextSource {
    fn observe<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = Observation> + 'a> {
        Box::new(sentences(text).flat_map(|sentence| {
            sentence
                .split_whitespace()
                .filter_map(normalize)
                .map(move |lemma| Observation::new(lemma, sentence))
        }))
    }
}
