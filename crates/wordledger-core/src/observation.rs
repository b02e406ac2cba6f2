// ABOUTME: Defines the (lemma, sentence) Observation, its validation, and the ObservationSource seam.
// ABOUTME: Sources turn one input text into a lazy, restartable sequence of observations in document order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons an observation is rejected before it reaches the ledger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ObservationError {
    #[error("lemma is empty")]
    EmptyLemma,

    #[error("lemma {0:?} contains control characters")]
    ControlCharacters(String),
}

/// One (lemma, sentence) pair extracted from an input text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observation {
    pub lemma: String,
    pub sentence: String,
}

impl Observation {
    pub fn new(lemma: impl Into<String>, sentence: impl Into<String>) -> Self {
        Self {
            lemma: lemma.into(),
            sentence: sentence.into(),
        }
    }

    /// Check the lemma. Sentence content is never validated: empty and
    /// whitespace-only sentences are stored verbatim.
    pub fn validate(&self) -> Result<(), ObservationError> {
        if self.lemma.trim().is_empty() {
            return Err(ObservationError::EmptyLemma);
        }
        if self.lemma.chars().any(char::is_control) {
            return Err(ObservationError::ControlCharacters(self.lemma.clone()));
        }
        Ok(())
    }
}

impl<L: Into<String>, S: Into<String>> From<(L, S)> for Observation {
    fn from((lemma, sentence): (L, S)) -> Self {
        Observation::new(lemma, sentence)
    }
}

/// Produces observations for one input text.
///
/// Implementations must be restartable: calling `observe` twice on the same
/// text yields the same sequence, which lets the ledger replay a document
/// after a transient storage failure.
pub trait ObservationSource {
    fn observe<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = Observation> + 'a>;
}
