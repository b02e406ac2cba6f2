// ABOUTME: Result types reported by the merge engine for single observations and whole documents.
// ABOUTME: Carries created / frequency_updated / context_inserted flags and skipped invalid observations.

use serde::{Deserialize, Serialize};

use crate::model::Word;
use crate::observation::{Observation, ObservationError};

/// What a single merge did to the ledger, with the word as it stands afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub word: Word,
    pub created: bool,
    pub frequency_updated: bool,
    pub context_inserted: bool,
}

impl MergeOutcome {
    /// Human-readable summary, e.g. "frequency updated, context inserted".
    pub fn message(&self) -> String {
        let parts: Vec<&str> = [
            (self.created, "created word"),
            (self.frequency_updated, "frequency updated"),
            (self.context_inserted, "context inserted"),
        ]
        .into_iter()
        .filter_map(|(flag, label)| flag.then_some(label))
        .collect();

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Per-observation line of a document report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationResult {
    pub lemma: String,
    pub sentence: String,
    pub created: bool,
    pub frequency_updated: bool,
    pub context_inserted: bool,
}

/// An observation rejected before it reached the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedObservation {
    pub observation: Observation,
    pub reason: String,
}

impl SkippedObservation {
    pub fn new(observation: Observation, error: &ObservationError) -> Self {
        Self {
            observation,
            reason: error.to_string(),
        }
    }
}

/// Everything one committed document did to the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub results: Vec<ObservationResult>,
    pub skipped: Vec<SkippedObservation>,
    /// Number of attempts the unit of work needed (1 unless a transient failure was retried).
    pub attempts: u32,
}

impl DocumentReport {
    pub fn words_created(&self) -> usize {
        self.results.iter().filter(|r| r.created).count()
    }

    pub fn contexts_inserted(&self) -> usize {
        self.results.iter().filter(|r| r.context_inserted).count()
    }
}
