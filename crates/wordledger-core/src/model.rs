// ABOUTME: Defines the Word and Context records stored in the ledger and the WordStatus marker.
// ABOUTME: Words are keyed by lemma; contexts are the distinct example sentences attached to a word.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a textual status does not name a known learning stage.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown status value: {0:?}")]
pub struct UnknownStatus(pub String);

/// Learning progress for a word. The merge path never changes it; only the
/// learning-progress collaborator (CLI `status` / HTTP PATCH) does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordStatus {
    #[default]
    Unmastered,
    Learning,
    Mastered,
}

impl WordStatus {
    /// All statuses, in progression order.
    pub const ALL: [WordStatus; 3] = [
        WordStatus::Unmastered,
        WordStatus::Learning,
        WordStatus::Mastered,
    ];

    /// The value persisted in the `words.status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            WordStatus::Unmastered => "unmastered",
            WordStatus::Learning => "learning",
            WordStatus::Mastered => "mastered",
        }
    }
}

impl fmt::Display for WordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WordStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WordStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// One ledger row per distinct lemma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub id: i64,
    /// Stored in the `word` column; opaque to the ledger.
    pub lemma: String,
    pub frequency: u64,
    pub status: WordStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// An example sentence in which a word was observed. Unique per (word_id, sentence).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub id: i64,
    pub word_id: i64,
    pub sentence: String,
}

/// A word bundled with its contexts, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordWithContexts {
    #[serde(flatten)]
    pub word: Word,
    pub contexts: Vec<Context>,
}

impl WordWithContexts {
    /// Sentences only, in the order they were first recorded.
    pub fn sentences(&self) -> impl Iterator<Item = &str> {
        self.contexts.iter().map(|c| c.sentence.as_str())
    }
}
