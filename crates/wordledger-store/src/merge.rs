// ABOUTME: The merge algorithm: find-or-create a word, then append its sentence as a deduplicated context.
// ABOUTME: A uniqueness race on create is resolved by re-reading and merging as an update.

use chrono::{DateTime, Utc};
use wordledger_core::Observation;

use crate::error::StoreError;
use crate::store::LedgerStore;

/// How many times a lost creation race is retried as a fresh merge before
/// the conflict is handed back to the unit of work.
const MAX_RACE_ROUNDS: usize = 3;

/// What one merge did, before the word row is re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeStep {
    pub word_id: i64,
    pub created: bool,
    pub frequency_updated: bool,
    pub context_inserted: bool,
}

/// Merge one observation into `store` at time `now`.
///
/// Frequency counts occurrences and always moves; contexts count distinct
/// evidence and only grow for sentences not yet recorded for the word. The
/// caller owns the transaction: on error nothing here has been committed.
pub fn merge_observation<S>(
    store: &mut S,
    observation: &Observation,
    now: DateTime<Utc>,
) -> Result<MergeStep, StoreError>
where
    S: LedgerStore + ?Sized,
{
    let lemma = observation.lemma.as_str();
    let sentence = observation.sentence.as_str();

    for round in 0..MAX_RACE_ROUNDS {
        if let Some(existing) = store.find_word_by_lemma(lemma)? {
            store.increment_word(existing.id, now)?;
            let context_inserted = store.add_context_if_absent(existing.id, sentence)?;
            tracing::debug!(
                lemma,
                word_id = existing.id,
                frequency = existing.frequency + 1,
                context_inserted,
                "merged into existing word"
            );
            return Ok(MergeStep {
                word_id: existing.id,
                created: false,
                frequency_updated: true,
                context_inserted,
            });
        }

        match store.create_word(lemma, now) {
            Ok(word_id) => {
                let context_inserted = store.add_context_if_absent(word_id, sentence)?;
                tracing::debug!(lemma, word_id, "created word");
                return Ok(MergeStep {
                    word_id,
                    created: true,
                    frequency_updated: false,
                    context_inserted,
                });
            }
            Err(StoreError::DuplicateLemma(_)) => {
                tracing::debug!(lemma, round, "lost creation race, merging as update");
            }
            Err(e) => return Err(e),
        }
    }

    Err(StoreError::DuplicateLemma(lemma.to_string()))
}
