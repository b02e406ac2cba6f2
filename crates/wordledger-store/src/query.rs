// ABOUTME: Read and maintenance operations on the ledger: lookups, listing, status updates, deletion.
// ABOUTME: These run outside the merge path; status changes come from the learning-progress side.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use wordledger_core::{Word, WordStatus, WordWithContexts};

use crate::error::StoreError;
use crate::ledger::Ledger;
use crate::store::{WORD_COLUMNS, context_from_row, word_from_row};

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 100;

/// Filter and paging for `Ledger::list_words`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFilter {
    pub status: Option<WordStatus>,
    pub min_frequency: Option<u64>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for WordFilter {
    fn default() -> Self {
        Self {
            status: None,
            min_frequency: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl WordFilter {
    pub fn validate(&self) -> Result<(), StoreError> {
        if !(1..=MAX_LIST_LIMIT).contains(&self.limit) {
            return Err(StoreError::InvalidQuery(format!(
                "limit must be between 1 and {MAX_LIST_LIMIT}, got {}",
                self.limit
            )));
        }
        if self.min_frequency == Some(0) {
            return Err(StoreError::InvalidQuery(
                "min_frequency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Row counts for the whole ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub words: u64,
    pub contexts: u64,
    pub observations: u64,
}

impl Ledger {
    /// Fetch a word by exact lemma.
    pub fn get_word(&self, lemma: &str) -> Result<Option<Word>, StoreError> {
        let word = self
            .conn
            .query_row(
                &format!("SELECT {WORD_COLUMNS} FROM words WHERE word = ?1"),
                params![lemma],
                word_from_row,
            )
            .optional()?;
        Ok(word)
    }

    /// Fetch a word and all of its contexts in insertion order.
    pub fn fetch_word_with_contexts(
        &self,
        lemma: &str,
    ) -> Result<Option<WordWithContexts>, StoreError> {
        let Some(word) = self.get_word(lemma)? else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare("SELECT id, word_id, sentence FROM contexts WHERE word_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![word.id], context_from_row)?;

        let mut contexts = Vec::new();
        for row in rows {
            contexts.push(row?);
        }
        Ok(Some(WordWithContexts { word, contexts }))
    }

    /// List words, most frequent first, then alphabetically.
    pub fn list_words(&self, filter: &WordFilter) -> Result<Vec<Word>, StoreError> {
        filter.validate()?;
        let min_frequency = filter
            .min_frequency
            .map(|f| i64::try_from(f).unwrap_or(i64::MAX));

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WORD_COLUMNS} FROM words
             WHERE (?1 IS NULL OR status = ?1)
               AND (?2 IS NULL OR frequency >= ?2)
             ORDER BY frequency DESC, word ASC
             LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt.query_map(
            params![
                filter.status.map(WordStatus::as_str),
                min_frequency,
                filter.limit,
                filter.offset,
            ],
            word_from_row,
        )?;

        let mut words = Vec::new();
        for row in rows {
            words.push(row?);
        }
        Ok(words)
    }

    /// Set a word's learning status. Returns the updated word, or `None` if
    /// the lemma is unknown. Frequency and timestamps are left alone.
    pub fn update_word_status(
        &mut self,
        lemma: &str,
        status: WordStatus,
    ) -> Result<Option<Word>, StoreError> {
        let changed = self.conn.execute(
            "UPDATE words SET status = ?1 WHERE word = ?2",
            params![status.as_str(), lemma],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        tracing::info!(lemma, %status, "updated word status");
        self.get_word(lemma)
    }

    /// Delete a word and, through the foreign key cascade, all of its contexts.
    pub fn delete_word(&mut self, lemma: &str) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM words WHERE word = ?1", params![lemma])?;
        if deleted > 0 {
            tracing::info!(lemma, "deleted word");
        }
        Ok(deleted > 0)
    }

    /// Total words, contexts, and observations merged so far.
    pub fn stats(&self) -> Result<LedgerStats, StoreError> {
        let stats = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM words),
                (SELECT COUNT(*) FROM contexts),
                (SELECT COALESCE(SUM(frequency), 0) FROM words)",
            [],
            |row| {
                Ok(LedgerStats {
                    words: row.get::<_, i64>(0)? as u64,
                    contexts: row.get::<_, i64>(1)? as u64,
                    observations: row.get::<_, i64>(2)? as u64,
                })
            },
        )?;
        Ok(stats)
    }

    /// Cheap liveness check against the database.
    pub fn ping(&self) -> bool {
        match self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("ledger ping failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordledger_core::Observation;

    fn seeded() -> Ledger {
        let mut ledger = Ledger::open_in_memory().unwrap();
        let observations = [
            ("tide", "The tide rises."),
            ("tide", "The tide falls."),
            ("tide", "The tide falls."),
            ("moon", "The moon pulls."),
            ("moon", "A pale moon."),
            ("shore", "The shore waits."),
        ];
        for (lemma, sentence) in observations {
            ledger.merge(&Observation::new(lemma, sentence)).unwrap();
        }
        ledger
    }

    fn lemmas(words: &[Word]) -> Vec<&str> {
        words.iter().map(|w| w.lemma.as_str()).collect()
    }

    #[test]
    fn get_word_missing_is_none() {
        let ledger = Ledger::open_in_memory().unwrap();
        assert!(ledger.get_word("nothing").unwrap().is_none());
        assert!(ledger.fetch_word_with_contexts("nothing").unwrap().is_none());
    }

    #[test]
    fn fetch_word_with_contexts_in_insertion_order() {
        let ledger = seeded();
        let tide = ledger.fetch_word_with_contexts("tide").unwrap().unwrap();
        assert_eq!(tide.word.frequency, 3);
        assert_eq!(
            tide.sentences().collect::<Vec<_>>(),
            vec!["The tide rises.", "The tide falls."]
        );
        assert!(tide.contexts.iter().all(|c| c.word_id == tide.word.id));
    }

    #[test]
    fn list_orders_by_frequency_then_lemma() {
        let ledger = seeded();
        let words = ledger.list_words(&WordFilter::default()).unwrap();
        assert_eq!(lemmas(&words), vec!["tide", "moon", "shore"]);
    }

    #[test]
    fn list_filters_and_pages() {
        let mut ledger = seeded();
        ledger
            .update_word_status("moon", WordStatus::Learning)
            .unwrap();

        let learning = ledger
            .list_words(&WordFilter {
                status: Some(WordStatus::Learning),
                ..WordFilter::default()
            })
            .unwrap();
        assert_eq!(lemmas(&learning), vec!["moon"]);

        let frequent = ledger
            .list_words(&WordFilter {
                min_frequency: Some(2),
                ..WordFilter::default()
            })
            .unwrap();
        assert_eq!(lemmas(&frequent), vec!["tide", "moon"]);

        let page = ledger
            .list_words(&WordFilter {
                limit: 1,
                offset: 1,
                ..WordFilter::default()
            })
            .unwrap();
        assert_eq!(lemmas(&page), vec!["moon"]);
    }

    #[test]
    fn list_rejects_out_of_range_paging() {
        let ledger = seeded();
        for filter in [
            WordFilter { limit: 0, ..WordFilter::default() },
            WordFilter { limit: 101, ..WordFilter::default() },
            WordFilter { min_frequency: Some(0), ..WordFilter::default() },
        ] {
            assert!(matches!(
                ledger.list_words(&filter),
                Err(StoreError::InvalidQuery(_))
            ));
        }
    }

    #[test]
    fn update_status_leaves_counters_alone() {
        let mut ledger = seeded();
        let before = ledger.get_word("tide").unwrap().unwrap();

        let after = ledger
            .update_word_status("tide", WordStatus::Mastered)
            .unwrap()
            .unwrap();
        assert_eq!(after.status, WordStatus::Mastered);
        assert_eq!(after.frequency, before.frequency);
        assert_eq!(after.last_seen, before.last_seen);

        assert!(ledger
            .update_word_status("unknown", WordStatus::Learning)
            .unwrap()
            .is_none());
    }

    #[test]
    fn merge_does_not_reset_status() {
        let mut ledger = seeded();
        ledger
            .update_word_status("shore", WordStatus::Learning)
            .unwrap();
        let outcome = ledger
            .merge(&Observation::new("shore", "Back to shore."))
            .unwrap();
        assert_eq!(outcome.word.status, WordStatus::Learning);
        assert_eq!(outcome.word.frequency, 2);
    }

    #[test]
    fn delete_cascades_to_own_contexts_only() {
        let mut ledger = seeded();
        assert_eq!(ledger.stats().unwrap().contexts, 5);

        assert!(ledger.delete_word("tide").unwrap());
        assert!(!ledger.delete_word("tide").unwrap());

        let stats = ledger.stats().unwrap();
        assert_eq!(stats.words, 2);
        assert_eq!(stats.contexts, 3);
        let moon = ledger.fetch_word_with_contexts("moon").unwrap().unwrap();
        assert_eq!(moon.contexts.len(), 2);

        let orphans: i64 = ledger
            .conn
            .query_row(
                "SELECT COUNT(*) FROM contexts WHERE word_id NOT IN (SELECT id FROM words)",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn stats_sum_observations() {
        let ledger = seeded();
        assert_eq!(
            ledger.stats().unwrap(),
            LedgerStats {
                words: 3,
                contexts: 5,
                observations: 6,
            }
        );
    }

    #[test]
    fn ping_reports_alive() {
        assert!(Ledger::open_in_memory().unwrap().ping());
    }
}
