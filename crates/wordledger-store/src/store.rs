// ABOUTME: The LedgerStore primitives (find, create, increment, add-context) and their SQLite implementation.
// ABOUTME: Uniqueness and referential integrity are detected from SQLite constraint errors, not prior checks.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use wordledger_core::{Context, Word, WordStatus};

use crate::error::{StoreError, is_foreign_key_violation, is_unique_violation};

/// Identity and counter of an existing word, as seen by a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordRef {
    pub id: i64,
    pub frequency: u64,
}

/// Storage primitives the merge engine is written against.
///
/// Every call happens inside the caller's unit of work; implementations do
/// not commit.
pub trait LedgerStore {
    /// Exact-match lookup by lemma.
    fn find_word_by_lemma(&mut self, lemma: &str) -> Result<Option<WordRef>, StoreError>;

    /// Insert a new word with frequency 1, status unmastered, first_seen = last_seen = now.
    /// Fails with `DuplicateLemma` when the lemma already exists.
    fn create_word(&mut self, lemma: &str, now: DateTime<Utc>) -> Result<i64, StoreError>;

    /// `frequency + 1` and `last_seen = now`. Fails with `NotFound` for an unknown id.
    fn increment_word(&mut self, id: i64, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Insert the (word_id, sentence) pair unless it already exists. Returns
    /// whether a row was inserted.
    fn add_context_if_absent(&mut self, word_id: i64, sentence: &str) -> Result<bool, StoreError>;
}

/// `LedgerStore` over a SQLite connection or an open transaction.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl LedgerStore for SqliteStore<'_> {
    fn find_word_by_lemma(&mut self, lemma: &str) -> Result<Option<WordRef>, StoreError> {
        let found = self
            .conn
            .prepare_cached("SELECT id, frequency FROM words WHERE word = ?1")?
            .query_row(params![lemma], |row| {
                Ok(WordRef {
                    id: row.get(0)?,
                    frequency: get_count(row, 1)?,
                })
            })
            .optional()?;
        Ok(found)
    }

    fn create_word(&mut self, lemma: &str, now: DateTime<Utc>) -> Result<i64, StoreError> {
        let ts = format_timestamp(now);
        let result = self
            .conn
            .prepare_cached(
                "INSERT INTO words (word, frequency, status, first_seen, last_seen)
                 VALUES (?1, 1, ?2, ?3, ?3)",
            )?
            .execute(params![lemma, WordStatus::Unmastered.as_str(), ts]);

        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateLemma(lemma.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn increment_word(&mut self, id: i64, now: DateTime<Utc>) -> Result<(), StoreError> {
        let changed = self
            .conn
            .prepare_cached(
                "UPDATE words SET frequency = frequency + 1, last_seen = ?1 WHERE id = ?2",
            )?
            .execute(params![format_timestamp(now), id])?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn add_context_if_absent(&mut self, word_id: i64, sentence: &str) -> Result<bool, StoreError> {
        let result = self
            .conn
            .prepare_cached(
                "INSERT INTO contexts (word_id, sentence) VALUES (?1, ?2)
                 ON CONFLICT (word_id, sentence) DO NOTHING",
            )?
            .execute(params![word_id, sentence]);

        match result {
            Ok(inserted) => Ok(inserted > 0),
            Err(e) if is_foreign_key_violation(&e) => Err(StoreError::ReferentialViolation(word_id)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn get_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn get_count(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn get_status(row: &Row<'_>, idx: usize) -> rusqlite::Result<WordStatus> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Column list matching `word_from_row`.
pub(crate) const WORD_COLUMNS: &str = "id, word, frequency, status, first_seen, last_seen";

pub(crate) fn word_from_row(row: &Row<'_>) -> rusqlite::Result<Word> {
    Ok(Word {
        id: row.get(0)?,
        lemma: row.get(1)?,
        frequency: get_count(row, 2)?,
        status: get_status(row, 3)?,
        first_seen: get_timestamp(row, 4)?,
        last_seen: get_timestamp(row, 5)?,
    })
}

pub(crate) fn context_from_row(row: &Row<'_>) -> rusqlite::Result<Context> {
    Ok(Context {
        id: row.get(0)?,
        word_id: row.get(1)?,
        sentence: row.get(2)?,
    })
}
