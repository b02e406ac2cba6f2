// ABOUTME: SQLite schema for the words and contexts tables plus per-connection settings.
// ABOUTME: Enforces lemma uniqueness, (word_id, sentence) uniqueness, and cascading context deletion.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word TEXT NOT NULL UNIQUE,
    frequency INTEGER NOT NULL DEFAULT 1 CHECK (frequency >= 1),
    status TEXT NOT NULL DEFAULT 'unmastered'
        CHECK (status IN ('unmastered', 'learning', 'mastered')),
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contexts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word_id INTEGER NOT NULL REFERENCES words(id) ON DELETE CASCADE,
    sentence TEXT NOT NULL,
    UNIQUE (word_id, sentence)
);

CREATE INDEX IF NOT EXISTS idx_words_frequency ON words(frequency DESC, word);
";

/// Open a connection at `path` and bring the schema up to date.
pub fn open(path: &Path, busy_timeout: Duration) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    prepare(conn, busy_timeout)
}

/// Open a private in-memory ledger, mostly for tests and dry runs.
pub fn open_in_memory() -> Result<Connection, StoreError> {
    prepare(Connection::open_in_memory()?, Duration::ZERO)
}

fn prepare(conn: Connection, busy_timeout: Duration) -> Result<Connection, StoreError> {
    // foreign_keys is per-connection and off by default in SQLite.
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}
