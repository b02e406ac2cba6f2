// ABOUTME: The Ledger owns the SQLite connection and runs merges as atomic, retried units of work.
// ABOUTME: Supports one transaction per observation (merge) or one transaction per document (ingest).

use std::path::Path;
use std::thread;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior, params};
use wordledger_core::{
    DocumentReport, MergeOutcome, Observation, ObservationResult, ObservationSource,
    SkippedObservation,
};

use crate::clock::{Clock, SystemClock};
use crate::error::{MergeError, StoreError};
use crate::merge::merge_observation;
use crate::schema;
use crate::store::{SqliteStore, WORD_COLUMNS, word_from_row};

/// Tuning knobs for opening a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOptions {
    /// Total attempts for a unit of work that keeps failing transiently.
    pub max_attempts: u32,
    /// Base delay between attempts; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// How long SQLite waits on a locked database before reporting busy.
    pub busy_timeout: Duration,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff: Duration::from_millis(50),
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// A single-writer handle on the word ledger.
///
/// The connection is acquired in `open` and released when the ledger is
/// dropped. Every write goes through an IMMEDIATE transaction that is either
/// committed as a whole or rolled back as a whole.
pub struct Ledger {
    pub(crate) conn: Connection,
    options: LedgerOptions,
    clock: Box<dyn Clock>,
}

impl Ledger {
    /// Open (or create) the ledger database at `path`.
    pub fn open(path: &Path, options: LedgerOptions) -> Result<Self, StoreError> {
        let conn = schema::open(path, options.busy_timeout)?;
        tracing::info!(path = %path.display(), "opened word ledger");
        Ok(Self::from_connection(conn, options))
    }

    /// A private in-memory ledger.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(
            schema::open_in_memory()?,
            LedgerOptions::default(),
        ))
    }

    fn from_connection(conn: Connection, options: LedgerOptions) -> Self {
        Self {
            conn,
            options,
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the time source used for first_seen / last_seen.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn options(&self) -> &LedgerOptions {
        &self.options
    }

    /// Merge a single observation in its own unit of work and return the
    /// resulting word. Invalid observations are rejected before any store access.
    pub fn merge(&mut self, observation: &Observation) -> Result<MergeOutcome, MergeError> {
        if let Err(e) = observation.validate() {
            tracing::warn!(
                lemma = %observation.lemma,
                sentence = %observation.sentence,
                "rejecting invalid observation: {}",
                e
            );
            return Err(e.into());
        }

        let (outcome, _) = self.run_unit_of_work(|tx, clock| {
            let mut store = SqliteStore::new(tx);
            let step = merge_observation(&mut store, observation, clock.now())
                .map_err(|source| observation_error(observation, source))?;
            let word = tx
                .query_row(
                    &format!("SELECT {WORD_COLUMNS} FROM words WHERE id = ?1"),
                    params![step.word_id],
                    word_from_row,
                )
                .map_err(|e| observation_error(observation, e.into()))?;
            Ok(MergeOutcome {
                word,
                created: step.created,
                frequency_updated: step.frequency_updated,
                context_inserted: step.context_inserted,
            })
        })?;
        Ok(outcome)
    }

    /// Ingest one input text through `source` as a single unit of work.
    ///
    /// Observations are applied in document order. Invalid observations are
    /// skipped and reported; any store failure rolls back the whole document.
    /// Transient failures replay the document from the start, which relies on
    /// the source being restartable.
    pub fn ingest_document(
        &mut self,
        source: &dyn ObservationSource,
        text: &str,
    ) -> Result<DocumentReport, MergeError> {
        self.ingest_with(|| source.observe(text))
    }

    /// Ingest an already materialized observation sequence as one document.
    pub fn ingest_observations(
        &mut self,
        observations: &[Observation],
    ) -> Result<DocumentReport, MergeError> {
        self.ingest_with(|| observations.iter().cloned())
    }

    fn ingest_with<F, I>(&mut self, mut observations: F) -> Result<DocumentReport, MergeError>
    where
        F: FnMut() -> I,
        I: Iterator<Item = Observation>,
    {
        let (mut report, attempts) = self.run_unit_of_work(|tx, clock| {
            let mut store = SqliteStore::new(tx);
            let mut report = DocumentReport::default();

            for observation in observations() {
                if let Err(e) = observation.validate() {
                    tracing::warn!(
                        lemma = %observation.lemma,
                        sentence = %observation.sentence,
                        "skipping invalid observation: {}",
                        e
                    );
                    report.skipped.push(SkippedObservation::new(observation, &e));
                    continue;
                }

                let step = merge_observation(&mut store, &observation, clock.now())
                    .map_err(|source| observation_error(&observation, source))?;
                report.results.push(ObservationResult {
                    lemma: observation.lemma,
                    sentence: observation.sentence,
                    created: step.created,
                    frequency_updated: step.frequency_updated,
                    context_inserted: step.context_inserted,
                });
            }

            Ok(report)
        })?;

        report.attempts = attempts;
        tracing::info!(
            observations = report.results.len(),
            skipped = report.skipped.len(),
            words_created = report.words_created(),
            contexts_inserted = report.contexts_inserted(),
            attempts,
            "document committed"
        );
        Ok(report)
    }

    /// Run `work` inside an IMMEDIATE transaction, retrying the whole unit
    /// on transient failures. Returns the value and the attempt count.
    fn run_unit_of_work<T, W>(&mut self, mut work: W) -> Result<(T, u32), MergeError>
    where
        W: FnMut(&Transaction<'_>, &dyn Clock) -> Result<T, MergeError>,
    {
        let max_attempts = self.options.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.try_unit_of_work(&mut work) {
                Ok(value) => return Ok((value, attempt)),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.options.retry_backoff * attempt;
                    tracing::warn!(attempt, max_attempts, ?delay, "retrying unit of work: {}", e);
                    thread::sleep(delay);
                }
                Err(e) if e.is_retryable() => {
                    return Err(MergeError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_unit_of_work<T, W>(&mut self, work: &mut W) -> Result<T, MergeError>
    where
        W: FnMut(&Transaction<'_>, &dyn Clock) -> Result<T, MergeError>,
    {
        let Ledger { conn, clock, .. } = self;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        // Dropping `tx` on the error path rolls it back.
        let value = work(&tx, &**clock)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }
}

fn observation_error(observation: &Observation, source: StoreError) -> MergeError {
    MergeError::Observation {
        lemma: observation.lemma.clone(),
        sentence: observation.sentence.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Barrier, mpsc};
    use tempfile::TempDir;
    use wordledger_core::{PlainTextSource, WordStatus};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    /// A clock that advances one second per reading, starting at `at(0)`.
    fn ticking_clock() -> impl Clock + 'static {
        let ticks = AtomicI64::new(0);
        move || at(ticks.fetch_add(1, Ordering::SeqCst))
    }

    fn context_count(ledger: &Ledger) -> i64 {
        ledger
            .conn
            .query_row("SELECT COUNT(*) FROM contexts", [], |r| r.get(0))
            .unwrap()
    }

    fn word_count(ledger: &Ledger) -> i64 {
        ledger
            .conn
            .query_row("SELECT COUNT(*) FROM words", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn fresh_word_creation() {
        let mut ledger = Ledger::open_in_memory().unwrap();
        let outcome = ledger
            .merge(&Observation::new(
                "perspective",
                "I was looking at different perspectives.",
            ))
            .unwrap();

        assert!(outcome.created);
        assert!(outcome.context_inserted);
        assert_eq!(outcome.word.lemma, "perspective");
        assert_eq!(outcome.word.frequency, 1);
        assert_eq!(outcome.word.status, WordStatus::Unmastered);
        assert_eq!(outcome.word.first_seen, outcome.word.last_seen);
        assert_eq!(word_count(&ledger), 1);
        assert_eq!(context_count(&ledger), 1);
    }

    #[test]
    fn same_pair_twice_is_idempotent_for_contexts() {
        let mut ledger = Ledger::open_in_memory().unwrap();
        let obs = Observation::new("echo", "Echo echo.");

        ledger.merge(&obs).unwrap();
        let second = ledger.merge(&obs).unwrap();

        assert!(!second.created);
        assert!(second.frequency_updated);
        assert!(!second.context_inserted);
        assert_eq!(second.word.frequency, 2);
        assert_eq!(context_count(&ledger), 1);
        assert_eq!(second.message(), "frequency updated");
    }

    #[test]
    fn repeat_word_new_sentence() {
        let mut ledger = Ledger::open_in_memory().unwrap();
        let first = Observation::new("perspective", "I was looking at different perspectives.");
        for _ in 0..3 {
            ledger.merge(&first).unwrap();
        }

        let outcome = ledger
            .merge(&Observation::new("perspective", "A new sentence."))
            .unwrap();

        assert_eq!(outcome.word.frequency, 4);
        assert!(outcome.context_inserted);
        assert_eq!(context_count(&ledger), 2);
    }

    #[test]
    fn document_order_sets_frequency_and_last_seen() {
        let mut ledger = Ledger::open_in_memory().unwrap().with_clock(ticking_clock());
        let observations: Vec<_> = (0..7)
            .map(|i| Observation::new("wave", format!("Wave number {i}.")))
            .collect();

        let report = ledger.ingest_observations(&observations).unwrap();
        assert_eq!(report.results.len(), 7);
        assert_eq!(report.attempts, 1);

        let word = ledger.get_word("wave").unwrap().unwrap();
        assert_eq!(word.frequency, 7);
        assert_eq!(word.first_seen, at(0));
        assert_eq!(word.last_seen, at(6));
    }

    #[test]
    fn merge_rejects_invalid_observation_without_touching_store() {
        let mut ledger = Ledger::open_in_memory().unwrap();
        let err = ledger.merge(&Observation::new("  ", "Blank.")).unwrap_err();
        assert!(matches!(err, MergeError::InvalidObservation(_)));
        assert_eq!(word_count(&ledger), 0);
    }

    /// Writer that collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn merge_logs_rejected_observation() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut ledger = Ledger::open_in_memory().unwrap();
        let result = tracing::subscriber::with_default(subscriber, || {
            ledger.merge(&Observation::new("bad\u{7}", "Bell."))
        });

        assert!(matches!(result, Err(MergeError::InvalidObservation(_))));
        let output = logs.contents();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("rejecting invalid observation"), "{output}");
        assert!(output.contains("Bell."), "{output}");
    }

    #[test]
    fn document_skips_invalid_observations_and_continues() {
        let mut ledger = Ledger::open_in_memory().unwrap();
        let observations = vec![
            Observation::new("alpha", "Alpha first."),
            Observation::new("", "Broken token."),
            Observation::new("beta", "Beta second."),
        ];

        let report = ledger.ingest_observations(&observations).unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].observation.sentence, "Broken token.");
        assert_eq!(word_count(&ledger), 2);
    }

    #[test]
    fn structural_failure_rolls_back_whole_document() {
        let mut ledger = Ledger::open_in_memory().unwrap();
        ledger.merge(&Observation::new("kept", "Before.")).unwrap();
        // A trigger that rejects one lemma stands in for a structural failure mid-document.
        ledger
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_poison BEFORE INSERT ON words
                 WHEN NEW.word = 'poison'
                 BEGIN SELECT RAISE(ABORT, 'poisoned'); END;",
            )
            .unwrap();

        let observations = vec![
            Observation::new("kept", "During."),
            Observation::new("fresh", "During."),
            Observation::new("poison", "During."),
        ];
        let err = ledger.ingest_observations(&observations).unwrap_err();

        match &err {
            MergeError::Observation { lemma, sentence, .. } => {
                assert_eq!(lemma, "poison");
                assert_eq!(sentence, "During.");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!err.is_retryable());

        let kept = ledger.get_word("kept").unwrap().unwrap();
        assert_eq!(kept.frequency, 1);
        assert!(ledger.get_word("fresh").unwrap().is_none());
        assert_eq!(context_count(&ledger), 1);
    }

    #[test]
    fn ingest_document_uses_source_in_order() {
        let mut ledger = Ledger::open_in_memory().unwrap();
        let report = ledger
            .ingest_document(&PlainTextSource::new(), "Ships sail. Ships sink!")
            .unwrap();

        let lemmas: Vec<_> = report.results.iter().map(|r| r.lemma.as_str()).collect();
        assert_eq!(lemmas, vec!["ships", "sail", "ships", "sink"]);
        assert!(report.results[0].created);
        assert!(report.results[2].frequency_updated);
        assert!(report.results[2].context_inserted);

        let ships = ledger.fetch_word_with_contexts("ships").unwrap().unwrap();
        assert_eq!(ships.word.frequency, 2);
        assert_eq!(
            ships.sentences().collect::<Vec<_>>(),
            vec!["Ships sail.", "Ships sink!"]
        );
    }

    #[test]
    fn transient_lock_exhausts_retries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        let options = LedgerOptions {
            max_attempts: 2,
            retry_backoff: Duration::ZERO,
            busy_timeout: Duration::ZERO,
        };
        let mut ledger = Ledger::open(&path, options).unwrap();

        let blocker = Connection::open(&path).unwrap();
        blocker.execute_batch("BEGIN IMMEDIATE;").unwrap();

        let err = ledger
            .merge(&Observation::new("locked", "Out."))
            .unwrap_err();
        match &err {
            MergeError::RetriesExhausted { attempts, .. } => assert_eq!(*attempts, 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(err.store_error(), Some(StoreError::Transient(_))));

        blocker.execute_batch("ROLLBACK;").unwrap();
        let outcome = ledger.merge(&Observation::new("locked", "Out.")).unwrap();
        assert_eq!(outcome.word.frequency, 1);
    }

    #[test]
    fn transient_lock_recovers_within_retry_budget() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        let options = LedgerOptions {
            max_attempts: 50,
            retry_backoff: Duration::from_millis(10),
            busy_timeout: Duration::ZERO,
        };
        let mut ledger = Ledger::open(&path, options).unwrap();

        let blocker_path = path.clone();
        let (locked_tx, locked_rx) = mpsc::channel();
        let blocker = thread::spawn(move || {
            let conn = Connection::open(&blocker_path).unwrap();
            conn.execute_batch("BEGIN IMMEDIATE;").unwrap();
            locked_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(100));
            conn.execute_batch("COMMIT;").unwrap();
        });
        locked_rx.recv().unwrap();

        let report = ledger
            .ingest_observations(&[Observation::new("patience", "Wait for it.")])
            .unwrap();
        blocker.join().unwrap();

        assert!(report.attempts > 1);
        assert_eq!(ledger.get_word("patience").unwrap().unwrap().frequency, 1);
    }

    #[test]
    fn concurrent_creation_converges() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        // Create the schema once before the writers race.
        drop(Ledger::open(&path, LedgerOptions::default()).unwrap());

        let barrier = Arc::new(Barrier::new(2));
        let writers: Vec<_> = ["First writer.", "Second writer."]
            .into_iter()
            .map(|sentence| {
                let path = path.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let mut ledger = Ledger::open(&path, LedgerOptions::default()).unwrap();
                    barrier.wait();
                    ledger.merge(&Observation::new("novel", sentence)).unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let ledger = Ledger::open(&path, LedgerOptions::default()).unwrap();
        assert_eq!(word_count(&ledger), 1);
        let novel = ledger.fetch_word_with_contexts("novel").unwrap().unwrap();
        assert_eq!(novel.word.frequency, 2);
        let mut sentences: Vec<_> = novel.sentences().collect();
        sentences.sort_unstable();
        assert_eq!(sentences, vec!["First writer.", "Second writer."]);
    }
}
