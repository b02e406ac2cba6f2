// ABOUTME: Persistence layer for wordledger: SQLite schema, merge engine, and units of work.
// ABOUTME: Exposes the Ledger handle plus the LedgerStore primitives the merge algorithm is written against.

pub mod clock;
pub mod error;
pub mod ledger;
pub mod merge;
pub mod query;
pub mod schema;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use error::{MergeError, StoreError};
pub use ledger::{Ledger, LedgerOptions};
pub use merge::{MergeStep, merge_observation};
pub use query::{DEFAULT_LIST_LIMIT, LedgerStats, MAX_LIST_LIMIT, WordFilter};
pub use store::{LedgerStore, SqliteStore, WordRef};
