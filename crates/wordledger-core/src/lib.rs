// ABOUTME: Core library for wordledger, containing the word/context model and observation types.
// ABOUTME: This crate defines the shared data model used by the store, the HTTP server, and the CLI.

pub mod model;
pub mod observation;
pub mod outcome;
pub mod text;

pub use model::{Context, UnknownStatus, Word, WordStatus, WordWithContexts};
pub use observation::{Observation, ObservationError, ObservationSource};
pub use outcome::{DocumentReport, MergeOutcome, ObservationResult, SkippedObservation};
pub use text::PlainTextSource;
