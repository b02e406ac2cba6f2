// ABOUTME: Shared application state for the wordledger HTTP server.
// ABOUTME: Holds the single-writer Ledger behind a mutex and the observation source used for ingestion.

use std::sync::{Arc, Mutex};

use wordledger_core::{ObservationSource, PlainTextSource};
use wordledger_store::Ledger;

use crate::error::ApiError;

/// Shared application state accessible by all Axum handlers.
pub struct AppState {
    /// The one writer. Handlers take turns through `with_ledger`.
    pub ledger: Arc<Mutex<Ledger>>,
    pub source: Arc<dyn ObservationSource + Send + Sync>,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// State using the built-in plain text source.
    pub fn new(ledger: Ledger) -> Self {
        Self::with_source(ledger, Arc::new(PlainTextSource::new()))
    }

    pub fn with_source(ledger: Ledger, source: Arc<dyn ObservationSource + Send + Sync>) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            source,
        }
    }
}

/// Run blocking ledger work off the async runtime while holding the writer lock.
pub async fn with_ledger<T, F>(state: &SharedState, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut Ledger, &dyn ObservationSource) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let ledger = Arc::clone(&state.ledger);
    let source = Arc::clone(&state.source);

    tokio::task::spawn_blocking(move || {
        let mut guard = ledger
            .lock()
            .map_err(|_| ApiError::Internal("ledger lock poisoned".to_string()))?;
        work(&mut guard, source.as_ref())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("ledger task failed: {e}")))?
}
