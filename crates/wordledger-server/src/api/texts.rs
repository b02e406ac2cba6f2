// ABOUTME: Text ingestion endpoints: one text per request, or a batch of texts.
// ABOUTME: Each text is one document, committed as its own unit of work.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use wordledger_core::ObservationResult;

use crate::app_state::{SharedState, with_ledger};
use crate::error::ApiError;

/// Request body for ingesting a single text.
#[derive(Debug, Deserialize)]
pub struct IngestTextRequest {
    pub text: String,
}

/// Request body for ingesting several texts.
#[derive(Debug, Deserialize)]
pub struct BatchIngestRequest {
    pub texts: Vec<String>,
}

/// A document of a batch that was rolled back.
#[derive(Debug, Serialize)]
pub struct FailedText {
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BatchIngestResponse {
    pub results: Vec<ObservationResult>,
    pub total_results: usize,
    pub failed: Vec<FailedText>,
}

/// POST /api/v1/texts - Ingest one text and return the per-token results.
pub async fn ingest_text(
    State(state): State<SharedState>,
    Json(req): Json<IngestTextRequest>,
) -> Result<Json<Vec<ObservationResult>>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }

    let report = with_ledger(&state, move |ledger, source| {
        Ok(ledger.ingest_document(source, &req.text)?)
    })
    .await?;

    Ok(Json(report.results))
}

/// POST /api/v1/texts/batch - Ingest several texts. Blank texts are dropped;
/// a failed text is reported and the rest of the batch still runs.
pub async fn ingest_batch(
    State(state): State<SharedState>,
    Json(req): Json<BatchIngestRequest>,
) -> Result<Json<BatchIngestResponse>, ApiError> {
    let texts: Vec<(usize, String)> = req
        .texts
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .collect();
    if texts.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one non-empty text is required".to_string(),
        ));
    }

    let response = with_ledger(&state, move |ledger, source| {
        let mut results = Vec::new();
        let mut failed = Vec::new();

        for (index, text) in &texts {
            match ledger.ingest_document(source, text) {
                Ok(report) => results.extend(report.results),
                Err(e) => {
                    tracing::error!(index, "batch text failed: {}", e);
                    failed.push(FailedText {
                        index: *index,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(BatchIngestResponse {
            total_results: results.len(),
            results,
            failed,
        })
    })
    .await?;

    Ok(Json(response))
}
