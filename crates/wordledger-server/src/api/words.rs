// ABOUTME: Word endpoints: list with filters, detail with contexts, and learning-status updates.
// ABOUTME: Lemmas in paths are matched exactly against the ledger.

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wordledger_core::{Word, WordStatus, WordWithContexts};
use wordledger_store::{DEFAULT_LIST_LIMIT, WordFilter};

use crate::app_state::{SharedState, with_ledger};
use crate::error::ApiError;

/// Query parameters for GET /api/v1/words.
#[derive(Debug, Default, Deserialize)]
pub struct ListWordsQuery {
    pub status: Option<String>,
    pub min_frequency: Option<u64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct WordSummary {
    pub id: i64,
    pub word: String,
    pub frequency: u64,
    pub status: WordStatus,
    pub last_seen: DateTime<Utc>,
}

impl From<Word> for WordSummary {
    fn from(word: Word) -> Self {
        Self {
            id: word.id,
            word: word.lemma,
            frequency: word.frequency,
            status: word.status,
            last_seen: word.last_seen,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WordContext {
    pub id: i64,
    pub sentence: String,
}

#[derive(Debug, Serialize)]
pub struct WordDetail {
    pub id: i64,
    pub word: String,
    pub frequency: u64,
    pub status: WordStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub contexts: Vec<WordContext>,
}

impl From<WordWithContexts> for WordDetail {
    fn from(detail: WordWithContexts) -> Self {
        let WordWithContexts { word, contexts } = detail;
        Self {
            id: word.id,
            word: word.lemma,
            frequency: word.frequency,
            status: word.status,
            first_seen: word.first_seen,
            last_seen: word.last_seen,
            contexts: contexts
                .into_iter()
                .map(|c| WordContext {
                    id: c.id,
                    sentence: c.sentence,
                })
                .collect(),
        }
    }
}

/// Request body for PATCH /api/v1/words/{lemma}.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: WordStatus,
}

/// GET /api/v1/words - List words with optional status / frequency filters.
pub async fn list_words(
    State(state): State<SharedState>,
    Query(query): Query<ListWordsQuery>,
) -> Result<Json<Vec<WordSummary>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<WordStatus>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let filter = WordFilter {
        status,
        min_frequency: query.min_frequency,
        limit: query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
        offset: query.offset.unwrap_or(0),
    };

    let words = with_ledger(&state, move |ledger, _| Ok(ledger.list_words(&filter)?)).await?;
    Ok(Json(words.into_iter().map(WordSummary::from).collect()))
}

/// GET /api/v1/words/{lemma} - A word with all of its contexts.
pub async fn get_word(
    State(state): State<SharedState>,
    Path(lemma): Path<String>,
) -> Result<Json<WordDetail>, ApiError> {
    let detail = with_ledger(&state, move |ledger, _| {
        ledger
            .fetch_word_with_contexts(&lemma)?
            .ok_or_else(|| ApiError::NotFound("word not found".to_string()))
    })
    .await?;

    Ok(Json(detail.into()))
}

/// PATCH /api/v1/words/{lemma} - Change a word's learning status.
pub async fn update_word_status(
    State(state): State<SharedState>,
    Path(lemma): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<WordDetail>, ApiError> {
    let detail = with_ledger(&state, move |ledger, _| {
        if ledger.update_word_status(&lemma, req.status)?.is_none() {
            return Err(ApiError::NotFound("word not found".to_string()));
        }
        ledger
            .fetch_word_with_contexts(&lemma)?
            .ok_or_else(|| ApiError::NotFound("word not found".to_string()))
    })
    .await?;

    Ok(Json(detail.into()))
}

/// GET /api/v1/health - 200 when the database answers, 503 otherwise.
pub async fn health(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, ApiError> {
    let alive = with_ledger(&state, |ledger, _| Ok(ledger.ping())).await?;
    if alive {
        Ok(Json(serde_json::json!({ "status": "ok" })))
    } else {
        Err(ApiError::Unavailable("database down".to_string()))
    }
}
