// ABOUTME: Landing page for the wordledger service, rendered from an Askama template.
// ABOUTME: Shows ledger totals and the available API endpoints.

use askama::Template;
use askama_derive_axum::IntoResponse as AskamaIntoResponse;
use axum::extract::State;
use wordledger_store::LedgerStats;

use crate::app_state::{SharedState, with_ledger};
use crate::error::ApiError;

#[derive(Template, AskamaIntoResponse)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub stats: LedgerStats,
}

/// GET / - Render the landing page.
pub async fn index(State(state): State<SharedState>) -> Result<IndexTemplate, ApiError> {
    let stats = with_ledger(&state, |ledger, _| Ok(ledger.stats()?)).await?;
    Ok(IndexTemplate { stats })
}
