use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::auth::BearerToken;
use crate::error::HttpAppError;
use crate::response::relay_response;
use crate::state::AppState;

const STAGE: &str = "downstream list";

/// Lists submissions. Read-only, so transient failures are retried.
#[tracing::instrument(skip_all)]
pub async fn list_submissions(
    token: BearerToken,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let list_url = state.config.require_list_api_url()?;
    let downstream = &state.downstream;
    let token = token.as_str();

    let result = state
        .list_fetcher
        .fetch_with_retry(move |attempt| {
            tracing::debug!(attempt, "Fetching submission list");
            downstream.list(list_url, token)
        })
        .await;

    Ok(relay_response(result, STAGE, &[]))
}
