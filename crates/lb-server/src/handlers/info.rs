//! Public metadata and token issuance.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use lb_model::ProviderInfo;
use serde_json::{Value, json};

use super::RequestSession;
use crate::error::ApiResult;
use crate::state::{AppState, about_json};

/// `GET /about`
pub async fn about(State(state): State<AppState>) -> Json<Value> {
    Json(about_json(&state.config, state.codec()))
}

/// `GET /providers`
pub async fn providers(State(state): State<AppState>) -> Json<Vec<ProviderInfo>> {
    Json(state.adapters.public_catalog())
}

/// `GET /publicKey`
pub async fn public_key(State(state): State<AppState>) -> Json<Value> {
    let codec = state.codec();
    Json(json!({
        "publicKey": codec.public_key(),
        "algorithm": codec.algorithm().jwa_name(),
    }))
}

/// `GET /token`
pub async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let session = RequestSession::resolve(&state, &headers).await?;
    let issued = state.coordinator.issue_token(Some(session.id())).await?;
    Ok((session.cookie_headers(&state), Json(issued)))
}
