//! Credential login.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use lb_auth::Credentials;
use lb_core::event::short_id;
use serde_json::json;

use super::{RequestSession, cookie_for};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Reads `{username, password}` from a JSON or form-encoded body.
fn parse_credentials(headers: &HeaderMap, body: &[u8]) -> ApiResult<Credentials> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        return serde_json::from_slice(body).map_err(|e| {
            ApiError::Core(lb_core::Error::Validation(format!("invalid login body: {e}")))
        });
    }

    let mut credentials = Credentials::new("", "");
    for (key, value) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "username" => credentials.username = value.into_owned(),
            "password" => credentials.password = value.into_owned(),
            _ => {}
        }
    }
    Ok(credentials)
}

/// `POST /login/{provider}`
pub async fn login(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let provider = state
        .adapters
        .provider(&provider_id)
        .ok_or_else(|| lb_core::Error::NotFound(format!("Provider {provider_id}")))?
        .clone();
    let credentials = parse_credentials(&headers, &body)?;
    let session = RequestSession::resolve(&state, &headers).await?;

    let profile = state.adapters.authenticate(&provider_id, &credentials).await?;

    let caller = state.coordinator.current_account(session.id()).await?;
    if let Some(identity) = caller.as_ref().and_then(|a| a.identity(&provider_id)) {
        if identity.id != profile.id {
            return Err(ApiError::Conflict(format!(
                "You are already connected to {}.",
                provider.name
            )));
        }
    }

    let result = state
        .coordinator
        .complete_login(session.id(), &profile)
        .await?;
    tracing::info!(
        provider = %provider_id,
        account = %result.account.id,
        session = %short_id(&result.session_id),
        outcome = %result.outcome,
        "login completed"
    );

    Ok((
        cookie_for(&state, &result.session_id),
        Json(json!({
            "outcome": result.outcome.as_str(),
            "user": result.account,
        })),
    ))
}
