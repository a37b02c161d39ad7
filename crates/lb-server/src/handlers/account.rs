//! Account and session management.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use lb_broker::{SessionView, UserLookup};
use lb_model::Account;
use serde::Deserialize;

use super::RequestSession;
use crate::error::{ApiError, ApiResult};
use crate::session::{clear_cookie, read_cookie, set_cookie};
use crate::state::AppState;

/// `PATCH /account` body.
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    /// New display name.
    pub name: String,
}

/// `GET /account`
pub async fn get_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let session = RequestSession::resolve(&state, &headers).await?;
    let account = session.account(&state).await?;
    Ok((session.cookie_headers(&state), Json(account)))
}

/// `PATCH /account`
pub async fn rename(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RenameRequest>,
) -> ApiResult<Json<Account>> {
    let session = RequestSession::resolve(&state, &headers).await?;
    let account = session.account(&state).await?;
    Ok(Json(state.coordinator.rename(&account.id, &request.name).await?))
}

/// `POST /logout`
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    if let Some(id) = read_cookie(&headers, &state.config.session.cookie_name) {
        state.coordinator.logout(&id).await?;
    }
    let mut response = StatusCode::NO_CONTENT.into_response();
    set_cookie(response.headers_mut(), clear_cookie(&state.config));
    Ok(response)
}

/// `POST /delete`
pub async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let session = RequestSession::resolve(&state, &headers).await?;
    let account = session.account(&state).await?;
    state
        .coordinator
        .delete_account(&account.id, session.id())
        .await?;
    let mut response = StatusCode::NO_CONTENT.into_response();
    set_cookie(response.headers_mut(), clear_cookie(&state.config));
    Ok(response)
}

/// `POST /disconnect/{provider}`
pub async fn disconnect(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Account>> {
    let session = RequestSession::resolve(&state, &headers).await?;
    let account = session.account(&state).await?;
    Ok(Json(
        state
            .coordinator
            .disconnect_identity(&account.id, &provider_id)
            .await?,
    ))
}

/// `GET /sessions`
pub async fn list_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<SessionView>>> {
    let session = RequestSession::resolve(&state, &headers).await?;
    let account = session.account(&state).await?;
    Ok(Json(
        state
            .coordinator
            .list_sessions(&account.id, session.id())
            .await?,
    ))
}

/// `DELETE /sessions`
pub async fn remove_other_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let session = RequestSession::resolve(&state, &headers).await?;
    let account = session.account(&state).await?;
    state
        .coordinator
        .remove_other_sessions(&account.id, session.id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /sessions/{id}`
pub async fn remove_session(
    State(state): State<AppState>,
    Path(target): Path<String>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let session = RequestSession::resolve(&state, &headers).await?;
    let account = session.account(&state).await?;
    state
        .coordinator
        .remove_session(&account.id, &target)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /users/{id}`
pub async fn user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    match state.coordinator.lookup_user(&id).await {
        Ok(UserLookup::Found(account)) => Ok(Json(account).into_response()),
        Ok(UserLookup::Moved(uri)) => {
            Ok((StatusCode::MOVED_PERMANENTLY, [(LOCATION, uri)]).into_response())
        }
        Err(err) => Err(ApiError::from(err)),
    }
}
