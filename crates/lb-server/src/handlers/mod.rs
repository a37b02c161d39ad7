//! Request handlers.

pub mod account;
pub mod health;
pub mod info;
pub mod login;
pub mod ws;

use axum::http::HeaderMap;
use lb_model::{Account, SessionRecord};

use crate::error::{ApiError, ApiResult};
use crate::session::{foreign_referrer, read_cookie, session_cookie, set_cookie};
use crate::state::AppState;

/// The request's session, created on demand.
pub(crate) struct RequestSession {
    pub record: SessionRecord,
}

impl RequestSession {
    /// Resolves the session named by the cookie, creating one if it is
    /// missing or expired. The first foreign `Referer` is recorded.
    pub async fn resolve(state: &AppState, headers: &HeaderMap) -> ApiResult<Self> {
        let cookie = read_cookie(headers, &state.config.session.cookie_name);
        let referrer = foreign_referrer(headers, &state.config.server.base_url);
        let record = state
            .coordinator
            .session(cookie.as_deref(), referrer.as_deref())
            .await?;
        Ok(Self { record })
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Returns the bound account or 401, recording the use.
    pub async fn account(&self, state: &AppState) -> ApiResult<Account> {
        let account = state
            .coordinator
            .current_account(self.id())
            .await?
            .ok_or(ApiError::Unauthorized)?;
        state.coordinator.touch_usage(&account.id).await;
        Ok(account)
    }

    /// Response headers renewing the cookie.
    pub fn cookie_headers(&self, state: &AppState) -> HeaderMap {
        cookie_for(state, self.id())
    }
}

/// Response headers setting the cookie to `session_id`.
pub(crate) fn cookie_for(state: &AppState, session_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    set_cookie(&mut headers, session_cookie(&state.config, session_id));
    headers
}
