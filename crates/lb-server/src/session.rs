//! Session cookie handling.

use axum::http::header::{COOKIE, REFERER, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use lb_core::Config;
use url::Url;

/// Returns the value of cookie `name`, if present.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Returns the `Set-Cookie` value for a session id.
#[must_use]
pub fn session_cookie(config: &Config, session_id: &str) -> Option<HeaderValue> {
    let max_age = config.session.max_age().as_secs();
    let secure = if config.is_https() { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}={session_id}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}{secure}",
        config.session.cookie_name
    ))
    .ok()
}

/// Returns the `Set-Cookie` value that removes the session cookie.
#[must_use]
pub fn clear_cookie(config: &Config) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        config.session.cookie_name
    ))
    .ok()
}

/// Adds a `Set-Cookie` header if `value` is present.
pub fn set_cookie(headers: &mut HeaderMap, value: Option<HeaderValue>) {
    if let Some(value) = value {
        headers.append(SET_COOKIE, value);
    }
}

/// Returns the `Referer` if it points to another origin than the broker.
#[must_use]
pub fn foreign_referrer(headers: &HeaderMap, base_url: &str) -> Option<String> {
    let referrer = headers.get(REFERER)?.to_str().ok()?;
    let referrer_url = Url::parse(referrer).ok()?;
    let base = Url::parse(base_url).ok()?;
    (referrer_url.origin() != base.origin()).then(|| referrer.to_string())
}
