//! Router configuration.
//!
//! This module creates the main Axum router that combines all endpoints.

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{account, health, info, login, ws};
use crate::state::AppState;

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let health = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .route("/health/ready", get(health::readiness_check));

    let public = Router::new()
        .route("/", get(ws::upgrade))
        .route("/about", get(info::about))
        .route("/providers", get(info::providers))
        .route("/publicKey", get(info::public_key))
        .route("/token", get(info::token))
        .route("/users/{id}", get(account::user));

    let account = Router::new()
        .route("/login/{provider}", post(login::login))
        .route("/account", get(account::get_account).patch(account::rename))
        .route("/logout", post(account::logout))
        .route("/delete", post(account::delete_account))
        .route("/disconnect/{provider}", post(account::disconnect))
        .route(
            "/sessions",
            get(account::list_sessions).delete(account::remove_other_sessions),
        )
        .route("/sessions/{id}", delete(account::remove_session));

    let cors = cors_layer(&state);

    Router::new()
        .merge(health)
        .merge(public)
        .merge(account)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Stores;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use lb_core::Config;
    use lb_storage::UsageProvider;
    use serde_json::Value;
    use tower::ServiceExt;

    fn state(dir: &std::path::Path) -> AppState {
        std::fs::write(
            dir.join("providers.json"),
            r#"[{"id": "dev", "strategy": "test", "name": "Dev",
                 "options": {"users": [{"username": "ada", "password": "pw", "displayName": "Ada"}]}}]"#,
        )
        .unwrap();
        AppState::new(Config::for_testing(dir), Stores::memory()).unwrap()
    }

    fn app(dir: &std::path::Path) -> Router {
        create_router(state(dir))
    }

    async fn json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn cookie_of(response: &axum::response::Response) -> String {
        let value = response.headers()[header::SET_COOKIE].to_str().unwrap();
        value.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn providers_are_public() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::get("/providers").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body[0]["id"], "dev");
        assert_eq!(body[0]["credentialsNecessary"], true);
    }

    #[tokio::test]
    async fn anonymous_token_has_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::get("/token").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(cookie_of(&response).starts_with("lb.sid="));
        let body = json(response).await;
        assert_eq!(body["expiresIn"], 120);
        assert!(body["token"].as_str().is_some());
    }

    #[tokio::test]
    async fn login_then_account() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let response = app
            .clone()
            .oneshot(
                Request::post("/login/dev")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=ada&password=pw"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = cookie_of(&response);
        let body = json(response).await;
        assert_eq!(body["outcome"], "created");
        assert_eq!(body["user"]["name"], "Ada");

        let response = app
            .oneshot(
                Request::get("/account")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json(response).await["identities"]["dev"].is_object());
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(
                Request::post("/login/dev")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username": "ada", "password": "nope"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json(response).await;
        assert_eq!(body["status"], 401);
        assert_eq!(body["message"], "Wrong credentials");
    }

    #[tokio::test]
    async fn unknown_provider_and_anonymous_account() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let response = app
            .clone()
            .oneshot(Request::post("/login/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(Request::get("/account").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::get("/users/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn authenticated_request_records_usage() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let usage = state.stores.usage.clone();
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::post("/login/dev")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username": "ada", "password": "pw"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let cookie = cookie_of(&response);
        let account_id = json(response).await["user"]["id"]
            .as_str()
            .unwrap()
            .to_string();
        let before = usage.get(&account_id).await.unwrap().unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let response = app
            .oneshot(
                Request::get("/account")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let after = usage.get(&account_id).await.unwrap().unwrap();
        assert!(after.last_used_at > before.last_used_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn redirect_provider_refuses_credential_login() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("providers.json"),
            r#"[{"id": "github", "strategy": "github", "name": "GitHub"}]"#,
        )
        .unwrap();
        let state = AppState::new(Config::for_testing(dir.path()), Stores::memory()).unwrap();

        let response = create_router(state)
            .oneshot(
                Request::post("/login/github")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username": "ada", "password": "pw"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
