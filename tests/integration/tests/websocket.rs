//! Event socket tests.

use futures::StreamExt;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

use crate::common::{TestEnv, next_typed, send, wait_for};

#[tokio::test]
async fn anonymous_connection_greeting() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let browser = env.browser();
    browser.get("token").await?;

    let mut socket = browser.connect().await?;
    let mut types = Vec::new();
    for _ in 0..5 {
        types.push(next_typed(&mut socket).await?);
    }

    let names: Vec<&str> = types.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(
        names,
        vec!["open", "about", "providers", "authenticated", "loggedOut"]
    );
    assert_eq!(types[1].1["title"], "Login Server");
    assert_eq!(types[2].1[0]["id"], "dev");
    assert!(types[4].1["user"].is_null());
    Ok(())
}

#[tokio::test]
async fn login_reaches_open_connection() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let browser = env.browser();
    browser.get("token").await?;
    let mut socket = browser.connect().await?;
    wait_for(&mut socket, "loggedOut").await?;

    browser.login_ok("dev", "ada", "ada-pw").await?;

    let data = wait_for(&mut socket, "loggedIn").await?;
    assert_eq!(data["user"]["name"], "Ada");
    assert!(data["user"]["identities"]["dev"].is_object());

    let (event_type, token) = next_typed(&mut socket).await?;
    assert_eq!(event_type, "token");
    assert!(token["token"].as_str().is_some());
    assert_eq!(token["expiresIn"], 120);
    Ok(())
}

#[tokio::test]
async fn attach_sends_updated_and_logout_sends_logged_out() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let browser = env.browser();
    browser.login_ok("dev", "ada", "ada-pw").await?;
    let mut socket = browser.connect().await?;
    wait_for(&mut socket, "loggedIn").await?;

    browser.login_ok("dev2", "x", "x-pw").await?;
    let data = wait_for(&mut socket, "updated").await?;
    assert!(data["user"]["identities"]["dev2"].is_object());

    let response = browser.client.post(env.url("logout")).send().await?;
    assert_eq!(response.status(), 204);
    let data = wait_for(&mut socket, "loggedOut").await?;
    assert_eq!(data["user"]["name"], "Ada");
    Ok(())
}

#[tokio::test]
async fn inbound_messages() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let browser = env.browser();
    let mut socket = browser.connect().await?;
    wait_for(&mut socket, "loggedOut").await?;

    send(&mut socket, json!({ "type": "ping" })).await?;
    assert_eq!(next_typed(&mut socket).await?.0, "pong");

    send(&mut socket, json!({ "type": "dance" })).await?;
    let (event_type, data) = next_typed(&mut socket).await?;
    assert_eq!(event_type, "error");
    assert_eq!(data["message"], "Unknown request type dance.");

    send(&mut socket, json!({ "type": "authenticate", "token": "garbage" })).await?;
    let (event_type, data) = next_typed(&mut socket).await?;
    assert_eq!(event_type, "error");
    assert_eq!(data["message"], "Authentication failed.");
    Ok(())
}

#[tokio::test]
async fn authenticate_binds_connection_to_token_session() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let owner = env.browser();
    owner.login_ok("dev", "ada", "ada-pw").await?;
    let token: serde_json::Value = owner.get("token").await?.json().await?;

    let stranger = env.browser();
    let mut socket = stranger.connect().await?;
    wait_for(&mut socket, "loggedOut").await?;

    send(
        &mut socket,
        json!({ "type": "authenticate", "token": token["token"] }),
    )
    .await?;
    assert_eq!(next_typed(&mut socket).await?.0, "authenticated");
    let data = wait_for(&mut socket, "loggedIn").await?;
    assert_eq!(data["user"]["name"], "Ada");
    Ok(())
}

#[tokio::test]
async fn removed_session_closes_its_connections() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let laptop = env.browser();
    let phone = env.browser();
    laptop.login_ok("dev", "ada", "ada-pw").await?;
    phone.login_ok("dev", "ada", "ada-pw").await?;

    let mut socket = phone.connect().await?;
    wait_for(&mut socket, "loggedIn").await?;

    let response = laptop.client.delete(env.url("sessions")).send().await?;
    assert_eq!(response.status(), 204);

    // The server closes the socket; a timeout would surface as an error instead.
    let closed = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while let Some(frame) = socket.next().await {
            match frame {
                Ok(Message::Close(_)) | Err(_) => return true,
                Ok(_) => {}
            }
        }
        true
    })
    .await?;
    assert!(closed);
    Ok(())
}
