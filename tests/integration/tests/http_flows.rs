//! Login, merge and account management over HTTP.

use serde_json::Value;

use crate::common::TestEnv;

#[tokio::test]
async fn first_login_creates_then_logs_in() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let browser = env.browser();

    let first = browser.login_ok("dev", "ada", "ada-pw").await?;
    assert_eq!(first["outcome"], "created");
    let id = first["user"]["id"].as_str().unwrap_or_default().to_string();
    assert_eq!(first["user"]["uri"], format!("{}users/{id}", env.base_url));

    let again = env.browser().login_ok("dev", "ada", "ada-pw").await?;
    assert_eq!(again["outcome"], "loggedIn");
    assert_eq!(again["user"]["id"], id.as_str());

    let account: Value = browser.get("account").await?.json().await?;
    assert_eq!(account["name"], "Ada");
    Ok(())
}

#[tokio::test]
async fn login_rotates_the_session_cookie() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let browser = env.browser();
    browser.get("token").await?;
    let before = browser.cookie();

    browser.login_ok("dev", "ada", "ada-pw").await?;
    let after = browser.cookie();
    assert!(before.is_some());
    assert!(after.is_some());
    assert_ne!(before, after);
    Ok(())
}

#[tokio::test]
async fn rejected_logins() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let browser = env.browser();

    let response = browser.login("dev", "ada", "wrong").await?;
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Wrong credentials");

    let response = browser.login("nope", "ada", "ada-pw").await?;
    assert_eq!(response.status(), 404);

    let response = browser.get("account").await?;
    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn second_identity_of_same_provider_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let browser = env.browser();
    browser.login_ok("dev", "ada", "ada-pw").await?;

    let response = browser.login("dev", "bob", "bob-pw").await?;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "You are already connected to Dev.");
    Ok(())
}

#[tokio::test]
async fn attach_then_disconnect() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let browser = env.browser();
    browser.login_ok("dev", "ada", "ada-pw").await?;

    let attached = browser.login_ok("dev2", "x", "x-pw").await?;
    assert_eq!(attached["outcome"], "attached");
    assert!(attached["user"]["identities"]["dev2"].is_object());

    let response = browser
        .client
        .post(env.url("disconnect/dev2"))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let account: Value = response.json().await?;
    assert!(account["identities"]["dev2"].is_null());

    // The last identity stays.
    let response = browser.client.post(env.url("disconnect/dev")).send().await?;
    assert_eq!(response.status(), 422);
    Ok(())
}

#[tokio::test]
async fn merge_moves_the_absorbed_account() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let survivor = env.browser();
    let absorbed = env.browser();

    let a = survivor.login_ok("dev", "ada", "ada-pw").await?;
    let b = absorbed.login_ok("dev2", "x", "x-pw").await?;
    let a_uri = a["user"]["uri"].as_str().unwrap_or_default().to_string();
    let b_id = b["user"]["id"].as_str().unwrap_or_default().to_string();

    let merged = survivor.login_ok("dev2", "x", "x-pw").await?;
    assert_eq!(merged["outcome"], "merged");
    assert_eq!(merged["user"]["uri"], a_uri.as_str());
    assert_eq!(merged["user"]["mergedFrom"][0], b["user"]["uri"]);

    // The absorbed account's browser now sees the survivor.
    let account: Value = absorbed.get("account").await?.json().await?;
    assert_eq!(account["uri"], a_uri.as_str());

    let response = survivor.get(&format!("users/{b_id}")).await?;
    assert_eq!(response.status(), 301);
    assert_eq!(
        response.headers()["location"].to_str()?,
        a_uri.as_str()
    );
    Ok(())
}

#[tokio::test]
async fn merge_with_shared_provider_conflicts() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let first = env.browser();
    let second = env.browser();

    first.login_ok("dev", "ada", "ada-pw").await?;
    second.login_ok("dev", "bob", "bob-pw").await?;
    second.login_ok("dev2", "x", "x-pw").await?;

    let response = first.login("dev2", "x", "x-pw").await?;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await?;
    assert!(body["message"].as_str().unwrap_or_default().contains("dev"));

    // Neither account changed.
    let account: Value = first.get("account").await?.json().await?;
    assert!(account["identities"]["dev2"].is_null());
    let account: Value = second.get("account").await?.json().await?;
    assert!(account["identities"]["dev2"].is_object());
    Ok(())
}

#[tokio::test]
async fn session_management() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let laptop = env.browser();
    let phone = env.browser();
    laptop.login_ok("dev", "ada", "ada-pw").await?;
    phone.login_ok("dev", "ada", "ada-pw").await?;

    let sessions: Vec<Value> = laptop.get("sessions").await?.json().await?;
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions.iter().filter(|s| s["current"] == true).count(), 1);
    let other = sessions
        .iter()
        .find(|s| s["current"] == false)
        .and_then(|s| s["id"].as_str())
        .unwrap_or_default()
        .to_string();

    let response = laptop
        .client
        .delete(env.url(&format!("sessions/{other}")))
        .send()
        .await?;
    assert_eq!(response.status(), 204);
    assert_eq!(phone.get("account").await?.status(), 401);

    let sessions: Vec<Value> = laptop.get("sessions").await?.json().await?;
    assert_eq!(sessions.len(), 1);
    Ok(())
}

#[tokio::test]
async fn rename_logout_and_delete() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let browser = env.browser();
    let login = browser.login_ok("dev", "ada", "ada-pw").await?;
    let id = login["user"]["id"].as_str().unwrap_or_default().to_string();

    let response = browser
        .client
        .patch(env.url("account"))
        .json(&serde_json::json!({ "name": "Ada L." }))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let account: Value = response.json().await?;
    assert_eq!(account["name"], "Ada L.");

    let public: Value = browser.get(&format!("users/{id}")).await?.json().await?;
    assert_eq!(public["name"], "Ada L.");

    let response = browser.client.post(env.url("logout")).send().await?;
    assert_eq!(response.status(), 204);
    assert_eq!(browser.get("account").await?.status(), 401);

    browser.login_ok("dev", "ada", "ada-pw").await?;
    let response = browser.client.post(env.url("delete")).send().await?;
    assert_eq!(response.status(), 204);
    assert_eq!(browser.get(&format!("users/{id}")).await?.status(), 404);
    Ok(())
}
