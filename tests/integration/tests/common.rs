//! Common test utilities and fixtures.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use lb_core::Config;
use lb_server::Server;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Response};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

/// Provider catalog used by every test: two plain-password providers.
const PROVIDERS: &str = r#"[
  {"id": "dev", "strategy": "test", "name": "Dev",
   "options": {"users": [
     {"username": "ada", "password": "ada-pw", "displayName": "Ada"},
     {"username": "bob", "password": "bob-pw", "displayName": "Bob"}]}},
  {"id": "dev2", "strategy": "test", "name": "Dev Two",
   "options": {"users": [
     {"username": "x", "password": "x-pw", "displayName": "X"}]}}
]"#;

/// A running server.
pub struct TestEnv {
    /// Base URL ending in `/`.
    pub base_url: String,
    _dir: TempDir,
    _shutdown_tx: oneshot::Sender<()>,
}

impl TestEnv {
    /// Starts a server with in-memory stores.
    pub async fn new() -> anyhow::Result<Self> {
        Self::start(|_| {}).await
    }

    /// Starts a server after adjusting its configuration.
    pub async fn start(configure: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("lb_server=debug,lb_events=debug,sqlx=warn")
            .with_test_writer()
            .try_init();

        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("providers.json"), PROVIDERS)?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let base_url = format!("http://127.0.0.1:{port}/");

        let mut config = Config::for_testing(dir.path());
        config.server.port = port;
        config.server.base_url = base_url.clone();
        configure(&mut config);

        let server = Server::new(config).await?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = server.serve(listener, shutdown).await {
                tracing::error!(error = %e, "server error");
            }
        });

        let env = Self {
            base_url,
            _dir: dir,
            _shutdown_tx: shutdown_tx,
        };
        env.wait_for_server().await?;
        Ok(env)
    }

    /// Returns an absolute URL for `path` (without leading slash).
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Creates a browser with its own cookie jar.
    pub fn browser(&self) -> Browser {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap();
        Browser {
            client,
            jar,
            base_url: self.base_url.clone(),
        }
    }

    async fn wait_for_server(&self) -> anyhow::Result<()> {
        let client = Client::new();
        for _ in 0..50 {
            if let Ok(response) = client.get(self.url("health")).send().await {
                if response.status().is_success() {
                    return Ok(());
                }
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("server did not become ready in time")
    }
}

/// An HTTP client with a cookie jar, standing in for one browser.
pub struct Browser {
    /// HTTP client.
    pub client: Client,
    jar: Arc<Jar>,
    base_url: String,
}

/// Event socket.
pub type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

impl Browser {
    /// `GET` relative to the base URL.
    pub async fn get(&self, path: &str) -> anyhow::Result<Response> {
        Ok(self.client.get(format!("{}{path}", self.base_url)).send().await?)
    }

    /// `POST /login/{provider}` with JSON credentials.
    pub async fn login(&self, provider: &str, username: &str, password: &str) -> anyhow::Result<Response> {
        Ok(self
            .client
            .post(format!("{}login/{provider}", self.base_url))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?)
    }

    /// Logs in and returns the body, failing on any non-200 answer.
    pub async fn login_ok(&self, provider: &str, username: &str, password: &str) -> anyhow::Result<Value> {
        let response = self.login(provider, username, password).await?;
        anyhow::ensure!(response.status() == 200, "login failed: {}", response.status());
        Ok(response.json().await?)
    }

    /// Returns the session cookie header value, if any.
    pub fn cookie(&self) -> Option<String> {
        let url = Url::parse(&self.base_url).ok()?;
        let value = self.jar.cookies(&url)?;
        value.to_str().ok().map(str::to_string)
    }

    /// Opens the event socket with this browser's cookie.
    pub async fn connect(&self) -> anyhow::Result<Socket> {
        let ws_url = self.base_url.replacen("http://", "ws://", 1);
        let mut request = ws_url.into_client_request()?;
        if let Some(cookie) = self.cookie() {
            request.headers_mut().insert("cookie", cookie.parse()?);
        }
        let (socket, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(socket)
    }
}

/// Waits for the next event, skipping non-text frames.
pub async fn next_event(socket: &mut Socket) -> anyhow::Result<Value> {
    loop {
        let frame = timeout(Duration::from_secs(5), socket.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("socket closed"))??;
        if let Message::Text(text) = frame {
            return Ok(serde_json::from_str(text.as_str())?);
        }
    }
}

/// Waits for the next event and returns its type and data.
pub async fn next_typed(socket: &mut Socket) -> anyhow::Result<(String, Value)> {
    let event = next_event(socket).await?;
    let event_type = event["type"].as_str().unwrap_or_default().to_string();
    Ok((event_type, event["data"].clone()))
}

/// Reads events until one of type `wanted` arrives.
pub async fn wait_for(socket: &mut Socket, wanted: &str) -> anyhow::Result<Value> {
    loop {
        let (event_type, data) = next_typed(socket).await?;
        if event_type == wanted {
            return Ok(data);
        }
    }
}

/// Sends a JSON message.
pub async fn send(socket: &mut Socket, message: Value) -> anyhow::Result<()> {
    socket.send(Message::Text(message.to_string().into())).await?;
    Ok(())
}
