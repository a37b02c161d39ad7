//! Credentials checked by an external program.
//!
//! The program receives `USERNAME` and `PASSWORD` in its environment and
//! prints a JSON object. An object with an `id` is the profile; anything
//! else is a rejection, using the object's `message` when it has one.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use lb_model::{NormalizedProfile, ProviderConfig};
use serde::Deserialize;
use tokio::process::Command;

use crate::adapter::{Credentials, ProviderAdapter};
use crate::error::{AuthError, AuthResult};

/// Upper bound on a single script run.
pub const SCRIPT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct ScriptOptions {
    script: PathBuf,
}

#[derive(Deserialize)]
struct ScriptOutput {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// `script` strategy.
#[derive(Debug)]
pub struct ScriptAdapter {
    provider_id: String,
    script: PathBuf,
    timeout: Duration,
}

impl ScriptAdapter {
    /// Builds the adapter from `options.script`.
    pub fn from_config(config: &ProviderConfig) -> AuthResult<Self> {
        let options: ScriptOptions = serde_json::from_value(config.options.clone())
            .map_err(|_| AuthError::invalid_options(&config.id, "options.script is required"))?;
        if !options.script.exists() {
            tracing::warn!(provider = %config.id, script = %options.script.display(), "script does not exist");
        }
        Ok(Self {
            provider_id: config.id.clone(),
            script: options.script,
            timeout: SCRIPT_TIMEOUT,
        })
    }

    /// Overrides the run timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn parse(&self, stdout: &[u8]) -> AuthResult<NormalizedProfile> {
        let output: ScriptOutput =
            serde_json::from_slice(stdout).map_err(|_| AuthError::wrong_credentials())?;

        let id = match output.id {
            Some(serde_json::Value::String(id)) if !id.is_empty() => id,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                return Err(AuthError::rejected(
                    output.message.unwrap_or_else(|| "Wrong credentials".to_string()),
                ));
            }
        };

        Ok(NormalizedProfile {
            provider_id: self.provider_id.clone(),
            id,
            name: output.name,
            username: output.username,
            uri: output.uri,
        })
    }
}

#[async_trait]
impl ProviderAdapter for ScriptAdapter {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn strategy(&self) -> &'static str {
        "script"
    }

    fn credentials_necessary(&self) -> bool {
        true
    }

    async fn authenticate(&self, credentials: &Credentials) -> AuthResult<NormalizedProfile> {
        credentials.require()?;

        let run = Command::new(&self.script)
            .env("USERNAME", &credentials.username)
            .env("PASSWORD", &credentials.password)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                tracing::warn!(provider = %self.provider_id, "login script timed out");
                AuthError::wrong_credentials()
            })?
            .map_err(|e| AuthError::Internal(format!("cannot run login script: {e}")))?;

        if !output.status.success() {
            tracing::debug!(provider = %self.provider_id, status = ?output.status.code(), "login script failed");
            return Err(AuthError::wrong_credentials());
        }
        self.parse(&output.stdout)
    }
}
