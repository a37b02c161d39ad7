//! Configuration management for login-broker.
//!
//! Configuration is read once at startup from environment variables (after an
//! optional `.env` file) and validated before any store or listener is
//! created. Out-of-range values are clamped with a warning; malformed values
//! abort startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Minimum token lifetime in seconds.
pub const MIN_TOKEN_TTL_SECS: u64 = 10;

/// Seconds subtracted from the token lifetime to obtain the refresh period.
pub const REFRESH_LEAD_SECS: u64 = 3;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listener and public URL settings.
    pub server: ServerConfig,
    /// Backing store settings.
    pub store: StoreConfig,
    /// Token signing settings.
    pub token: TokenSettings,
    /// Session cookie and expiry notification settings.
    pub session: SessionSettings,
    /// Metadata reported by the `about` event.
    pub about: AboutConfig,
    /// Path of the provider catalog.
    pub providers_path: PathBuf,
    /// Path of the optional application list used to label sessions.
    pub applications_path: PathBuf,
}

/// Listener and public URL settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Public base URL, always ending in `/`.
    pub base_url: String,
    /// Environment name (`development`, `production`, `test`).
    pub env: String,
    /// Origins allowed by CORS. The base URL origin is always included.
    pub allowed_origins: Vec<String>,
}

/// Backing store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `PostgreSQL` URL for the account store; in-memory when absent.
    pub database_url: Option<String>,
    /// Redis URL for the session store; in-memory when absent.
    pub redis_url: Option<String>,
    /// Minimum database connections.
    pub db_min_connections: u32,
    /// Maximum database connections.
    pub db_max_connections: u32,
}

/// Token signing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSettings {
    /// PEM file holding the signing private key.
    pub private_key_path: PathBuf,
    /// PEM file holding the signing public key.
    pub public_key_path: PathBuf,
    /// PEM file holding the service-private session key.
    pub session_key_path: PathBuf,
    /// JWA name of the signing algorithm.
    pub algorithm: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

impl TokenSettings {
    /// Returns the token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.expires_in)
    }

    /// Returns the token-refresh period: three seconds short of the lifetime.
    #[must_use]
    pub const fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.expires_in.saturating_sub(REFRESH_LEAD_SECS))
    }
}

/// Session cookie and expiry notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Name of the session cookie.
    pub cookie_name: String,
    /// Rolling session lifetime in days.
    pub cookie_max_days: u64,
    /// Seconds before expiry at which connections are warned.
    pub expiration_threshold: u64,
    /// Seconds between expiry sweeps.
    pub expiration_interval: u64,
}

impl SessionSettings {
    /// Returns the rolling session lifetime.
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        Duration::from_secs(self.cookie_max_days * 24 * 60 * 60)
    }

    /// Returns the expiry warning window.
    #[must_use]
    pub const fn expiration_threshold(&self) -> Duration {
        Duration::from_secs(self.expiration_threshold)
    }

    /// Returns the expiry sweep interval.
    #[must_use]
    pub const fn expiration_interval(&self) -> Duration {
        Duration::from_secs(self.expiration_interval)
    }
}

/// Metadata reported to connections and on `/about`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutConfig {
    /// Display title.
    pub title: String,
    /// Imprint page.
    pub imprint_url: Option<String>,
    /// Privacy policy page.
    pub privacy_url: Option<String>,
    /// Source code location.
    pub sources_url: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self> {
        // Missing .env is not an error
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = parse_or(&var, "PORT", 3004)?;
        let base_url = var("BASE_URL").unwrap_or_else(|| {
            if port == 80 {
                "http://localhost/".to_string()
            } else {
                format!("http://localhost:{port}/")
            }
        });
        let base_url = normalize_base_url(&base_url)?;

        let mut allowed_origins: Vec<String> = var("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let own_origin = origin_of(&base_url)?;
        if !allowed_origins.contains(&own_origin) {
            allowed_origins.push(own_origin);
        }

        let mut expires_in: u64 = parse_or(&var, "JWT_EXPIRES_IN", 120)?;
        if expires_in < MIN_TOKEN_TTL_SECS {
            tracing::warn!(
                configured = expires_in,
                minimum = MIN_TOKEN_TTL_SECS,
                "JWT_EXPIRES_IN below minimum, clamping"
            );
            expires_in = MIN_TOKEN_TTL_SECS;
        }

        let algorithm = var("JWT_ALGORITHM").unwrap_or_else(|| "RS256".to_string());
        if !matches!(algorithm.as_str(), "RS256" | "RS384" | "RS512") {
            return Err(Error::Config(format!(
                "JWT_ALGORITHM must be RS256, RS384 or RS512, got {algorithm}"
            )));
        }

        let about = AboutConfig {
            title: var("TITLE").unwrap_or_else(|| "Login Server".to_string()),
            imprint_url: var("IMPRINT_URL"),
            privacy_url: var("PRIVACY_URL"),
            sources_url: Some(
                var("SOURCES_URL")
                    .unwrap_or_else(|| env!("CARGO_PKG_REPOSITORY").to_string()),
            ),
        };
        if about.imprint_url.is_none() {
            tracing::warn!("IMPRINT_URL is not configured");
        }
        if about.privacy_url.is_none() {
            tracing::warn!("PRIVACY_URL is not configured");
        }

        let config = Self {
            server: ServerConfig {
                host: var("LB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
                base_url,
                env: var("LB_ENV").unwrap_or_else(|| "development".to_string()),
                allowed_origins,
            },
            store: StoreConfig {
                database_url: var("DATABASE_URL"),
                redis_url: var("REDIS_URL"),
                db_min_connections: parse_or(&var, "LB_DB_MIN_CONNECTIONS", 1)?,
                db_max_connections: parse_or(&var, "LB_DB_MAX_CONNECTIONS", 10)?,
            },
            token: TokenSettings {
                private_key_path: path_or(&var, "JWT_PRIVATE_KEY_PATH", "./private.key"),
                public_key_path: path_or(&var, "JWT_PUBLIC_KEY_PATH", "./public.key"),
                session_key_path: path_or(&var, "SESSION_KEY_PATH", "./session.key"),
                algorithm,
                expires_in,
            },
            session: SessionSettings {
                cookie_name: var("COOKIE_NAME").unwrap_or_else(|| "lb.sid".to_string()),
                cookie_max_days: parse_or(&var, "COOKIE_MAX_DAYS", 30)?,
                expiration_threshold: parse_or(&var, "SESSION_EXPIRATION_MESSAGE_THRESHOLD", 60)?,
                expiration_interval: parse_or(&var, "SESSION_EXPIRATION_MESSAGE_INTERVAL", 5)?
                    .max(1),
            },
            about,
            providers_path: path_or(&var, "PROVIDERS_PATH", "./providers.json"),
            applications_path: path_or(&var, "APPLICATIONS_PATH", "./applications.json"),
        };

        Ok(config)
    }

    /// Creates a configuration for tests: in-memory stores, short TTL,
    /// key files under the given directory.
    #[must_use]
    pub fn for_testing(key_dir: &std::path::Path) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                base_url: "http://localhost:3004/".to_string(),
                env: "test".to_string(),
                allowed_origins: vec!["http://localhost:3004".to_string()],
            },
            store: StoreConfig {
                database_url: None,
                redis_url: None,
                db_min_connections: 1,
                db_max_connections: 5,
            },
            token: TokenSettings {
                private_key_path: key_dir.join("private.key"),
                public_key_path: key_dir.join("public.key"),
                session_key_path: key_dir.join("session.key"),
                algorithm: "RS256".to_string(),
                expires_in: 120,
            },
            session: SessionSettings {
                cookie_name: "lb.sid".to_string(),
                cookie_max_days: 30,
                expiration_threshold: 60,
                expiration_interval: 5,
            },
            about: AboutConfig {
                title: "Login Server".to_string(),
                imprint_url: None,
                privacy_url: None,
                sources_url: None,
            },
            providers_path: key_dir.join("providers.json"),
            applications_path: key_dir.join("applications.json"),
        }
    }

    /// Returns whether cookies must carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.server.base_url.starts_with("https://")
    }

    /// Returns the socket address string to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}

fn path_or<F>(var: &F, key: &str, default: &str) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    PathBuf::from(var(key).unwrap_or_else(|| default.to_string()))
}

/// Validates a base URL and enforces the trailing slash.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let mut base = raw.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let parsed = Url::parse(&base)
        .map_err(|e| Error::Config(format!("BASE_URL is not a valid URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(Error::Config(
            "BASE_URL must be a full http(s) URL with a host".to_string(),
        ));
    }
    Ok(base)
}

fn origin_of(base_url: &str) -> Result<String> {
    let parsed =
        Url::parse(base_url).map_err(|e| Error::Config(format!("invalid base URL: {e}")))?;
    Ok(parsed.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server.port, 3004);
        assert_eq!(config.server.base_url, "http://localhost:3004/");
        assert_eq!(config.token.expires_in, 120);
        assert_eq!(config.token.algorithm, "RS256");
        assert_eq!(config.session.cookie_max_days, 30);
        assert_eq!(config.session.expiration_threshold, 60);
        assert_eq!(config.session.expiration_interval, 5);
        assert_eq!(config.about.title, "Login Server");
        assert!(config.store.database_url.is_none());
        assert_eq!(config.server.allowed_origins, vec!["http://localhost:3004"]);
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let config =
            Config::from_lookup(lookup(&[("BASE_URL", "https://login.example.org/auth")])).unwrap();
        assert_eq!(config.server.base_url, "https://login.example.org/auth/");
        assert!(config.is_https());
        assert!(
            config
                .server
                .allowed_origins
                .contains(&"https://login.example.org".to_string())
        );
    }

    #[test]
    fn base_url_must_be_http() {
        let result = Config::from_lookup(lookup(&[("BASE_URL", "ftp://example.org")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn token_ttl_is_clamped() {
        let config = Config::from_lookup(lookup(&[("JWT_EXPIRES_IN", "4")])).unwrap();
        assert_eq!(config.token.expires_in, MIN_TOKEN_TTL_SECS);
        assert_eq!(config.token.refresh_period(), Duration::from_secs(7));
    }

    #[test]
    fn invalid_number_is_rejected() {
        let result = Config::from_lookup(lookup(&[("PORT", "eighty")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn unsupported_algorithm_is_rejected() {
        let result = Config::from_lookup(lookup(&[("JWT_ALGORITHM", "HS256")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn allowed_origins_are_split() {
        let config = Config::from_lookup(lookup(&[(
            "ALLOWED_ORIGINS",
            "https://a.example, https://b.example,",
        )]))
        .unwrap();
        assert_eq!(
            config.server.allowed_origins,
            vec![
                "https://a.example".to_string(),
                "https://b.example".to_string(),
                "http://localhost:3004".to_string()
            ]
        );
    }
}
