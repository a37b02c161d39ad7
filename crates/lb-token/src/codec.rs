//! Token issuance and verification.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use lb_core::event::short_id;
use lb_crypto::{KeyPairPem, SessionCipher, SignatureAlgorithm};
use lb_model::Account;
use lb_session::{SessionStore, StoreHealth};
use serde::Serialize;

use crate::claims::TokenClaims;
use crate::error::{TokenError, TokenResult};

/// RSA signing key with its published public half.
#[derive(Clone)]
pub struct SigningKey {
    /// Key ID (kid).
    pub kid: String,
    /// Signing algorithm.
    pub algorithm: SignatureAlgorithm,
    public_pem: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("encoding_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Creates a signing key from a PEM keypair.
    pub fn from_keypair(keypair: &KeyPairPem, algorithm: SignatureAlgorithm) -> TokenResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(keypair.private_pem.as_bytes())
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(keypair.public_pem.as_bytes())
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        let kid = lb_crypto::keys::key_id(&keypair.public_pem)?;

        Ok(Self {
            kid,
            algorithm,
            public_pem: keypair.public_pem.clone(),
            encoding_key,
            decoding_key,
        })
    }

    /// Returns the PEM public key.
    #[must_use]
    pub fn public_pem(&self) -> &str {
        &self.public_pem
    }

    const fn jwt_algorithm(&self) -> Algorithm {
        match self.algorithm {
            SignatureAlgorithm::Rs256 => Algorithm::RS256,
            SignatureAlgorithm::Rs384 => Algorithm::RS384,
            SignatureAlgorithm::Rs512 => Algorithm::RS512,
        }
    }
}

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    /// Compact JWT.
    pub token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// Signs and verifies broker tokens.
pub struct TokenCodec {
    key: SigningKey,
    cipher: Arc<SessionCipher>,
    sessions: Arc<dyn SessionStore>,
    health: Option<Arc<StoreHealth>>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Creates a codec. `ttl` is the lifetime of every issued token.
    #[must_use]
    pub fn new(
        key: SigningKey,
        cipher: Arc<SessionCipher>,
        sessions: Arc<dyn SessionStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            key,
            cipher,
            sessions,
            health: None,
            ttl,
        }
    }

    /// Reports session store outages seen during issuance to `health`.
    #[must_use]
    pub fn with_health(mut self, health: Arc<StoreHealth>) -> Self {
        self.health = Some(health);
        self
    }

    /// Returns the token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        self.key.algorithm
    }

    /// Returns the PEM public key used to verify tokens.
    #[must_use]
    pub fn public_key(&self) -> &str {
        self.key.public_pem()
    }

    /// Issues a token for `account` and, if it is live, `session_id`.
    ///
    /// Identities are never embedded. If the session store cannot be
    /// reached the session claim is omitted rather than failing issuance.
    pub async fn issue(
        &self,
        account: Option<&Account>,
        session_id: Option<&str>,
    ) -> TokenResult<IssuedToken> {
        let session_claim = match session_id {
            Some(id) if self.session_is_live(id).await => Some(self.cipher.encrypt(id)?),
            _ => None,
        };

        let iat = Utc::now().timestamp();
        let expires_in = self.ttl.as_secs();
        let claims = TokenClaims {
            user: account.map(Account::summary),
            session_id: session_claim,
            iat,
            exp: iat.saturating_add(i64::try_from(expires_in).unwrap_or(i64::MAX)),
        };

        Ok(IssuedToken {
            token: self.sign(&claims)?,
            expires_in,
        })
    }

    async fn session_is_live(&self, id: &str) -> bool {
        match self.sessions.exists(id).await {
            Ok(live) => live,
            Err(err) => {
                tracing::warn!(
                    session = %short_id(id),
                    error = %err,
                    "session lookup failed, issuing token without session claim"
                );
                if err.is_unavailable() {
                    if let Some(health) = &self.health {
                        health.mark_unavailable();
                    }
                }
                false
            }
        }
    }

    pub(crate) fn sign(&self, claims: &TokenClaims) -> TokenResult<String> {
        let mut header = Header::new(self.key.jwt_algorithm());
        header.kid = Some(self.key.kid.clone());
        header.typ = Some("JWT".to_string());

        encode(&header, claims, &self.key.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies signature and expiry and returns the claims.
    pub fn verify(&self, token: &str) -> TokenResult<TokenClaims> {
        let header =
            jsonwebtoken::decode_header(token).map_err(|e| TokenError::Invalid(e.to_string()))?;
        if header.kid.as_deref() != Some(self.key.kid.as_str()) {
            return Err(TokenError::Invalid("unknown signing key".to_string()));
        }

        let mut validation = Validation::new(self.key.jwt_algorithm());
        validation.validate_exp = true;
        validation.leeway = 0;

        let data = decode::<TokenClaims>(token, &self.key.decoding_key, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        Ok(data.claims)
    }

    /// Decrypts the session claim, if present.
    pub fn session_id(&self, claims: &TokenClaims) -> TokenResult<Option<String>> {
        claims
            .session_id
            .as_deref()
            .map(|sealed| {
                self.cipher
                    .decrypt(sealed)
                    .map_err(|_| TokenError::InvalidSessionClaim)
            })
            .transpose()
    }

    /// Signs and verifies a throwaway token, proving the keypair matches.
    pub fn self_check(&self) -> TokenResult<()> {
        let iat = Utc::now().timestamp();
        let probe = TokenClaims {
            user: None,
            session_id: None,
            iat,
            exp: iat + 60,
        };
        let token = self.sign(&probe)?;
        self.verify(&token).map(|_| ()).map_err(|e| {
            TokenError::InvalidKey(format!("keypair does not verify its own tokens: {e}"))
        })
    }
}
