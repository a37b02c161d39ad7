//! Token claim schema.

use lb_model::AccountSummary;
use serde::{Deserialize, Serialize};

/// Claims carried by a broker token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Account without identities, `null` for anonymous callers.
    pub user: Option<AccountSummary>,
    /// Encrypted session id, present only if the session was live.
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Issued at (seconds since the epoch).
    pub iat: i64,
    /// Expiration (seconds since the epoch).
    pub exp: i64,
}

impl TokenClaims {
    /// Returns the account id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_claims_serialize_null_user_without_session() {
        let claims = TokenClaims {
            user: None,
            session_id: None,
            iat: 1_700_000_000,
            exp: 1_700_000_120,
        };
        let json = serde_json::to_value(&claims).unwrap();

        assert!(json["user"].is_null());
        assert!(json.get("sessionId").is_none());
        assert_eq!(json["exp"], 1_700_000_120);
    }
}
