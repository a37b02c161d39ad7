//! Reconciliation results.

use std::fmt;

use lb_model::Account;

/// What reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new account was created for the identity.
    Created,
    /// The identity's existing account was selected, unchanged.
    LoggedIn,
    /// The identity was added to the caller's account.
    Attached,
    /// The identity's account was absorbed into the caller's account.
    Merged,
    /// The accounts share providers; nothing was changed.
    Conflict {
        /// Provider ids present on both accounts, sorted.
        providers: Vec<String>,
    },
}

impl Outcome {
    /// Returns the wire name of the outcome.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::LoggedIn => "loggedIn",
            Self::Attached => "attached",
            Self::Merged => "merged",
            Self::Conflict { .. } => "conflict",
        }
    }

    /// Returns whether the session should now be bound to the account.
    #[must_use]
    pub const fn is_login(&self) -> bool {
        matches!(self, Self::Created | Self::LoggedIn)
    }

    /// Returns whether the caller's account was modified.
    #[must_use]
    pub const fn is_update(&self) -> bool {
        matches!(self, Self::Attached | Self::Merged)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account selected by reconciliation and how it was reached.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// The caller-facing account.
    pub account: Account,
    /// What happened.
    pub outcome: Outcome,
    /// Id of the account absorbed by a merge. Its sessions now belong to
    /// `account`.
    pub absorbed_id: Option<String>,
}

impl Reconciled {
    pub(crate) const fn new(account: Account, outcome: Outcome) -> Self {
        Self {
            account,
            outcome,
            absorbed_id: None,
        }
    }

    pub(crate) const fn merged(account: Account, absorbed_id: String) -> Self {
        Self {
            account,
            outcome: Outcome::Merged,
            absorbed_id: Some(absorbed_id),
        }
    }
}
