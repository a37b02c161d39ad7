//! Known client applications, used to label sessions by referrer.

use serde::{Deserialize, Serialize};

/// A client application the operator knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Display name.
    pub name: String,
    /// URL prefix identifying the application.
    pub url: String,
}

/// Returns a display label for a session referrer: the name of the first
/// application whose URL occurs in the referrer, else the referrer itself.
#[must_use]
pub fn label_for_referrer(applications: &[Application], referrer: &str) -> String {
    applications
        .iter()
        .find(|app| referrer.contains(&app.url))
        .map_or_else(|| referrer.to_string(), |app| app.name.clone())
}
