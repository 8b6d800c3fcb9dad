//! User profile and session types

use serde::{Deserialize, Serialize};

/// Profile document keyed by the identity provider's user ID. The core reads
/// these only to resolve an email to a recipient ID and to show names in
/// notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Unique, lowercase. The collaboration handle.
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar: String,
}

/// The acting user, resolved once by the identity provider and passed
/// explicitly into every core operation.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub verified: bool,
}

impl Session {
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            display_name: display_name.into(),
            verified: true,
        }
    }

    /// Email normalized the way collaborator lists store it
    pub fn email_lowercase(&self) -> String {
        self.email.trim().to_lowercase()
    }

    /// First word of the display name, used as the sender name shown to
    /// other participants. Falls back to the full name when empty.
    pub fn first_name(&self) -> &str {
        self.display_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.display_name)
    }
}
