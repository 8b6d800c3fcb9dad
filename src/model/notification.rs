//! Notification document
//!
//! Ephemeral cross-user signals: collaboration requests and workspace change
//! updates. A notification lives from fan-out until the recipient resolves
//! it; there is no archive, resolution deletes the document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only status ever stored. Terminal states are deletion.
pub const STATUS_PENDING: &str = "pending";

/// Discriminates what a notification is about. Serialized values match the
/// strings already present in production documents, casing included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Invitation sent from an open workspace; accept grants membership
    #[serde(rename = "COLLAB_REQUEST")]
    CollabRequest,
    /// Invitation sent while creating the event
    #[serde(rename = "invitation")]
    Invitation,
    #[serde(rename = "list_added")]
    ListAdded,
    #[serde(rename = "card_added")]
    CardAdded,
    #[serde(rename = "item_checked")]
    ItemChecked,
}

impl NotificationKind {
    /// Whether accepting this notification grants collaborator membership
    pub fn grants_membership(self) -> bool {
        matches!(
            self,
            NotificationKind::CollabRequest | NotificationKind::Invitation
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Resolved identity-provider ID of the recipient
    pub recipient_id: String,
    pub sender_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Target event. Always written by the fan-out engine, but validated on
    /// accept because older documents were observed without it.
    #[serde(default)]
    pub event_id: Option<String>,
    pub event_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
