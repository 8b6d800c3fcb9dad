//! Event document
//!
//! The root entity: one document per planned occasion, owned by its creator
//! and shared with collaborators by email. The whole kanban board is embedded
//! in the `columns` field and rewritten wholesale on every edit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::workspace::Column;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Identity-provider ID of the owner
    pub user_id: String,
    pub title: String,
    pub event_type: String,
    pub start_date: DateTime<Utc>,
    /// Canonical start time. The 12-hour string the UI shows is derived,
    /// never stored.
    pub start_time: DateTime<Utc>,
    /// Present only for multi-day events
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_multi_day: bool,
    pub location: String,
    #[serde(default)]
    pub description: String,
    /// Lowercase emails of accepted collaborators. Membership is granted by
    /// the inbox accept path, never by the invite itself.
    #[serde(default)]
    pub collaborators: Vec<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Display form of the start time, e.g. "7:30 PM"
    pub fn start_time_display(&self) -> String {
        self.start_time.format("%-I:%M %p").to_string()
    }

    /// Whether the session user may edit event metadata or delete the event
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// New-event form submission
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub event_type: String,
    pub start_date: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_multi_day: bool,
    pub location: String,
    pub description: String,
    /// Optional email invited while creating the event. Unregistered
    /// addresses are skipped silently on this path.
    pub collaborator_email: Option<String>,
}

/// Metadata edits from the event overview. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub event_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_multi_day: Option<bool>,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event() -> Event {
        Event {
            user_id: "owner-1".into(),
            title: "Summer Gala".into(),
            event_type: "Charity".into(),
            start_date: Utc.with_ymd_and_hms(2025, 6, 20, 0, 0, 0).unwrap(),
            start_time: Utc.with_ymd_and_hms(2025, 6, 20, 19, 30, 0).unwrap(),
            end_date: None,
            is_multi_day: false,
            location: "City Hall".into(),
            description: String::new(),
            collaborators: vec![],
            columns: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn start_time_display_is_twelve_hour() {
        assert_eq!(sample_event().start_time_display(), "7:30 PM");
    }

    #[test]
    fn wire_shape_uses_camel_case() {
        let json = serde_json::to_value(sample_event()).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("eventType").is_some());
        assert!(json.get("isMultiDay").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn document_without_columns_deserializes_empty() {
        let mut json = serde_json::to_value(sample_event()).unwrap();
        json.as_object_mut().unwrap().remove("columns");

        let event: Event = serde_json::from_value(json).unwrap();
        assert!(event.columns.is_empty());
    }
}
