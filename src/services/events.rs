//! Events service
//!
//! Lifecycle of the event document around the workspace board: creation
//! from the new-event form, metadata edits, owner-gated deletion and the
//! dashboard listing (owned plus collaborating).

use chrono::Utc;
use serde_json::{Map, Value};

use crate::config::{DEFAULT_LOCATION, MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH};
use crate::error::{AppError, Result};
use crate::model::{
    CreateEventRequest, Event, Notification, NotificationKind, Session, UpdateEventRequest,
    STATUS_PENDING,
};
use crate::store::{fields_of, DocumentStore, Predicate, EVENTS, NOTIFICATIONS};

use super::users::UsersService;

#[derive(Clone)]
pub struct EventsService<S> {
    store: S,
    users: UsersService<S>,
}

impl<S: DocumentStore> EventsService<S> {
    pub fn new(store: S) -> Self {
        let users = UsersService::new(store.clone());
        Self { store, users }
    }

    /// Create an event from the new-event form.
    ///
    /// An initial collaborator email, if given, produces an invitation
    /// notification — but an unregistered address is skipped silently on
    /// this path, unlike the workspace invite.
    pub async fn create(
        &self,
        session: &Session,
        request: CreateEventRequest,
    ) -> Result<(String, Event)> {
        if !session.verified {
            return Err(AppError::Validation(
                "Please verify your email address".into(),
            ));
        }
        let title = request.title.trim().to_string();
        let event_type = request.event_type.trim().to_string();
        if title.is_empty() || event_type.is_empty() {
            return Err(AppError::Validation(
                "Please fill in the required fields".into(),
            ));
        }
        if title.len() > MAX_TITLE_LENGTH {
            return Err(AppError::Validation("Title is too long".into()));
        }
        if request.description.len() > MAX_DESCRIPTION_LENGTH {
            return Err(AppError::Validation("Description is too long".into()));
        }

        let location = match request.location.trim() {
            "" => DEFAULT_LOCATION.to_string(),
            loc => loc.to_string(),
        };

        let event = Event {
            user_id: session.user_id.clone(),
            title,
            event_type,
            start_date: request.start_date,
            start_time: request.start_time,
            end_date: if request.is_multi_day {
                request.end_date
            } else {
                None
            },
            is_multi_day: request.is_multi_day,
            location,
            description: request.description,
            collaborators: Vec::new(),
            columns: Vec::new(),
            created_at: Utc::now(),
        };

        let event_id = self.store.add(EVENTS, fields_of(&event)?).await?;
        tracing::info!("Created event {}: {}", event_id, event.title);

        if let Some(email) = request
            .collaborator_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
        {
            self.send_initial_invitation(session, &event_id, &event.title, email)
                .await?;
        }

        Ok((event_id, event))
    }

    async fn send_initial_invitation(
        &self,
        session: &Session,
        event_id: &str,
        event_title: &str,
        email: &str,
    ) -> Result<()> {
        match self.users.find_by_email(email).await? {
            Some((recipient_id, _)) => {
                let sender_name = if session.display_name.trim().is_empty() {
                    "An organizer".to_string()
                } else {
                    session.display_name.clone()
                };
                let notification = Notification {
                    recipient_id,
                    sender_name,
                    sender_email: Some(session.email_lowercase()),
                    kind: NotificationKind::Invitation,
                    event_id: Some(event_id.to_string()),
                    event_title: event_title.to_string(),
                    body: None,
                    status: STATUS_PENDING.into(),
                    created_at: Utc::now(),
                };
                self.store
                    .add(NOTIFICATIONS, fields_of(&notification)?)
                    .await?;
                tracing::info!("Sent initial invitation for event {}", event_id);
            }
            None => {
                // The form accepts any email; unregistered ones just never
                // receive anything.
                tracing::debug!("Skipping initial invite, {} is not registered", email);
            }
        }
        Ok(())
    }

    pub async fn get(&self, event_id: &str) -> Result<Event> {
        let doc = self
            .store
            .get(EVENTS, event_id)
            .await?
            .ok_or_else(|| AppError::EventNotFound(event_id.to_string()))?;
        doc.decode()
    }

    /// Update event metadata. Owner only; board edits go through the
    /// workspace service instead.
    pub async fn update(
        &self,
        session: &Session,
        event_id: &str,
        request: UpdateEventRequest,
    ) -> Result<()> {
        let event = self.get(event_id).await?;
        if !event.is_owned_by(&session.user_id) {
            return Err(AppError::Validation(
                "Only the owner can edit event details".into(),
            ));
        }

        let mut fields = Map::new();
        if let Some(title) = request.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::Validation("Title cannot be empty".into()));
            }
            if title.len() > MAX_TITLE_LENGTH {
                return Err(AppError::Validation("Title is too long".into()));
            }
            fields.insert("title".into(), Value::String(title));
        }
        if let Some(event_type) = request.event_type {
            fields.insert("eventType".into(), Value::String(event_type.trim().into()));
        }
        if let Some(start_date) = request.start_date {
            fields.insert("startDate".into(), serde_json::to_value(start_date)?);
        }
        if let Some(start_time) = request.start_time {
            fields.insert("startTime".into(), serde_json::to_value(start_time)?);
        }
        if let Some(location) = request.location {
            fields.insert("location".into(), Value::String(location));
        }
        if let Some(description) = request.description {
            if description.len() > MAX_DESCRIPTION_LENGTH {
                return Err(AppError::Validation("Description is too long".into()));
            }
            fields.insert("description".into(), Value::String(description));
        }
        // The end date only exists while the event is multi-day; an
        // end-date edit on its own respects the stored flag.
        let multi_day = request.is_multi_day.unwrap_or(event.is_multi_day);
        if let Some(is_multi_day) = request.is_multi_day {
            fields.insert("isMultiDay".into(), Value::Bool(is_multi_day));
            if !is_multi_day {
                // Turning multi-day off clears the end date
                fields.insert("endDate".into(), Value::Null);
            }
        }
        if let Some(end_date) = request.end_date {
            if multi_day {
                fields.insert("endDate".into(), serde_json::to_value(end_date)?);
            }
        }

        if fields.is_empty() {
            return Ok(());
        }

        self.store.set(EVENTS, event_id, fields).await?;
        tracing::debug!("Updated event {}", event_id);
        Ok(())
    }

    /// Delete the event document. Notifications already sent for it are
    /// left behind; a later accept fails at the membership write.
    pub async fn delete(&self, session: &Session, event_id: &str) -> Result<()> {
        let event = self.get(event_id).await?;
        if !event.is_owned_by(&session.user_id) {
            return Err(AppError::Validation(
                "Only the owner can delete this workspace".into(),
            ));
        }

        self.store.delete(EVENTS, event_id).await?;
        tracing::info!("Deleted event {}", event_id);
        Ok(())
    }

    /// Events the user owns or collaborates on, owned first
    pub async fn list_for(&self, session: &Session) -> Result<Vec<(String, Event)>> {
        let owned = self
            .store
            .query(EVENTS, &[Predicate::eq("userId", session.user_id.clone())])
            .await?;
        let shared = self
            .store
            .query(
                EVENTS,
                &[Predicate::contains("collaborators", session.email_lowercase())],
            )
            .await?;

        let mut events = Vec::new();
        for doc in owned.into_iter().chain(shared) {
            if events.iter().any(|(id, _)| *id == doc.id) {
                continue;
            }
            events.push((doc.id.clone(), doc.decode()?));
        }
        Ok(events)
    }
}
