//! Collaboration and notification fan-out
//!
//! Invitations target one resolved user; structural board changes fan out
//! to every participant (owner plus collaborators), the acting user
//! included. Each participant write is independent: a failure is recorded
//! in that participant's delivery result and the loop carries on, so
//! partial fan-out is visible to the caller instead of being swallowed.
//! There is no cross-participant ordering and no dedup key — re-running
//! the same change re-sends everything.

use chrono::Utc;
use std::collections::BTreeSet;

use crate::error::{AppError, Result};
use crate::model::{Event, Notification, NotificationKind, Session, STATUS_PENDING};
use crate::store::{fields_of, DocumentStore, EVENTS, NOTIFICATIONS};

use super::users::UsersService;

/// A structural board change worth telling participants about
#[derive(Debug, Clone)]
pub enum WorkspaceChange {
    ListAdded { title: String },
    CardAdded { list_title: String, text: String },
    ItemChecked { text: String },
}

impl WorkspaceChange {
    fn kind(&self) -> NotificationKind {
        match self {
            WorkspaceChange::ListAdded { .. } => NotificationKind::ListAdded,
            WorkspaceChange::CardAdded { .. } => NotificationKind::CardAdded,
            WorkspaceChange::ItemChecked { .. } => NotificationKind::ItemChecked,
        }
    }

    /// Sentence shown after the sender name, e.g.
    /// `You added a new list "Venue" in Summer Gala`
    fn sentence(&self, event_title: &str) -> String {
        match self {
            WorkspaceChange::ListAdded { title } => {
                format!("added a new list \"{title}\" in {event_title}")
            }
            WorkspaceChange::CardAdded { list_title, text } => {
                format!("added a new card \"{text}\" to \"{list_title}\" in {event_title}")
            }
            WorkspaceChange::ItemChecked { text } => {
                format!("checked off \"{text}\" in {event_title}")
            }
        }
    }
}

/// Per-participant result of one broadcast
#[derive(Debug, Clone)]
pub struct Delivery {
    pub email: String,
    pub outcome: DeliveryOutcome,
}

#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    /// Notification document written; holds its ID
    Delivered(String),
    Failed(String),
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Delivered(_))
    }
}

#[derive(Clone)]
pub struct FanoutService<S> {
    store: S,
    users: UsersService<S>,
}

impl<S: DocumentStore> FanoutService<S> {
    pub fn new(store: S) -> Self {
        let users = UsersService::new(store.clone());
        Self { store, users }
    }

    /// Send a collaboration request from an open workspace.
    ///
    /// Validation happens before any store call: the email must be
    /// non-empty and not the caller's own. Membership is only granted
    /// later, when the recipient accepts from their inbox.
    pub async fn invite(&self, session: &Session, event_id: &str, email: &str) -> Result<String> {
        let clean = email.trim().to_lowercase();
        if clean.is_empty() {
            return Err(AppError::Validation("Enter an email address".into()));
        }
        if clean == session.email_lowercase() {
            return Err(AppError::Validation(
                "You are already the owner of this workspace".into(),
            ));
        }

        let (recipient_id, _) = self.users.require_by_email(&clean).await?;

        let event: Event = self
            .store
            .get(EVENTS, event_id)
            .await?
            .ok_or_else(|| AppError::EventNotFound(event_id.to_string()))?
            .decode()?;

        let sender_name = if session.display_name.trim().is_empty() {
            "A user".to_string()
        } else {
            session.display_name.clone()
        };

        let notification = Notification {
            recipient_id,
            sender_name,
            sender_email: Some(session.email_lowercase()),
            kind: NotificationKind::CollabRequest,
            event_id: Some(event_id.to_string()),
            event_title: event.title,
            body: None,
            status: STATUS_PENDING.into(),
            created_at: Utc::now(),
        };

        let id = self
            .store
            .add(NOTIFICATIONS, fields_of(&notification)?)
            .await?;

        tracing::info!("Sent collaboration request for event {} to {}", event_id, clean);
        Ok(id)
    }

    /// Tell every participant about a structural board change.
    ///
    /// The participant set is the owner's email plus the collaborator
    /// list, deduplicated and processed sequentially in sorted order.
    /// Exactly one write is attempted per participant, the actor included
    /// (their copy is sent as "You").
    pub async fn broadcast(
        &self,
        session: &Session,
        event_id: &str,
        change: WorkspaceChange,
    ) -> Result<Vec<Delivery>> {
        let event: Event = self
            .store
            .get(EVENTS, event_id)
            .await?
            .ok_or_else(|| AppError::EventNotFound(event_id.to_string()))?
            .decode()?;

        let mut participants: BTreeSet<String> =
            event.collaborators.iter().map(|e| e.to_lowercase()).collect();
        match self.users.get(&event.user_id).await? {
            Some(owner) => {
                participants.insert(owner.email.to_lowercase());
            }
            None => {
                // Owner profile missing from the directory; collaborators
                // still get their copies.
                tracing::warn!("No profile for event owner {}", event.user_id);
            }
        }

        let body = change.sentence(&event.title);
        let kind = change.kind();
        let own_email = session.email_lowercase();

        let mut deliveries = Vec::with_capacity(participants.len());
        for email in participants {
            let outcome = self
                .deliver_to(session, &email, &own_email, event_id, &event.title, kind, &body)
                .await;
            if let DeliveryOutcome::Failed(reason) = &outcome {
                tracing::warn!("Notification to {} failed: {}", email, reason);
            }
            deliveries.push(Delivery { email, outcome });
        }

        Ok(deliveries)
    }

    #[allow(clippy::too_many_arguments)]
    async fn deliver_to(
        &self,
        session: &Session,
        email: &str,
        own_email: &str,
        event_id: &str,
        event_title: &str,
        kind: NotificationKind,
        body: &str,
    ) -> DeliveryOutcome {
        let recipient_id = match self.users.find_by_email(email).await {
            Ok(Some((id, _))) => id,
            Ok(None) => return DeliveryOutcome::Failed(format!("no account for {email}")),
            Err(e) => return DeliveryOutcome::Failed(e.to_string()),
        };

        let sender_name = if email == own_email {
            "You".to_string()
        } else {
            session.first_name().to_string()
        };

        let notification = Notification {
            recipient_id,
            sender_name,
            sender_email: Some(own_email.to_string()),
            kind,
            event_id: Some(event_id.to_string()),
            event_title: event_title.to_string(),
            body: Some(body.to_string()),
            status: STATUS_PENDING.into(),
            created_at: Utc::now(),
        };

        let fields = match fields_of(&notification) {
            Ok(fields) => fields,
            Err(e) => return DeliveryOutcome::Failed(e.to_string()),
        };
        match self.store.add(NOTIFICATIONS, fields).await {
            Ok(id) => DeliveryOutcome::Delivered(id),
            Err(e) => DeliveryOutcome::Failed(e.to_string()),
        }
    }
}
