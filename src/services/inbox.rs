//! Notification inbox
//!
//! Live view of the current user's pending notifications, with the two
//! resolutions: accept (grants collaborator membership, then deletes the
//! notification) and decline (deletes only). The subscription is the one
//! push-based path in the core; invitations must show up without a manual
//! refresh.

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::model::{Notification, Session, STATUS_PENDING};
use crate::store::{DocumentStore, Predicate, Subscription, EVENTS, NOTIFICATIONS};

/// A pending notification together with its document ID
#[derive(Debug, Clone)]
pub struct PendingNotification {
    pub id: String,
    pub notification: Notification,
}

#[derive(Clone)]
pub struct InboxService<S> {
    store: S,
}

impl<S: DocumentStore> InboxService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Live query for the user's pending notifications. Yields the current
    /// set immediately and a fresh snapshot after every change; cancel (or
    /// drop) when the inbox closes.
    pub async fn subscribe(&self, user_id: &str) -> Result<InboxSubscription> {
        let inner = self
            .store
            .subscribe(
                NOTIFICATIONS,
                vec![
                    Predicate::eq("recipientId", user_id),
                    Predicate::eq("status", STATUS_PENDING),
                ],
            )
            .await?;

        tracing::debug!("Inbox subscription opened for {}", user_id);
        Ok(InboxSubscription { inner })
    }

    /// One-shot fetch of the pending set, for surfaces without a live view
    pub async fn pending(&self, user_id: &str) -> Result<Vec<PendingNotification>> {
        let docs = self
            .store
            .query(
                NOTIFICATIONS,
                &[
                    Predicate::eq("recipientId", user_id),
                    Predicate::eq("status", STATUS_PENDING),
                ],
            )
            .await?;
        Ok(decode_pending(docs))
    }

    /// Accept an invitation: add the accepting email to the event's
    /// collaborator list (array union, so a retried accept cannot
    /// duplicate it), then delete the notification.
    ///
    /// Event existence is not checked first; if the event was deleted in
    /// the meantime the union write fails, the notification stays pending
    /// and the action can be retried.
    pub async fn accept(&self, session: &Session, item: &PendingNotification) -> Result<()> {
        // Activity notices carry no membership; accepting one just
        // dismisses it.
        if !item.notification.kind.grants_membership() {
            return self.decline(item).await;
        }

        let event_id = item
            .notification
            .event_id
            .as_deref()
            .ok_or_else(|| {
                AppError::Validation("Event ID is missing from this invitation".into())
            })?;

        self.store
            .array_union(
                EVENTS,
                event_id,
                "collaborators",
                Value::String(session.email_lowercase()),
            )
            .await
            .map_err(|e| match e {
                AppError::DocumentNotFound { .. } => {
                    AppError::EventNotFound(event_id.to_string())
                }
                other => other,
            })?;

        self.store.delete(NOTIFICATIONS, &item.id).await?;

        tracing::info!(
            "{} joined event {}",
            session.email_lowercase(),
            event_id
        );
        Ok(())
    }

    /// Decline: delete the notification, leave membership untouched
    pub async fn decline(&self, item: &PendingNotification) -> Result<()> {
        self.store.delete(NOTIFICATIONS, &item.id).await?;
        tracing::debug!("Declined notification {}", item.id);
        Ok(())
    }
}

/// Live inbox handle; wraps the store subscription and decodes snapshots
pub struct InboxSubscription {
    inner: Subscription,
}

impl InboxSubscription {
    /// Next snapshot of pending notifications. `None` once cancelled.
    /// Documents that fail to decode are skipped with a warning rather
    /// than poisoning the whole snapshot.
    pub async fn recv(&mut self) -> Option<Vec<PendingNotification>> {
        self.inner.recv().await.map(decode_pending)
    }

    pub fn cancel(&mut self) {
        self.inner.cancel();
    }
}

fn decode_pending(docs: Vec<crate::store::Document>) -> Vec<PendingNotification> {
    docs.into_iter()
        .filter_map(|doc| match doc.decode::<Notification>() {
            Ok(notification) => Some(PendingNotification {
                id: doc.id,
                notification,
            }),
            Err(e) => {
                tracing::warn!("Skipping malformed notification {}: {}", doc.id, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NotificationKind, UserProfile};
    use crate::services::fanout::FanoutService;
    use crate::services::users::UsersService;
    use crate::store::{fields_of, SqliteStore};
    use serde_json::json;

    fn profile(email: &str, name: &str) -> UserProfile {
        UserProfile {
            email: email.into(),
            display_name: name.into(),
            username: String::new(),
            avatar: String::new(),
        }
    }

    async fn seeded_store() -> (SqliteStore, String) {
        let store = SqliteStore::in_memory().await.unwrap();
        let users = UsersService::new(store.clone());
        users.upsert_profile("u-owner", &profile("owner@x.com", "Olive Owner")).await.unwrap();
        users.upsert_profile("u-guest", &profile("guest@x.com", "Gus Guest")).await.unwrap();

        let fields = fields_of(&json!({
            "userId": "u-owner",
            "title": "Summer Gala",
            "eventType": "Charity",
            "startDate": "2025-06-20T00:00:00Z",
            "startTime": "2025-06-20T19:00:00Z",
            "location": "City Hall",
            "createdAt": "2025-05-01T00:00:00Z",
            "collaborators": [],
            "columns": [],
        }))
        .unwrap();
        let event_id = store.add(EVENTS, fields).await.unwrap();
        (store, event_id)
    }

    async fn pending_for(store: &SqliteStore, user_id: &str) -> Vec<PendingNotification> {
        InboxService::new(store.clone()).pending(user_id).await.unwrap()
    }

    #[tokio::test]
    async fn accept_grants_membership_and_removes_notification() {
        let (store, event_id) = seeded_store().await;
        let owner = Session::new("u-owner", "owner@x.com", "Olive Owner");
        let guest = Session::new("u-guest", "guest@x.com", "Gus Guest");

        FanoutService::new(store.clone())
            .invite(&owner, &event_id, "guest@x.com")
            .await
            .unwrap();

        let inbox = InboxService::new(store.clone());
        let pending = pending_for(&store, "u-guest").await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].notification.kind, NotificationKind::CollabRequest);

        inbox.accept(&guest, &pending[0]).await.unwrap();

        let event = store.get(EVENTS, &event_id).await.unwrap().unwrap();
        assert_eq!(event.fields["collaborators"], json!(["guest@x.com"]));
        assert!(pending_for(&store, "u-guest").await.is_empty());
    }

    #[tokio::test]
    async fn double_accept_does_not_duplicate_membership() {
        let (store, event_id) = seeded_store().await;
        let owner = Session::new("u-owner", "owner@x.com", "Olive Owner");
        let guest = Session::new("u-guest", "guest@x.com", "Gus Guest");

        FanoutService::new(store.clone())
            .invite(&owner, &event_id, "guest@x.com")
            .await
            .unwrap();

        let inbox = InboxService::new(store.clone());
        let pending = pending_for(&store, "u-guest").await;

        // Simulate a retry racing the first accept: both resolve the same
        // snapshot of the notification.
        inbox.accept(&guest, &pending[0]).await.unwrap();
        inbox.accept(&guest, &pending[0]).await.unwrap();

        let event = store.get(EVENTS, &event_id).await.unwrap().unwrap();
        assert_eq!(event.fields["collaborators"], json!(["guest@x.com"]));
    }

    #[tokio::test]
    async fn decline_leaves_membership_unchanged() {
        let (store, event_id) = seeded_store().await;
        let owner = Session::new("u-owner", "owner@x.com", "Olive Owner");

        FanoutService::new(store.clone())
            .invite(&owner, &event_id, "guest@x.com")
            .await
            .unwrap();

        let inbox = InboxService::new(store.clone());
        let pending = pending_for(&store, "u-guest").await;
        inbox.decline(&pending[0]).await.unwrap();

        let event = store.get(EVENTS, &event_id).await.unwrap().unwrap();
        assert_eq!(event.fields["collaborators"], json!([]));
        assert!(pending_for(&store, "u-guest").await.is_empty());
    }

    #[tokio::test]
    async fn accepting_activity_notice_only_dismisses_it() {
        let (store, event_id) = seeded_store().await;
        let owner = Session::new("u-owner", "owner@x.com", "Olive Owner");
        let guest = Session::new("u-guest", "guest@x.com", "Gus Guest");

        FanoutService::new(store.clone())
            .broadcast(
                &owner,
                &event_id,
                crate::services::fanout::WorkspaceChange::ListAdded { title: "Venue".into() },
            )
            .await
            .unwrap();

        let inbox = InboxService::new(store.clone());
        let pending = pending_for(&store, "u-guest").await;
        assert!(pending.is_empty());

        // Make the guest a participant first, then broadcast again
        store
            .array_union(EVENTS, &event_id, "collaborators", json!("guest@x.com"))
            .await
            .unwrap();
        FanoutService::new(store.clone())
            .broadcast(
                &owner,
                &event_id,
                crate::services::fanout::WorkspaceChange::ListAdded { title: "Budget".into() },
            )
            .await
            .unwrap();

        let pending = pending_for(&store, "u-guest").await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].notification.kind, NotificationKind::ListAdded);

        inbox.accept(&guest, &pending[0]).await.unwrap();

        // Dismissed without touching the collaborator list
        assert!(pending_for(&store, "u-guest").await.is_empty());
        let event = store.get(EVENTS, &event_id).await.unwrap().unwrap();
        assert_eq!(event.fields["collaborators"], json!(["guest@x.com"]));
    }

    #[tokio::test]
    async fn accept_after_event_deleted_keeps_notification_pending() {
        let (store, event_id) = seeded_store().await;
        let owner = Session::new("u-owner", "owner@x.com", "Olive Owner");
        let guest = Session::new("u-guest", "guest@x.com", "Gus Guest");

        FanoutService::new(store.clone())
            .invite(&owner, &event_id, "guest@x.com")
            .await
            .unwrap();
        store.delete(EVENTS, &event_id).await.unwrap();

        let inbox = InboxService::new(store.clone());
        let pending = pending_for(&store, "u-guest").await;
        let err = inbox.accept(&guest, &pending[0]).await.unwrap_err();

        assert!(matches!(err, AppError::EventNotFound(_)));
        // Still pending, so the user can retry (or decline)
        assert_eq!(pending_for(&store, "u-guest").await.len(), 1);
    }

    #[tokio::test]
    async fn accept_requires_event_id() {
        let (store, _) = seeded_store().await;
        let guest = Session::new("u-guest", "guest@x.com", "Gus Guest");
        let inbox = InboxService::new(store.clone());

        let fields = fields_of(&json!({
            "recipientId": "u-guest",
            "senderName": "Olive",
            "type": "COLLAB_REQUEST",
            "eventTitle": "Gala",
            "status": "pending",
            "createdAt": "2025-05-01T00:00:00Z",
        }))
        .unwrap();
        store.add(NOTIFICATIONS, fields).await.unwrap();

        let pending = pending_for(&store, "u-guest").await;
        let err = inbox.accept(&guest, &pending[0]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn live_subscription_sees_new_invitations() {
        let (store, event_id) = seeded_store().await;
        let owner = Session::new("u-owner", "owner@x.com", "Olive Owner");
        let inbox = InboxService::new(store.clone());

        let mut sub = inbox.subscribe("u-guest").await.unwrap();
        assert!(sub.recv().await.unwrap().is_empty());

        FanoutService::new(store.clone())
            .invite(&owner, &event_id, "guest@x.com")
            .await
            .unwrap();

        let snapshot = sub.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].notification.event_title, "Summer Gala");

        sub.cancel();
        assert!(sub.recv().await.is_none());
    }
}
