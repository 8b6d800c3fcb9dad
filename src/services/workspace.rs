//! Workspace synchronization engine
//!
//! Keeps one client's in-memory board consistent with the stored copy.
//! Every mutation applies to the local `columns` first (so the UI can
//! re-render immediately) and then persists the *entire* columns array in
//! one field write. There is no queueing, no version token and no merge:
//! concurrent writers race at the store and the last completed write wins.
//! That model is intentional — see the lost-update tests below.

use serde_json::Map;

use crate::config::MAX_TITLE_LENGTH;
use crate::error::{AppError, Result};
use crate::model::{Attachment, Column, Priority, Subtask, Task};
use crate::store::{DocumentStore, EVENTS};

#[derive(Clone)]
pub struct WorkspaceService<S> {
    store: S,
}

impl<S: DocumentStore> WorkspaceService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load the board for an event, as done on screen focus. An event
    /// document without a `columns` field yields an empty board.
    pub async fn load(&self, event_id: &str) -> Result<Workspace<S>> {
        let doc = self
            .store
            .get(EVENTS, event_id)
            .await?
            .ok_or_else(|| AppError::EventNotFound(event_id.to_string()))?;

        let columns = match doc.fields.get("columns") {
            Some(value) => serde_json::from_value(value.clone())?,
            None => Vec::new(),
        };

        tracing::debug!("Loaded workspace for event {}", event_id);

        Ok(Workspace {
            store: self.store.clone(),
            event_id: event_id.to_string(),
            columns,
        })
    }
}

/// Fields editable from the card detail view
#[derive(Debug, Clone)]
pub struct CardDetails {
    pub text: String,
    pub priority: Priority,
    pub description: String,
}

/// One client's loaded board session.
///
/// Holds the optimistic local copy of the columns. Edits made by other
/// collaborators after `load` are invisible until the board is re-loaded;
/// there is no live subscription on the event document.
pub struct Workspace<S> {
    store: S,
    event_id: String,
    columns: Vec<Column>,
}

impl<S: DocumentStore> Workspace<S> {
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Apply an arbitrary transform to the board, then persist it.
    /// All the named operations below ride on this path.
    pub async fn mutate<F>(&mut self, transform: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<Column>),
    {
        transform(&mut self.columns);
        self.persist().await
    }

    /// Full-document field write of the whole columns array. The local
    /// copy keeps the optimistic state even when the write fails, so a
    /// retried mutation re-sends everything.
    async fn persist(&self) -> Result<()> {
        let mut fields = Map::new();
        fields.insert("columns".into(), serde_json::to_value(&self.columns)?);

        if let Err(e) = self.store.set(EVENTS, &self.event_id, fields).await {
            tracing::error!("Workspace sync failed for {}: {}", self.event_id, e);
            return Err(e);
        }
        Ok(())
    }

    pub async fn add_list(&mut self, title: &str) -> Result<String> {
        let title = validated_title(title)?;
        let column = Column::new(title);
        let id = column.id.clone();
        self.columns.push(column);
        self.persist().await?;
        Ok(id)
    }

    pub async fn rename_list(&mut self, column_id: &str, title: &str) -> Result<()> {
        let title = validated_title(title)?;
        self.column_mut(column_id)?.title = title;
        self.persist().await
    }

    pub async fn remove_list(&mut self, column_id: &str) -> Result<()> {
        let before = self.columns.len();
        self.columns.retain(|c| c.id != column_id);
        if self.columns.len() == before {
            return Err(AppError::ColumnNotFound(column_id.to_string()));
        }
        self.persist().await
    }

    pub async fn add_card(&mut self, column_id: &str, text: &str) -> Result<String> {
        let text = validated_title(text)?;
        let task = Task::new(text);
        let id = task.id.clone();
        self.column_mut(column_id)?.tasks.push(task);
        self.persist().await?;
        Ok(id)
    }

    pub async fn remove_card(&mut self, column_id: &str, card_id: &str) -> Result<()> {
        let column = self.column_mut(column_id)?;
        let before = column.tasks.len();
        column.tasks.retain(|t| t.id != card_id);
        if column.tasks.len() == before {
            return Err(AppError::CardNotFound(card_id.to_string()));
        }
        self.persist().await
    }

    /// Flip a card's completion state; returns the new state
    pub async fn toggle_card(&mut self, column_id: &str, card_id: &str) -> Result<bool> {
        let task = self.card_mut(column_id, card_id)?;
        task.completed = !task.completed;
        let completed = task.completed;
        self.persist().await?;
        Ok(completed)
    }

    /// Save the card detail view: title, priority and description together
    pub async fn save_card_details(
        &mut self,
        column_id: &str,
        card_id: &str,
        details: CardDetails,
    ) -> Result<()> {
        let text = validated_title(&details.text)?;
        let task = self.card_mut(column_id, card_id)?;
        task.text = text;
        task.priority = details.priority;
        task.description = details.description;
        self.persist().await
    }

    pub async fn add_subtask(
        &mut self,
        column_id: &str,
        card_id: &str,
        text: &str,
    ) -> Result<String> {
        let text = validated_title(text)?;
        let subtask = Subtask::new(text);
        let id = subtask.id.clone();
        self.card_mut(column_id, card_id)?.subtasks.push(subtask);
        self.persist().await?;
        Ok(id)
    }

    pub async fn toggle_subtask(
        &mut self,
        column_id: &str,
        card_id: &str,
        subtask_id: &str,
    ) -> Result<bool> {
        let task = self.card_mut(column_id, card_id)?;
        let subtask = task
            .subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .ok_or_else(|| AppError::CardNotFound(subtask_id.to_string()))?;
        subtask.completed = !subtask.completed;
        let completed = subtask.completed;
        self.persist().await?;
        Ok(completed)
    }

    pub async fn remove_subtask(
        &mut self,
        column_id: &str,
        card_id: &str,
        subtask_id: &str,
    ) -> Result<()> {
        let task = self.card_mut(column_id, card_id)?;
        let before = task.subtasks.len();
        task.subtasks.retain(|s| s.id != subtask_id);
        if task.subtasks.len() == before {
            return Err(AppError::CardNotFound(subtask_id.to_string()));
        }
        self.persist().await
    }

    pub async fn add_attachment(
        &mut self,
        column_id: &str,
        card_id: &str,
        attachment: Attachment,
    ) -> Result<()> {
        self.card_mut(column_id, card_id)?.attachments.push(attachment);
        self.persist().await
    }

    /// Drop the attachment record from the card. The blob itself is kept;
    /// unreferenced blobs are not collected.
    pub async fn remove_attachment(
        &mut self,
        column_id: &str,
        card_id: &str,
        attachment_id: &str,
    ) -> Result<()> {
        let task = self.card_mut(column_id, card_id)?;
        let before = task.attachments.len();
        task.attachments.retain(|a| a.id != attachment_id);
        if task.attachments.len() == before {
            return Err(AppError::CardNotFound(attachment_id.to_string()));
        }
        self.persist().await
    }

    fn column_mut(&mut self, column_id: &str) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.id == column_id)
            .ok_or_else(|| AppError::ColumnNotFound(column_id.to_string()))
    }

    fn card_mut(&mut self, column_id: &str, card_id: &str) -> Result<&mut Task> {
        self.columns
            .iter_mut()
            .find(|c| c.id == column_id)
            .ok_or_else(|| AppError::ColumnNotFound(column_id.to_string()))?
            .tasks
            .iter_mut()
            .find(|t| t.id == card_id)
            .ok_or_else(|| AppError::CardNotFound(card_id.to_string()))
    }
}

fn validated_title(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Title cannot be empty".into()));
    }
    if trimmed.len() > MAX_TITLE_LENGTH {
        return Err(AppError::Validation("Title is too long".into()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{fields_of, SqliteStore};
    use serde_json::json;

    async fn store_with_event() -> (SqliteStore, String) {
        let store = SqliteStore::in_memory().await.unwrap();
        let fields = fields_of(&json!({
            "userId": "u-owner",
            "title": "Summer Gala",
            "collaborators": [],
            "columns": [],
        }))
        .unwrap();
        let event_id = store.add(EVENTS, fields).await.unwrap();
        (store, event_id)
    }

    #[tokio::test]
    async fn board_edits_round_trip_through_the_store() {
        let (store, event_id) = store_with_event().await;
        let service = WorkspaceService::new(store);

        let mut board = service.load(&event_id).await.unwrap();
        let list_id = board.add_list("Logistics").await.unwrap();
        let card_id = board.add_card(&list_id, "Rent chairs").await.unwrap();
        board.toggle_card(&list_id, &card_id).await.unwrap();

        let reloaded = service.load(&event_id).await.unwrap();
        assert_eq!(reloaded.columns().len(), 1);
        assert_eq!(reloaded.columns()[0].title, "Logistics");
        assert!(reloaded.columns()[0].tasks[0].completed);
    }

    #[tokio::test]
    async fn card_details_round_trip() {
        let (store, event_id) = store_with_event().await;
        let service = WorkspaceService::new(store);

        let mut board = service.load(&event_id).await.unwrap();
        let list_id = board.add_list("Music").await.unwrap();
        let card_id = board.add_card(&list_id, "Book DJ").await.unwrap();
        board
            .save_card_details(
                &list_id,
                &card_id,
                CardDetails {
                    text: "Book DJ".into(),
                    priority: Priority::B,
                    description: "x".into(),
                },
            )
            .await
            .unwrap();

        let reloaded = service.load(&event_id).await.unwrap();
        let task = &reloaded.columns()[0].tasks[0];
        assert_eq!(task.priority, Priority::B);
        assert_eq!(task.description, "x");
    }

    #[tokio::test]
    async fn rename_and_remove_lists_persist() {
        let (store, event_id) = store_with_event().await;
        let service = WorkspaceService::new(store);

        let mut board = service.load(&event_id).await.unwrap();
        let keep = board.add_list("Logistics").await.unwrap();
        let scratch = board.add_list("Scratch").await.unwrap();
        board.rename_list(&keep, "Venue logistics").await.unwrap();
        board.remove_list(&scratch).await.unwrap();

        let reloaded = service.load(&event_id).await.unwrap();
        assert_eq!(reloaded.columns().len(), 1);
        assert_eq!(reloaded.columns()[0].title, "Venue logistics");
    }

    #[tokio::test]
    async fn remove_card_persists_and_misses_fail() {
        let (store, event_id) = store_with_event().await;
        let service = WorkspaceService::new(store);

        let mut board = service.load(&event_id).await.unwrap();
        let list_id = board.add_list("Catering").await.unwrap();
        let card_id = board.add_card(&list_id, "Choose menu").await.unwrap();
        board.remove_card(&list_id, &card_id).await.unwrap();

        let reloaded = service.load(&event_id).await.unwrap();
        assert!(reloaded.columns()[0].tasks.is_empty());

        assert!(matches!(
            board.remove_card(&list_id, "no-such-card").await,
            Err(AppError::CardNotFound(_))
        ));
        assert!(matches!(
            board.rename_list("no-such-list", "x").await,
            Err(AppError::ColumnNotFound(_))
        ));
        assert!(matches!(
            board.remove_list("no-such-list").await,
            Err(AppError::ColumnNotFound(_))
        ));
    }

    #[tokio::test]
    async fn lost_update_when_two_sessions_race() {
        let (store, event_id) = store_with_event().await;
        let service = WorkspaceService::new(store);

        // Both sessions load the same empty board
        let mut first = service.load(&event_id).await.unwrap();
        let mut second = service.load(&event_id).await.unwrap();

        first.add_list("Venue").await.unwrap();
        second.add_list("Budget").await.unwrap();

        // The second whole-document write silently overwrites the first
        let final_state = service.load(&event_id).await.unwrap();
        let titles: Vec<&str> = final_state.columns().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Budget"]);
    }

    #[tokio::test]
    async fn subtasks_and_attachments() {
        let (store, event_id) = store_with_event().await;
        let service = WorkspaceService::new(store);

        let mut board = service.load(&event_id).await.unwrap();
        let list_id = board.add_list("Catering").await.unwrap();
        let card_id = board.add_card(&list_id, "Choose menu").await.unwrap();

        let subtask_id = board.add_subtask(&list_id, &card_id, "Taste samples").await.unwrap();
        assert!(board.toggle_subtask(&list_id, &card_id, &subtask_id).await.unwrap());

        board
            .add_attachment(
                &list_id,
                &card_id,
                Attachment {
                    id: "att-1".into(),
                    url: "blob://abc".into(),
                    name: "menu.pdf".into(),
                    size: 1024,
                },
            )
            .await
            .unwrap();

        let reloaded = service.load(&event_id).await.unwrap();
        let task = &reloaded.columns()[0].tasks[0];
        assert_eq!(task.subtasks.len(), 1);
        assert!(task.subtasks[0].completed);
        assert_eq!(task.attachments[0].name, "menu.pdf");

        board.remove_attachment(&list_id, &card_id, "att-1").await.unwrap();
        let reloaded = service.load(&event_id).await.unwrap();
        assert!(reloaded.columns()[0].tasks[0].attachments.is_empty());
    }

    #[tokio::test]
    async fn empty_titles_rejected_before_any_write() {
        let (store, event_id) = store_with_event().await;
        let service = WorkspaceService::new(store);

        let mut board = service.load(&event_id).await.unwrap();
        assert!(matches!(
            board.add_list("   ").await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(board.columns().is_empty());
    }

    #[tokio::test]
    async fn load_missing_event_fails() {
        let store = SqliteStore::in_memory().await.unwrap();
        let service = WorkspaceService::new(store);
        assert!(matches!(
            service.load("nope").await.err(),
            Some(AppError::EventNotFound(_))
        ));
    }
}
