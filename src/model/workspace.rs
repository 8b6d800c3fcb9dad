//! Workspace board types
//!
//! One event document embeds an ordered list of columns, each holding an
//! ordered list of tasks (cards). Order is array order everywhere; there is
//! no separate rank field. IDs are client-assigned UUIDs so the UI can key
//! list renders before the document round-trips through the store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Card priority. Stored as the single letters the board renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Priority {
    /// High
    A,
    /// Medium
    B,
    /// Low
    #[default]
    C,
}

/// A named lane within a workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Column {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            tasks: Vec::new(),
        }
    }
}

/// A card on the board.
///
/// Older documents predate priorities, descriptions, subtasks and
/// attachments, so every field added since launch defaults on deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            completed: false,
            priority: Priority::default(),
            description: String::new(),
            subtasks: Vec::new(),
            attachments: Vec::new(),
        }
    }
}

/// Checklist item under a card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            completed: false,
        }
    }
}

/// File attached to a card. The bytes live in the blob store; the card
/// only records the URL the store handed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub url: String,
    pub name: String,
    pub size: u64,
}
