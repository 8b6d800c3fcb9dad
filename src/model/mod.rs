//! Domain models
//!
//! Rust structs for the documents the core reads and writes.
//! Field names serialize in camelCase to match the stored document shapes.

pub mod event;
pub mod notification;
pub mod user;
pub mod workspace;

pub use event::{CreateEventRequest, Event, UpdateEventRequest};
pub use notification::{Notification, NotificationKind, STATUS_PENDING};
pub use user::{Session, UserProfile};
pub use workspace::{Attachment, Column, Priority, Subtask, Task};
