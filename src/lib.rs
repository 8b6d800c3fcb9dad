//! Occasio core
//!
//! Collaborative event-workspace engine: the event document model (ordered
//! columns of cards with subtasks and attachments), the optimistic
//! whole-document synchronization path, notification fan-out to
//! participants, and the live notification inbox. Presentation is a thin
//! shell over the services exposed here.

pub mod app;
pub mod config;
pub mod error;
pub mod model;
pub mod services;
pub mod storage;
pub mod store;

pub use app::{init_logging, App};
pub use error::{AppError, Result};
