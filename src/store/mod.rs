//! Remote document store interface and its SQLite-backed implementation
//!
//! The application treats the store the way the hosted backend presents it:
//! schemaless collections of JSON documents with point reads/writes,
//! field-merge updates, predicate queries, idempotent array-union updates
//! and live query subscriptions. Everything above this module talks to the
//! `DocumentStore` trait, so the persistence strategy can be swapped without
//! touching call sites.

pub mod document;
pub mod schema;
pub mod sqlite;

pub use document::{fields_of, Document, Predicate};
pub use schema::initialize_database;
pub use sqlite::SqliteStore;

use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Collection holding one document per event, `columns` board included
pub const EVENTS: &str = "events";
/// Profile documents keyed by identity-provider user ID
pub const USERS: &str = "users";
/// Pending cross-user signals, deleted on resolution
pub const NOTIFICATIONS: &str = "notifications";

/// The document database the core reads and writes.
///
/// Writes are independent, unordered operations with no version check: two
/// concurrent `set` calls on the same document race and the last completed
/// write wins. The synchronization layer relies on exactly that contract,
/// so alternative backends must keep it.
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Point read. `Ok(None)` when the document does not exist.
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>>> + Send;

    /// Merge the given fields into an existing document, replacing each
    /// named top-level field wholesale. Errors when the document is missing.
    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Create or replace a document at a caller-chosen ID
    fn put(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Insert a new document with a store-assigned ID
    fn add(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Delete a document. Deleting a missing document is not an error.
    fn delete(&self, collection: &str, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Fetch every document in the collection matching all predicates,
    /// in insertion order.
    fn query(
        &self,
        collection: &str,
        predicates: &[Predicate],
    ) -> impl Future<Output = Result<Vec<Document>>> + Send;

    /// Append `value` to the array field unless already present.
    /// Idempotent under retries. Errors when the document is missing.
    fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Live query: yields the current result set immediately, then a fresh
    /// snapshot after every change to the collection.
    fn subscribe(
        &self,
        collection: &str,
        predicates: Vec<Predicate>,
    ) -> impl Future<Output = Result<Subscription>> + Send;
}

/// Handle on a live query. Owns the feeder task; dropping or cancelling the
/// subscription tears the task down, so teardown is structural rather than
/// tied to any UI lifecycle path.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Vec<Document>>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(
        receiver: mpsc::UnboundedReceiver<Vec<Document>>,
        task: JoinHandle<()>,
    ) -> Self {
        Self { receiver, task }
    }

    /// Next snapshot of the live query. `None` once cancelled.
    pub async fn recv(&mut self) -> Option<Vec<Document>> {
        self.receiver.recv().await
    }

    pub fn cancel(&mut self) {
        self.task.abort();
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Build connection options shared by migration and application connections.
fn connect_options(db_path: &Path) -> std::result::Result<SqliteConnectOptions, sqlx::Error> {
    SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display())).map(
        |opts| {
            opts.create_if_missing(true)
                .busy_timeout(Duration::from_secs(5))
                .journal_mode(SqliteJournalMode::Wal)
        },
    )
}

/// Create and initialize a database connection pool.
///
/// Migrations run on a dedicated single-connection pool that is closed
/// before the application pool is created, so every application connection
/// is opened after the final schema has committed.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::info!("Creating document store pool at: {:?}", db_path);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let migration_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options(db_path)?)
        .await?;

    initialize_database(&migration_pool).await?;
    migration_pool.close().await;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options(db_path)?)
        .await?;

    tracing::info!("Document store pool created successfully");

    Ok(pool)
}
