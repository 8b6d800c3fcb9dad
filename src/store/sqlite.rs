//! SQLite-backed document store
//!
//! Documents are stored as JSON bodies in a single `documents` table keyed
//! by (collection, id). Change notifications fan out through a broadcast
//! channel; live subscriptions re-run their query on every change to their
//! collection, mirroring the snapshot-listener behavior of the hosted store.

use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use super::{create_pool, Document, DocumentStore, Predicate, Subscription};
use crate::error::{AppError, Result};

/// Capacity of the change-signal channel. A lagged subscriber simply
/// re-queries, so overflow costs a redundant snapshot, not a lost update.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    changes: broadcast::Sender<String>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    /// Open (creating if needed) a store at the given path
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = create_pool(db_path).await?;
        Ok(Self::new(pool))
    }

    /// In-memory store for tests. Single connection so every query sees
    /// the same database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        super::initialize_database(&pool).await?;
        Ok(Self::new(pool))
    }

    fn notify(&self, collection: &str) {
        // No receivers is fine; nobody is watching this collection.
        let _ = self.changes.send(collection.to_string());
    }

    async fn fetch_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT body FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(body,)| parse_body(id, &body)).transpose()
    }

    async fn write_body(&self, collection: &str, id: &str, fields: &Map<String, Value>) -> Result<()> {
        let body = serde_json::to_string(&Value::Object(fields.clone()))?;
        sqlx::query(
            "UPDATE documents SET body = ?, updated_at = ? WHERE collection = ? AND id = ?",
        )
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn run_query(&self, collection: &str, predicates: &[Predicate]) -> Result<Vec<Document>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, body FROM documents WHERE collection = ? ORDER BY rowid")
                .bind(collection)
                .fetch_all(&self.pool)
                .await?;

        let mut documents = Vec::new();
        for (id, body) in rows {
            let doc = parse_body(&id, &body)?;
            if predicates.iter().all(|p| p.matches(&doc)) {
                documents.push(doc);
            }
        }
        Ok(documents)
    }
}

fn parse_body(id: &str, body: &str) -> Result<Document> {
    match serde_json::from_str(body)? {
        Value::Object(fields) => Ok(Document {
            id: id.to_string(),
            fields,
        }),
        _ => Err(AppError::Generic(format!(
            "document {id} has a non-object body"
        ))),
    }
}

impl DocumentStore for SqliteStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.fetch_document(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        // Read-merge-write without any version check: concurrent writers
        // race and the last completed write wins, exactly like the hosted
        // store this models.
        let mut doc = self.fetch_document(collection, id).await?.ok_or_else(|| {
            AppError::DocumentNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }
        })?;

        for (key, value) in fields {
            doc.fields.insert(key, value);
        }

        self.write_body(collection, id, &doc.fields).await?;
        self.notify(collection);

        tracing::debug!("Updated document {}/{}", collection, id);
        Ok(())
    }

    async fn put(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let body = serde_json::to_string(&Value::Object(fields))?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(collection, id)
            DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.notify(collection);

        tracing::debug!("Put document {}/{}", collection, id);
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Map<String, Value>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let body = serde_json::to_string(&Value::Object(fields))?;

        sqlx::query(
            "INSERT INTO documents (collection, id, body, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(&id)
        .bind(body)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.notify(collection);

        tracing::debug!("Added document {}/{}", collection, id);
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        // Deleting an already-deleted document is a no-op, matching the
        // hosted store.
        if rows > 0 {
            self.notify(collection);
            tracing::debug!("Deleted document {}/{}", collection, id);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, predicates: &[Predicate]) -> Result<Vec<Document>> {
        self.run_query(collection, predicates).await
    }

    async fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<()> {
        let mut doc = self.fetch_document(collection, id).await?.ok_or_else(|| {
            AppError::DocumentNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }
        })?;

        let items = match doc.fields.get_mut(field) {
            Some(Value::Array(items)) => items,
            _ => {
                doc.fields.insert(field.to_string(), Value::Array(vec![]));
                match doc.fields.get_mut(field) {
                    Some(Value::Array(items)) => items,
                    _ => unreachable!(),
                }
            }
        };

        if !items.contains(&value) {
            items.push(value);
        }

        self.write_body(collection, id, &doc.fields).await?;
        self.notify(collection);

        tracing::debug!("Union on {}/{} field {}", collection, id, field);
        Ok(())
    }

    async fn subscribe(&self, collection: &str, predicates: Vec<Predicate>) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();

        // Attach to the change channel before the initial query so a write
        // landing in between still gets signaled; the worst case is one
        // redundant snapshot, never a lost one.
        let mut changes = self.changes.subscribe();
        let initial = self.run_query(collection, &predicates).await?;
        if tx.send(initial).is_err() {
            return Err(AppError::Generic("subscription closed before start".into()));
        }

        let store = self.clone();
        let collection = collection.to_string();
        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(changed) if changed == collection => {}
                    Ok(_) => continue,
                    // Lagging only means we missed intermediate signals;
                    // the fresh query below catches us up.
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                match store.run_query(&collection, &predicates).await {
                    Ok(snapshot) => {
                        if tx.send(snapshot).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Live query on {} failed: {}", collection, e);
                    }
                }
            }
        });

        Ok(Subscription::new(rx, task))
    }
}
