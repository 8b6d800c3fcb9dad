//! Application composition root
//!
//! Owns the store handles and hands out services sharing them. A UI shell
//! opens one `App` per process and wires screens to the service accessors.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::services::{
    AttachmentsService, EventsService, FanoutService, InboxService, UsersService, WorkspaceService,
};
use crate::storage::BlobStore;
use crate::store::SqliteStore;

#[derive(Clone)]
pub struct App {
    data_dir: PathBuf,
    store: SqliteStore,
    blob_store: BlobStore,
}

impl App {
    /// Open the application at a data directory, creating the local
    /// document store and blob store underneath it.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        tracing::info!("Opening application at {:?}", data_dir);

        std::fs::create_dir_all(data_dir)?;

        let store = SqliteStore::open(&data_dir.join("occasio.db")).await?;
        let blob_store = BlobStore::open(data_dir.join("blobs")).await?;

        tracing::info!("Application opened successfully");

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            store,
            blob_store,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn events(&self) -> EventsService<SqliteStore> {
        EventsService::new(self.store.clone())
    }

    pub fn workspace(&self) -> WorkspaceService<SqliteStore> {
        WorkspaceService::new(self.store.clone())
    }

    pub fn fanout(&self) -> FanoutService<SqliteStore> {
        FanoutService::new(self.store.clone())
    }

    pub fn inbox(&self) -> InboxService<SqliteStore> {
        InboxService::new(self.store.clone())
    }

    pub fn users(&self) -> UsersService<SqliteStore> {
        UsersService::new(self.store.clone())
    }

    pub fn attachments(&self) -> AttachmentsService {
        AttachmentsService::new(self.blob_store.clone())
    }
}

/// Initialize logging for a host process. Honors `RUST_LOG`, defaulting to
/// debug for this crate and info elsewhere.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "occasio=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
