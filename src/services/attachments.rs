//! Attachments service
//!
//! Turns user-picked files into attachment records on cards: bytes go to
//! the blob store, the card keeps only the URL, name and size.

use uuid::Uuid;

use crate::config::{MAX_ATTACHMENT_SIZE, MAX_FILENAME_LENGTH};
use crate::error::{AppError, Result};
use crate::model::Attachment;
use crate::storage::BlobStore;

#[derive(Clone)]
pub struct AttachmentsService {
    blob_store: BlobStore,
}

impl AttachmentsService {
    pub fn new(blob_store: BlobStore) -> Self {
        Self { blob_store }
    }

    /// Store the file and build the attachment record the workspace will
    /// embed on a card.
    pub async fn store_file(&self, filename: &str, data: &[u8]) -> Result<Attachment> {
        if data.is_empty() {
            return Err(AppError::Validation("Attachment is empty".into()));
        }
        if data.len() > MAX_ATTACHMENT_SIZE {
            return Err(AppError::Validation("Attachment is too large".into()));
        }

        let safe_filename = sanitize_filename(filename);
        if safe_filename.is_empty() {
            return Err(AppError::Validation("Attachment needs a filename".into()));
        }

        let url = self.blob_store.put(data).await?;

        tracing::info!(
            "Stored attachment {} ({} bytes)",
            safe_filename,
            data.len()
        );

        Ok(Attachment {
            id: Uuid::new_v4().to_string(),
            url,
            name: safe_filename,
            size: data.len() as u64,
        })
    }

    /// Fetch the bytes behind an attachment record
    pub async fn fetch(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        self.blob_store.get(&attachment.url).await
    }
}

/// Strip path separators and null bytes so a stored filename can never
/// traverse directories, and cap its length.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| *c != '/' && *c != '\\' && *c != '\0')
        .take(MAX_FILENAME_LENGTH)
        .collect()
}
