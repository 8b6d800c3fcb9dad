//! Content-addressed blob storage
//!
//! Attachment bytes are keyed by their SHA-256 hash and organized under a
//! two-level directory split so no single directory grows unbounded.
//! Cards reference blobs through `blob://<hash>` URLs; the store resolves
//! those back to bytes.

use crate::error::{AppError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// URL scheme recorded on attachment records
pub const BLOB_URL_SCHEME: &str = "blob://";

#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Open a blob store rooted at the given directory, creating it if
    /// needed
    pub async fn open(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root).await?;
        tracing::info!("Blob store opened at: {:?}", root);
        Ok(Self { root })
    }

    /// Store bytes, returning the blob URL to record on the attachment.
    /// Identical content lands on the same hash, so re-uploads are free.
    pub async fn put(&self, data: &[u8]) -> Result<String> {
        let hash = content_hash(data);
        let path = self.path_for(&hash);

        if path.exists() {
            tracing::debug!("Blob already present: {}", hash);
            return Ok(self.url_for(&hash));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a temp file and rename so a crash mid-write never
        // leaves a truncated blob under its final name.
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(temp_path, &path).await?;

        tracing::debug!("Stored blob {} ({} bytes)", hash, data.len());
        Ok(self.url_for(&hash))
    }

    /// Resolve a `blob://` URL back to its bytes
    pub async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let hash = hash_from_url(url)?;
        let path = self.path_for(hash);

        if !path.exists() {
            return Err(AppError::BlobStore(format!("Blob not found: {hash}")));
        }

        let data = fs::read(&path).await?;
        tracing::debug!("Read blob {} ({} bytes)", hash, data.len());
        Ok(data)
    }

    pub async fn contains(&self, url: &str) -> Result<bool> {
        Ok(self.path_for(hash_from_url(url)?).exists())
    }

    pub fn url_for(&self, hash: &str) -> String {
        format!("{BLOB_URL_SCHEME}{hash}")
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        // blobs/ab/cd/abcd1234...
        self.root.join(&hash[0..2]).join(&hash[2..4]).join(hash)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn hash_from_url(url: &str) -> Result<&str> {
    let hash = url
        .strip_prefix(BLOB_URL_SCHEME)
        .ok_or_else(|| AppError::BlobStore(format!("Not a blob URL: {url}")))?;

    if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::BlobStore(format!("Malformed blob URL: {url}")));
    }
    Ok(hash)
}
