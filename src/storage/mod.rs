//! Storage module
//!
//! Blob storage for attachment bytes.

pub mod blob_store;

pub use blob_store::BlobStore;
