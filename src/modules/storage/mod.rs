//! Storage module for attachment files
//!
//! Provides the object storage adapter that persists, locates, and removes
//! the style variants of an attachment, plus the S3-compatible client it
//! talks to.

mod adapter;
mod client;
mod s3_client;
mod signer;

pub use adapter::ObjectStorageAdapter;
pub use client::ObjectStorageClient;
pub use s3_client::S3ObjectClient;
