use async_trait::async_trait;
use std::path::Path;

use crate::core::error::Result;
use crate::shared::types::Acl;

/// Operations the attachment adapter needs from an object storage service.
///
/// Implementations surface service failures as `StorageError` and never
/// retry on their own.
#[async_trait]
pub trait ObjectStorageClient: Send + Sync {
    /// Public URL of an object. No network call.
    fn get_object_url(&self, bucket: &str, key: &str) -> String;

    /// Delete the given keys in one bulk request
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()>;

    /// Delete every object whose key starts with `prefix`.
    /// Returns the number of objects deleted.
    async fn delete_matching_objects(&self, bucket: &str, prefix: &str) -> Result<usize>;

    /// Upload a local file under `key`. Without a `content_type` the
    /// implementation picks one itself.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        acl: Acl,
        content_type: Option<&str>,
    ) -> Result<()>;

    /// Check whether a bucket exists. With `accept_forbidden`, a bucket we may
    /// not access (HTTP 403) still counts as existing.
    async fn bucket_exists(&self, bucket: &str, accept_forbidden: bool) -> Result<bool>;

    async fn create_bucket(&self, bucket: &str, acl: Acl, region: &str) -> Result<()>;
}
