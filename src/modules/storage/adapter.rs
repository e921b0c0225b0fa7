//! Object storage backend for attachments
//!
//! Bridges an attachment's lifecycle (save, replace, delete) to object
//! storage calls. One adapter is created per attachment-processing event and
//! dropped afterwards.

use std::sync::Arc;
use tracing::{debug, info};

use crate::core::error::Result;
use crate::modules::storage::client::ObjectStorageClient;
use crate::modules::storage::s3_client::S3ObjectClient;
use crate::shared::interpolator::{Interpolator, TemplateInterpolator};
use crate::shared::types::{AttachmentDescriptor, SourceFile, Style};

pub struct ObjectStorageAdapter<'a> {
    attachment: &'a AttachmentDescriptor,
    client: Arc<dyn ObjectStorageClient>,
    interpolator: Arc<dyn Interpolator>,
    /// Set once the bucket is known to exist; never re-checked afterwards
    bucket_exists: bool,
}

impl<'a> ObjectStorageAdapter<'a> {
    /// Create an adapter backed by an S3 client built from the attachment's credentials
    pub fn new(attachment: &'a AttachmentDescriptor) -> Result<Self> {
        let client = Arc::new(S3ObjectClient::new(&attachment.credentials)?);
        Ok(Self::with_client(
            attachment,
            client,
            Arc::new(TemplateInterpolator::new()),
        ))
    }

    pub fn with_client(
        attachment: &'a AttachmentDescriptor,
        client: Arc<dyn ObjectStorageClient>,
        interpolator: Arc<dyn Interpolator>,
    ) -> Self {
        Self {
            attachment,
            client,
            interpolator,
            bucket_exists: false,
        }
    }

    pub fn attachment(&self) -> &AttachmentDescriptor {
        self.attachment
    }

    /// Whether the bucket has been verified (or created) by this adapter
    pub fn bucket_exists_flag(&self) -> bool {
        self.bucket_exists
    }

    /// Public URL of the file stored for a style
    pub async fn url(&mut self, style_name: &str) -> Result<String> {
        let key = self.path(style_name)?;
        let bucket = self.bucket().await?;
        Ok(self.client.get_object_url(&bucket, &key))
    }

    /// Key the file for a style is stored under
    pub fn path(&self, style_name: &str) -> Result<String> {
        self.interpolator
            .interpolate(&self.attachment.path, self.attachment, style_name)
    }

    /// Clear the attachment without a replacement
    pub async fn reset(&mut self) -> Result<()> {
        self.remove().await
    }

    /// Delete the objects of every style in one request
    pub async fn remove(&mut self) -> Result<()> {
        let keys = self.keys()?;
        let bucket = self.bucket().await?;
        self.client.delete_objects(&bucket, &keys).await?;

        info!(
            "Removed {} style object(s) of attachment '{}' from bucket '{}'",
            keys.len(),
            self.attachment.name,
            bucket
        );
        Ok(())
    }

    /// Store a file for a style.
    ///
    /// Unless the attachment keeps old files, everything under the style's
    /// directory is deleted first.
    pub async fn move_file(&mut self, file: &SourceFile, style: &Style) -> Result<()> {
        self.clean_directory(&style.name).await?;

        let key = self.path(&style.name)?;
        let source = file.resolve()?;
        let bucket = self.bucket().await?;

        self.client
            .put_object(
                &bucket,
                &key,
                &source,
                self.attachment.acl,
                file.mime_type(),
            )
            .await?;

        info!(
            "Stored style '{}' of attachment '{}' at '{}/{}'",
            style.name, self.attachment.name, bucket, key
        );
        Ok(())
    }

    /// Create the bucket unless it already exists, then mark it as known
    pub async fn build_bucket(&mut self, bucket_name: &str) -> Result<()> {
        if !self.client.bucket_exists(bucket_name, true).await? {
            debug!("Bucket '{}' not found, creating it", bucket_name);
            self.client
                .create_bucket(
                    bucket_name,
                    self.attachment.acl,
                    &self.attachment.credentials.region,
                )
                .await?;
        }

        self.bucket_exists = true;
        Ok(())
    }

    /// One key per configured style, in style order
    fn keys(&self) -> Result<Vec<String>> {
        self.attachment
            .style_names()
            .map(|name| self.path(name))
            .collect()
    }

    async fn clean_directory(&mut self, style_name: &str) -> Result<()> {
        if self.attachment.keep_old_files {
            return Ok(());
        }

        let key = self.path(style_name)?;
        let directory = dirname(&key);
        let bucket = self.bucket().await?;
        let deleted = self
            .client
            .delete_matching_objects(&bucket, directory)
            .await?;

        debug!(
            "Cleaned {} old object(s) under '{}' in bucket '{}'",
            deleted, directory, bucket
        );
        Ok(())
    }

    /// Bucket name, building the bucket first if it has not been verified yet
    async fn bucket(&mut self) -> Result<String> {
        let bucket_name = self.attachment.bucket.clone();
        if !self.bucket_exists {
            self.build_bucket(&bucket_name).await?;
        }
        Ok(bucket_name)
    }
}

/// Directory part of a key: `a/b/c.jpg` -> `a/b`, `c.jpg` -> `.`, `/c.jpg` -> `/`
fn dirname(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => "/",
        Some(idx) => match trimmed[..idx].trim_end_matches('/') {
            "" => "/",
            dir => dir,
        },
        None if key.starts_with('/') => "/",
        None => ".",
    }
}
