#[cfg(test)]
use crate::core::error::{Result, StorageError};

#[cfg(test)]
use crate::modules::storage::ObjectStorageClient;

#[cfg(test)]
use crate::shared::types::{Acl, AttachmentDescriptor, S3Credentials, Scheme, Style};

#[cfg(test)]
use std::path::{Path, PathBuf};

#[cfg(test)]
use std::sync::Mutex;

/// Descriptor for bucket "photos", template `{bucket}/{style}/{id}.jpg`,
/// id 42 and styles "original" and "thumb"
#[cfg(test)]
pub fn photos_descriptor() -> AttachmentDescriptor {
    AttachmentDescriptor {
        name: "photo".to_string(),
        class_name: "Album".to_string(),
        instance_id: Some(42),
        original_filename: Some("beach.jpg".to_string()),
        updated_at: None,
        credentials: S3Credentials {
            key: "test-key".to_string(),
            secret: "test-secret".to_string(),
            region: "us-east-1".to_string(),
            scheme: Scheme::Https,
            endpoint: None,
        },
        bucket: "photos".to_string(),
        acl: Acl::PublicRead,
        path: "{bucket}/{style}/{id}.jpg".to_string(),
        styles: vec![Style::new("original"), Style::with_dimensions("thumb", "100x100#")],
        keep_old_files: false,
    }
}

/// A storage request seen by [`RecordingClient`]
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DeleteObjects {
        bucket: String,
        keys: Vec<String>,
    },
    DeleteMatching {
        bucket: String,
        prefix: String,
    },
    PutObject {
        bucket: String,
        key: String,
        source: PathBuf,
        acl: Acl,
        content_type: Option<String>,
    },
    BucketExists {
        bucket: String,
        accept_forbidden: bool,
    },
    CreateBucket {
        bucket: String,
        acl: Acl,
        region: String,
    },
}

/// In-memory storage client that records every request it receives
#[cfg(test)]
pub struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    bucket_present: bool,
    exists_error: Option<u16>,
    put_error: Option<u16>,
}

#[cfg(test)]
#[allow(dead_code)]
impl RecordingClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            bucket_present: true,
            exists_error: None,
            put_error: None,
        }
    }

    pub fn with_bucket_missing(mut self) -> Self {
        self.bucket_present = false;
        self
    }

    pub fn with_exists_error(mut self, status: u16) -> Self {
        self.exists_error = Some(status);
        self
    }

    pub fn with_put_error(mut self, status: u16) -> Self {
        self.put_error = Some(status);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl ObjectStorageClient for RecordingClient {
    fn get_object_url(&self, bucket: &str, key: &str) -> String {
        format!("https://storage.test/{}/{}", bucket, key)
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        self.record(Call::DeleteObjects {
            bucket: bucket.to_string(),
            keys: keys.to_vec(),
        });
        Ok(())
    }

    async fn delete_matching_objects(&self, bucket: &str, prefix: &str) -> Result<usize> {
        self.record(Call::DeleteMatching {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        });
        Ok(0)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        acl: Acl,
        content_type: Option<&str>,
    ) -> Result<()> {
        self.record(Call::PutObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source: source.to_path_buf(),
            acl,
            content_type: content_type.map(str::to_string),
        });
        match self.put_error {
            Some(status) => Err(StorageError::from_status(status, "put rejected")),
            None => Ok(()),
        }
    }

    async fn bucket_exists(&self, bucket: &str, accept_forbidden: bool) -> Result<bool> {
        self.record(Call::BucketExists {
            bucket: bucket.to_string(),
            accept_forbidden,
        });
        match self.exists_error {
            Some(status) => Err(StorageError::from_status(status, "head rejected")),
            None => Ok(self.bucket_present),
        }
    }

    async fn create_bucket(&self, bucket: &str, acl: Acl, region: &str) -> Result<()> {
        self.record(Call::CreateBucket {
            bucket: bucket.to_string(),
            acl,
            region: region.to_string(),
        });
        Ok(())
    }
}
