use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use validator::Validate;

use crate::core::error::{Result, StorageError};

// =============================================================================
// ACCESS CONTROL
// =============================================================================

/// Canned ACL applied to created buckets and uploaded objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    Private,
    #[default]
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl Acl {
    /// Value sent in the `x-amz-acl` header
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::AuthenticatedRead => "authenticated-read",
            Acl::BucketOwnerRead => "bucket-owner-read",
            Acl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Acl {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(Acl::Private),
            "public-read" => Ok(Acl::PublicRead),
            "public-read-write" => Ok(Acl::PublicReadWrite),
            "authenticated-read" => Ok(Acl::AuthenticatedRead),
            "bucket-owner-read" => Ok(Acl::BucketOwnerRead),
            "bucket-owner-full-control" => Ok(Acl::BucketOwnerFullControl),
            other => Err(StorageError::Config(format!("Unknown ACL '{}'", other))),
        }
    }
}

/// URL scheme used to reach the storage endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl FromStr for Scheme {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(StorageError::Config(format!("Unknown scheme '{}'", other))),
        }
    }
}

// =============================================================================
// ATTACHMENT DESCRIPTOR
// =============================================================================

/// Credentials and endpoint settings for the object storage service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Credentials {
    /// Access key id
    pub key: String,
    /// Secret access key
    pub secret: String,
    /// Region name, also used as the bucket location constraint
    pub region: String,
    pub scheme: Scheme,
    /// Custom S3-compatible endpoint (MinIO etc). `None` means AWS.
    pub endpoint: Option<String>,
}

impl S3Credentials {
    /// Base URL of the storage service, without a trailing slash
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("{}://s3.{}.amazonaws.com", self.scheme.as_str(), self.region),
        }
    }
}

/// A named variant of an uploaded file (e.g. "original", "thumb")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub name: String,
    /// Resize geometry such as `100x100#`; unused by storage itself
    pub dimensions: Option<String>,
}

impl Style {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimensions: None,
        }
    }

    pub fn with_dimensions(name: impl Into<String>, dimensions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimensions: Some(dimensions.into()),
        }
    }
}

impl FromStr for Style {
    type Err = StorageError;

    /// Parses `name` or `name:dimensions`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (name, dimensions) = match s.split_once(':') {
            Some((name, dims)) => (name.trim(), Some(dims.trim())),
            None => (s, None),
        };

        if name.is_empty() {
            return Err(StorageError::Config(format!("Invalid style '{}'", s)));
        }

        Ok(Self {
            name: name.to_string(),
            dimensions: dimensions.filter(|d| !d.is_empty()).map(str::to_string),
        })
    }
}

/// Read-only view of an attachment's storage configuration and the
/// attributes used to build its object keys.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AttachmentDescriptor {
    /// Attachment (field) name, e.g. "avatar"
    #[validate(length(min = 1, message = "Attachment name is required"))]
    pub name: String,

    /// Owning model's class name, e.g. "User"
    pub class_name: String,

    /// Primary key of the owning model instance, if saved
    pub instance_id: Option<u64>,

    /// Client-side file name of the stored file
    pub original_filename: Option<String>,

    pub updated_at: Option<DateTime<Utc>>,

    pub credentials: S3Credentials,

    #[validate(regex(
        path = "*crate::shared::validation::BUCKET_NAME_REGEX",
        message = "Bucket name must be 3-63 lowercase letters, digits, dots or hyphens"
    ))]
    pub bucket: String,

    pub acl: Acl,

    /// Naming template, e.g. `{class}/{attachment}/{id_partition}/{style}/{filename}`
    #[validate(length(min = 1, message = "Path template is required"))]
    pub path: String,

    #[validate(length(min = 1, message = "At least one style is required"))]
    pub styles: Vec<Style>,

    /// When false, a new upload purges the style's directory first
    pub keep_old_files: bool,
}

impl AttachmentDescriptor {
    /// Run field validation, mapping failures onto `StorageError::Validation`
    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| StorageError::Validation(e.to_string()))?;
        Ok(self)
    }

    pub fn style_names(&self) -> impl Iterator<Item = &str> {
        self.styles.iter().map(|s| s.name.as_str())
    }
}

// =============================================================================
// SOURCE FILES
// =============================================================================

/// A file received from a client request, still sitting in a temporary location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    temp_path: PathBuf,
    client_name: String,
    mime_type: Option<String>,
}

impl UploadedFile {
    pub fn new(temp_path: impl Into<PathBuf>, client_name: impl Into<String>) -> Self {
        Self {
            temp_path: temp_path.into(),
            client_name: client_name.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Canonical location of the temporary file. Fails if it no longer exists.
    pub fn real_path(&self) -> Result<PathBuf> {
        Ok(std::fs::canonicalize(&self.temp_path)?)
    }
}

/// Input to a move: either an in-flight upload or a file already on disk
/// (for example the output of a resize step)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFile {
    Uploaded(UploadedFile),
    Path(PathBuf),
}

impl SourceFile {
    /// Concrete filesystem path to read the bytes from
    pub fn resolve(&self) -> Result<PathBuf> {
        match self {
            SourceFile::Uploaded(file) => file.real_path(),
            SourceFile::Path(path) => Ok(path.clone()),
        }
    }

    /// Content type reported by the client, if this is an upload that carries one
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            SourceFile::Uploaded(file) => file.mime_type(),
            SourceFile::Path(_) => None,
        }
    }
}

impl From<UploadedFile> for SourceFile {
    fn from(file: UploadedFile) -> Self {
        SourceFile::Uploaded(file)
    }
}

impl From<PathBuf> for SourceFile {
    fn from(path: PathBuf) -> Self {
        SourceFile::Path(path)
    }
}

impl From<&str> for SourceFile {
    fn from(path: &str) -> Self {
        SourceFile::Path(PathBuf::from(path))
    }
}
