//! Object storage backend for file attachments.
//!
//! An [`ObjectStorageAdapter`] takes an attachment descriptor (bucket, ACL,
//! naming template, styles) and stores, locates, and deletes the objects for
//! each of the attachment's styles in an S3-compatible bucket.

pub mod core;
pub mod modules;
pub mod shared;

pub use crate::core::error::{Result, StorageError};
pub use crate::modules::storage::{ObjectStorageAdapter, ObjectStorageClient, S3ObjectClient};
pub use crate::shared::interpolator::{Interpolator, TemplateInterpolator};
pub use crate::shared::types::{
    Acl, AttachmentDescriptor, S3Credentials, Scheme, SourceFile, Style, UploadedFile,
};
