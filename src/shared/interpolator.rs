//! Path interpolation for attachment object keys.
//!
//! A naming template such as `{class}/{attachment}/{id_partition}/{style}/{filename}`
//! is expanded against an [`AttachmentDescriptor`] and a style name to produce
//! the concrete key an object is stored under.

use crate::core::error::{Result, StorageError};
use crate::shared::types::AttachmentDescriptor;
use crate::shared::validation::PLACEHOLDER_REGEX;

/// Turns a naming template into a concrete storage key
pub trait Interpolator: Send + Sync {
    fn interpolate(
        &self,
        template: &str,
        descriptor: &AttachmentDescriptor,
        style_name: &str,
    ) -> Result<String>;
}

/// Default interpolator supporting `{name}` placeholders
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateInterpolator;

impl TemplateInterpolator {
    pub fn new() -> Self {
        Self
    }

    fn value_for(
        &self,
        placeholder: &str,
        descriptor: &AttachmentDescriptor,
        style_name: &str,
    ) -> Result<String> {
        match placeholder {
            "bucket" => Ok(descriptor.bucket.clone()),
            "style" => Ok(style_name.to_string()),
            "attachment" => Ok(descriptor.name.clone()),
            "class" => Ok(class_path(&descriptor.class_name)),
            "id" => Ok(require_id(descriptor)?.to_string()),
            "id_partition" => Ok(id_partition(require_id(descriptor)?)),
            "filename" => Ok(require_filename(descriptor)?.to_string()),
            "basename" => {
                let filename = require_filename(descriptor)?;
                Ok(split_extension(filename).0.to_string())
            }
            "extension" => {
                let filename = require_filename(descriptor)?;
                Ok(split_extension(filename).1.unwrap_or_default().to_string())
            }
            "updated_at" => descriptor
                .updated_at
                .map(|ts| ts.timestamp().to_string())
                .ok_or_else(|| missing("updated_at", descriptor)),
            other => Err(StorageError::Interpolation(format!(
                "Unknown placeholder '{{{}}}'",
                other
            ))),
        }
    }
}

impl Interpolator for TemplateInterpolator {
    fn interpolate(
        &self,
        template: &str,
        descriptor: &AttachmentDescriptor,
        style_name: &str,
    ) -> Result<String> {
        let mut output = String::with_capacity(template.len() + 32);
        let mut last = 0;

        for captures in PLACEHOLDER_REGEX.captures_iter(template) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            output.push_str(&template[last..whole.start()]);
            output.push_str(&self.value_for(name.as_str(), descriptor, style_name)?);
            last = whole.end();
        }
        output.push_str(&template[last..]);

        Ok(output)
    }
}

fn missing(attribute: &str, descriptor: &AttachmentDescriptor) -> StorageError {
    StorageError::Interpolation(format!(
        "Attachment '{}' has no {} to interpolate",
        descriptor.name, attribute
    ))
}

fn require_id(descriptor: &AttachmentDescriptor) -> Result<u64> {
    descriptor
        .instance_id
        .ok_or_else(|| missing("instance id", descriptor))
}

fn require_filename(descriptor: &AttachmentDescriptor) -> Result<&str> {
    descriptor
        .original_filename
        .as_deref()
        .ok_or_else(|| missing("file name", descriptor))
}

/// `Admin::User` or `Admin\User` -> `Admin/User`
fn class_path(class_name: &str) -> String {
    class_name.replace("::", "/").replace('\\', "/")
}

/// 42 -> `000/000/042`, 1234567890 -> `001/234/567/890`
fn id_partition(id: u64) -> String {
    let padded = format!("{:09}", id);
    let digits = padded.as_bytes();
    let head = digits.len() % 3;

    let mut groups: Vec<&str> = Vec::with_capacity(digits.len() / 3 + 1);
    if head > 0 {
        groups.push(&padded[..head]);
    }
    let mut start = head;
    while start < digits.len() {
        groups.push(&padded[start..start + 3]);
        start += 3;
    }
    groups.join("/")
}

/// `cat.photo.jpg` -> (`cat.photo`, Some(`jpg`)); `.env` keeps its dot
fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => (&filename[..idx], Some(&filename[idx + 1..])),
        _ => (filename, None),
    }
}
