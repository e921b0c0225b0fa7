use std::env;

use crate::shared::types::{Acl, AttachmentDescriptor, S3Credentials, Scheme, Style};

#[derive(Debug, Clone)]
pub struct Config {
    pub s3: S3Config,
    pub attachment: AttachmentConfig,
}

/// S3/MinIO connection settings
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Access key for authentication
    pub key: String,
    /// Secret key for authentication
    pub secret: String,
    /// AWS region, also the location constraint for created buckets
    pub region: String,
    pub scheme: Scheme,
    /// Custom S3-compatible endpoint URL (optional, defaults to AWS)
    pub endpoint: Option<String>,
    /// Bucket name for storing attachments
    pub bucket: String,
    /// Canned ACL applied to buckets and objects
    pub acl: Acl,
}

/// Attachment naming and retention settings
#[derive(Debug, Clone)]
pub struct AttachmentConfig {
    pub name: String,
    pub class_name: String,
    /// Path template, e.g. `{class}/{attachment}/{id_partition}/{style}/{filename}`
    pub path: String,
    pub styles: Vec<Style>,
    pub keep_old_files: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            // Only error if it's not "file not found" - that's acceptable
            if !e.not_found() {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            s3: S3Config::from_env()?,
            attachment: AttachmentConfig::from_env()?,
        })
    }

    /// Build the descriptor for one model instance
    pub fn descriptor(
        &self,
        instance_id: Option<u64>,
        original_filename: Option<String>,
    ) -> AttachmentDescriptor {
        AttachmentDescriptor {
            name: self.attachment.name.clone(),
            class_name: self.attachment.class_name.clone(),
            instance_id,
            original_filename,
            updated_at: None,
            credentials: S3Credentials {
                key: self.s3.key.clone(),
                secret: self.s3.secret.clone(),
                region: self.s3.region.clone(),
                scheme: self.s3.scheme,
                endpoint: self.s3.endpoint.clone(),
            },
            bucket: self.s3.bucket.clone(),
            acl: self.s3.acl,
            path: self.attachment.path.clone(),
            styles: self.attachment.styles.clone(),
            keep_old_files: self.attachment.keep_old_files,
        }
    }
}

impl S3Config {
    const DEFAULT_REGION: &'static str = "us-east-1";

    pub fn from_env() -> Result<Self, String> {
        let key = env::var("S3_KEY").map_err(|_| "S3_KEY must be set".to_string())?;

        let secret = env::var("S3_SECRET").map_err(|_| "S3_SECRET must be set".to_string())?;

        let region = env::var("S3_REGION").unwrap_or_else(|_| Self::DEFAULT_REGION.to_string());

        let scheme = env::var("S3_SCHEME")
            .unwrap_or_else(|_| "https".to_string())
            .parse::<Scheme>()
            .map_err(|e| format!("Invalid S3_SCHEME: {}", e))?;

        // Only use the endpoint if it is non-empty
        let endpoint = env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty());

        let bucket = env::var("S3_BUCKET").map_err(|_| "S3_BUCKET must be set".to_string())?;

        let acl = env::var("S3_ACL")
            .unwrap_or_else(|_| Acl::default().to_string())
            .parse::<Acl>()
            .map_err(|e| format!("Invalid S3_ACL: {}", e))?;

        Ok(Self {
            key,
            secret,
            region,
            scheme,
            endpoint,
            bucket,
            acl,
        })
    }
}

impl AttachmentConfig {
    const DEFAULT_PATH: &'static str = "{class}/{attachment}/{id_partition}/{style}/{filename}";

    pub fn from_env() -> Result<Self, String> {
        let name = env::var("ATTACHMENT_NAME").unwrap_or_else(|_| "attachment".to_string());

        let class_name = env::var("ATTACHMENT_CLASS").unwrap_or_else(|_| "Model".to_string());

        let path = env::var("ATTACHMENT_PATH").unwrap_or_else(|_| Self::DEFAULT_PATH.to_string());

        let styles = parse_styles(
            &env::var("ATTACHMENT_STYLES").unwrap_or_else(|_| "original".to_string()),
        )?;

        let keep_old_files = parse_bool(
            &env::var("ATTACHMENT_KEEP_OLD_FILES").unwrap_or_else(|_| "false".to_string()),
        )
        .ok_or_else(|| "ATTACHMENT_KEEP_OLD_FILES must be true or false".to_string())?;

        Ok(Self {
            name,
            class_name,
            path,
            styles,
            keep_old_files,
        })
    }
}

/// Parse a comma-separated style list such as `original,thumb:100x100#`
fn parse_styles(raw: &str) -> Result<Vec<Style>, String> {
    let styles = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Style>().map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    if styles.is_empty() {
        return Err("ATTACHMENT_STYLES must list at least one style".to_string());
    }
    Ok(styles)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_styles() {
        let styles = parse_styles("original, thumb:100x100#,,medium:300x300").unwrap();
        assert_eq!(
            styles,
            vec![
                Style::new("original"),
                Style::with_dimensions("thumb", "100x100#"),
                Style::with_dimensions("medium", "300x300"),
            ]
        );
        assert!(parse_styles(" , ").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool(""), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_descriptor_from_config() {
        let config = Config {
            s3: S3Config {
                key: "key".to_string(),
                secret: "secret".to_string(),
                region: "eu-central-1".to_string(),
                scheme: Scheme::Https,
                endpoint: Some("http://localhost:9000".to_string()),
                bucket: "uploads".to_string(),
                acl: Acl::Private,
            },
            attachment: AttachmentConfig {
                name: "avatar".to_string(),
                class_name: "User".to_string(),
                path: AttachmentConfig::DEFAULT_PATH.to_string(),
                styles: vec![Style::new("original")],
                keep_old_files: true,
            },
        };

        let descriptor = config.descriptor(Some(7), Some("me.png".to_string()));
        assert_eq!(descriptor.bucket, "uploads");
        assert_eq!(descriptor.acl, Acl::Private);
        assert_eq!(descriptor.credentials.region, "eu-central-1");
        assert_eq!(
            descriptor.credentials.endpoint.as_deref(),
            Some("http://localhost:9000")
        );
        assert_eq!(descriptor.instance_id, Some(7));
        assert!(descriptor.keep_old_files);
        assert!(descriptor.validated().is_ok());
    }
}
