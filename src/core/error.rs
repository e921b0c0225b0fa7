use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Interpolation error: {0}")]
    Interpolation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage service error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Classify a non-success HTTP status returned by the storage service
    pub fn from_status(status: u16, context: impl Into<String>) -> Self {
        let context = context.into();
        match status {
            400 => StorageError::BadRequest(context),
            401 => StorageError::Auth(context),
            403 => StorageError::Forbidden(context),
            404 => StorageError::NotFound(context),
            _ => StorageError::Internal(format!("HTTP {}: {}", status, context)),
        }
    }
}

impl From<s3::error::S3Error> for StorageError {
    fn from(e: s3::error::S3Error) -> Self {
        match e {
            s3::error::S3Error::HttpFailWithBody(status, body) => {
                StorageError::from_status(status, body)
            }
            other => StorageError::Internal(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => StorageError::from_status(status.as_u16(), e.to_string()),
            None => StorageError::Network(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
