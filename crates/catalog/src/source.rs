//! Where the manifest and allow-list are read from.

use std::path::PathBuf;

use async_trait::async_trait;
use aws_types::SdkConfig;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("object {key} not found: {reason}")]
    NotFound { key: String, reason: String },

    #[error("object {key} is not valid UTF-8")]
    NotUtf8 { key: String },

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),
}

/// Read-only text object store.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    async fn get_text(&self, key: &str) -> Result<String, SourceError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Objects in an S3 bucket.
pub struct S3Source {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Source {
    pub fn new(sdk_config: &SdkConfig, bucket: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectSource for S3Source {
    async fn get_text(&self, key: &str) -> Result<String, SourceError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(se) if se.is_no_such_key() => SourceError::NotFound {
                    key: key.to_string(),
                    reason: se.to_string(),
                },
                _ => SourceError::AwsSdk(e.to_string()),
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| SourceError::AwsSdk(e.to_string()))?
            .into_bytes();

        debug!(bucket = %self.bucket, key, bytes = bytes.len(), "Fetched object");
        String::from_utf8(bytes.to_vec()).map_err(|_| SourceError::NotUtf8 {
            key: key.to_string(),
        })
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}

/// Objects laid out under a local directory, keyed by relative path.
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectSource for LocalSource {
    async fn get_text(&self, key: &str) -> Result<String, SourceError> {
        let path = self.root.join(key);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::InvalidData => SourceError::NotUtf8 {
                    key: key.to_string(),
                },
                _ => SourceError::NotFound {
                    key: key.to_string(),
                    reason: e.to_string(),
                },
            })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
