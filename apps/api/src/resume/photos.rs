//! Object storage for resume photos.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::PhotoBlob;

const PHOTO_PREFIX: &str = "resume-photos";

/// Stores photo payloads and hands back durable URLs.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn put(&self, key: &str, blob: &PhotoBlob) -> Result<String, AppError>;

    async fn delete(&self, url: &str) -> Result<(), AppError>;
}

/// Object key for a new upload. Random per upload so a replaced photo never
/// collides with the one being deleted.
pub fn photo_key(blob: &PhotoBlob) -> String {
    format!("{PHOTO_PREFIX}/{}{}", Uuid::new_v4(), blob.extension())
}

/// Photos in an S3 bucket (MinIO locally), served from `public_base_url`.
#[derive(Clone)]
pub struct S3PhotoStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3PhotoStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// The object key behind one of our URLs; `None` for foreign URLs.
    fn key_for<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_base_url.as_str())?
            .strip_prefix('/')
            .filter(|key| !key.is_empty())
    }
}

#[async_trait]
impl PhotoStore for S3PhotoStore {
    async fn put(&self, key: &str, blob: &PhotoBlob) -> Result<String, AppError> {
        let content_type = blob.media_type().unwrap_or("application/octet-stream");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(blob.bytes.clone()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("photo upload failed: {e}")))?;

        info!("Uploaded photo to s3://{}/{}", self.bucket, key);
        Ok(self.url_for(key))
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        let Some(key) = self.key_for(url) else {
            warn!("Not deleting photo outside the bucket: {url}");
            return Ok(());
        };
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("photo delete failed: {e}")))?;

        info!("Deleted photo s3://{}/{}", self.bucket, key);
        Ok(())
    }
}
