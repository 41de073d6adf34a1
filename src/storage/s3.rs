use super::mime::{detect_media_mime, extension_for};
use super::{StorageProvider, UploadedObject};
use crate::models::{ResourceType, S3Config};
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{config::Region, types::ObjectCannedAcl, Client as S3Client};
use std::path::Path;
use uuid::Uuid;

pub struct S3Provider {
    client: S3Client,
    bucket: String,
    base_url: String,
}

impl S3Provider {
    pub async fn new(config: S3Config) -> Result<Self> {
        let credentials = aws_sdk_s3::config::Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "lms-assets",
        );

        // S3-compatible stores generally ignore the region
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new("us-east-1"))
            .endpoint_url(config.endpoint)
            .load()
            .await;

        Ok(Self {
            client: S3Client::new(&sdk_config),
            bucket: config.bucket,
            base_url: config.base_url,
        })
    }

    fn get_public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

/// Object key for a new upload, e.g. `images/<uuid>.png`.
fn object_key(resource_type: ResourceType, mime: &str) -> String {
    format!(
        "{}s/{}.{}",
        resource_type.as_str(),
        Uuid::new_v4(),
        extension_for(mime)
    )
}

#[async_trait]
impl StorageProvider for S3Provider {
    async fn upload(&self, path: &Path, resource_type: ResourceType) -> Result<UploadedObject> {
        let data = tokio::fs::read(path).await?;
        let content_type = detect_media_mime(&data, resource_type);
        let key = object_key(resource_type, content_type);

        tracing::debug!(
            "Uploading {} ({} bytes, {}) to s3://{}/{}",
            path.display(),
            data.len(),
            content_type,
            self.bucket,
            key
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| Error::S3(format!("Failed to upload file: {}", e)))?;

        Ok(UploadedObject {
            secure_url: Some(self.get_public_url(&key)),
            public_id: Some(key),
        })
    }

    async fn destroy(&self, public_id: &str, _resource_type: ResourceType) -> Result<bool> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(public_id)
            .send()
            .await
            .map_err(|e| Error::S3(format!("Failed to delete file: {}", e)))?;

        Ok(true)
    }
}
