//! Media asset lifecycle
//!
//! Validates local files before anything reaches the storage provider, then
//! normalizes the provider's answer into a [`MediaAsset`].

use crate::models::{MediaAsset, ResourceType};
use crate::storage::StorageProvider;
use crate::{Error, Result};
use std::path::Path;
use tracing::{debug, info};

pub struct MediaManager {
    provider: Box<dyn StorageProvider>,
}

impl MediaManager {
    pub fn new(provider: Box<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    pub async fn upload_image(&self, path: &Path) -> Result<MediaAsset> {
        self.upload(path, ResourceType::Image).await
    }

    pub async fn upload_video(&self, path: &Path) -> Result<MediaAsset> {
        self.upload(path, ResourceType::Video).await
    }

    /// Delete an image. A missing identifier is a no-op returning `false`.
    pub async fn delete_image(&self, identifier: Option<&str>) -> Result<bool> {
        self.delete(identifier, ResourceType::Image).await
    }

    /// Delete a video. A missing identifier is a no-op returning `false`.
    pub async fn delete_video(&self, identifier: Option<&str>) -> Result<bool> {
        self.delete(identifier, ResourceType::Video).await
    }

    async fn upload(&self, path: &Path, resource_type: ResourceType) -> Result<MediaAsset> {
        ensure_uploadable(path).await?;

        let uploaded = self.provider.upload(path, resource_type).await?;

        let (identifier, secure_url) = match (uploaded.public_id, uploaded.secure_url) {
            (Some(id), Some(url)) if !id.is_empty() && !url.is_empty() => (id, url),
            _ => {
                return Err(Error::Provider(format!(
                    "{} upload returned no result for {}",
                    resource_type.as_str(),
                    path.display()
                )))
            }
        };

        info!(
            "Uploaded {} {} as {}",
            resource_type.as_str(),
            path.display(),
            identifier
        );

        Ok(MediaAsset {
            identifier,
            secure_url,
        })
    }

    async fn delete(&self, identifier: Option<&str>, resource_type: ResourceType) -> Result<bool> {
        let identifier = match identifier.map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => {
                debug!("No {} identifier given, skipping delete", resource_type.as_str());
                return Ok(false);
            }
        };

        let deleted = self.provider.destroy(identifier, resource_type).await?;
        info!(
            "Deleted {} {} (confirmed: {})",
            resource_type.as_str(),
            identifier,
            deleted
        );
        Ok(deleted)
    }
}

async fn ensure_uploadable(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::Input("missing file path".to_string()));
    }

    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(()),
        _ => Err(Error::NotFound(path.to_path_buf())),
    }
}
