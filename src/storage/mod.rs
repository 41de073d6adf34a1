//! Object-storage integration for course media
//!
//! Uploads and deletes image and video binaries against a remote object
//! store (Cloudinary or any S3-compatible service).

pub mod cloudinary;
pub mod mime;
pub mod mock;
pub mod s3;

pub use cloudinary::CloudinaryProvider;
pub use mock::MockStorageProvider;
pub use s3::S3Provider;

use crate::models::ResourceType;
use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// Raw provider answer to an upload. Either field may be absent when the
/// provider accepts the request but hands back nothing usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadedObject {
    pub public_id: Option<String>,
    pub secure_url: Option<String>,
}

#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn upload(&self, path: &Path, resource_type: ResourceType) -> Result<UploadedObject>;
    /// Returns whether the provider confirmed the deletion.
    async fn destroy(&self, public_id: &str, resource_type: ResourceType) -> Result<bool>;
}
