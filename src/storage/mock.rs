use super::{StorageProvider, UploadedObject};
use crate::models::ResourceType;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// In-memory storage provider that records every call.
#[derive(Clone)]
pub struct MockStorageProvider {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    next_id: Arc<Mutex<usize>>,
    base_url: String,
    upload_count: Arc<Mutex<usize>>,
    destroy_count: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
    empty_result: Arc<Mutex<bool>>,
}

impl MockStorageProvider {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(0)),
            base_url: "https://mock-storage.example.com".to_string(),
            upload_count: Arc::new(Mutex::new(0)),
            destroy_count: Arc::new(Mutex::new(0)),
            should_fail: Arc::new(Mutex::new(false)),
            empty_result: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_object(self, public_id: String, content: Vec<u8>) -> Self {
        self.objects.lock().unwrap().insert(public_id, content);
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Accept uploads but answer with no public id or URL.
    pub fn with_empty_result(self, empty: bool) -> Self {
        *self.empty_result.lock().unwrap() = empty;
        self
    }

    pub fn get_upload_count(&self) -> usize {
        *self.upload_count.lock().unwrap()
    }

    pub fn get_destroy_count(&self) -> usize {
        *self.destroy_count.lock().unwrap()
    }

    pub fn get_objects(&self) -> HashMap<String, Vec<u8>> {
        self.objects.lock().unwrap().clone()
    }
}

impl Default for MockStorageProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageProvider for MockStorageProvider {
    async fn upload(&self, path: &Path, resource_type: ResourceType) -> Result<UploadedObject> {
        *self.upload_count.lock().unwrap() += 1;

        let should_fail = *self.should_fail.lock().unwrap();
        let empty_result = *self.empty_result.lock().unwrap();
        if should_fail {
            return Err(Error::Provider("Mock upload failure".to_string()));
        }
        if empty_result {
            return Ok(UploadedObject::default());
        }

        let data = tokio::fs::read(path).await?;
        let public_id = {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            format!("{}/{}", resource_type.as_str(), *next_id)
        };
        self.objects.lock().unwrap().insert(public_id.clone(), data);

        Ok(UploadedObject {
            secure_url: Some(format!("{}/{}", self.base_url, public_id)),
            public_id: Some(public_id),
        })
    }

    async fn destroy(&self, public_id: &str, _resource_type: ResourceType) -> Result<bool> {
        *self.destroy_count.lock().unwrap() += 1;

        let should_fail = *self.should_fail.lock().unwrap();
        if should_fail {
            return Err(Error::Provider("Mock destroy failure".to_string()));
        }

        Ok(self.objects.lock().unwrap().remove(public_id).is_some())
    }
}
