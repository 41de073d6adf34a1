use super::{StorageProvider, UploadedObject};
use crate::models::{CloudinaryConfig, ResourceType};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "https://api.cloudinary.com";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: Option<String>,
    secure_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

pub struct CloudinaryProvider {
    client: Client,
    config: CloudinaryConfig,
    api_base_url: String,
}

impl CloudinaryProvider {
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self::new_with_client(config, client))
    }

    pub fn new_with_client(config: CloudinaryConfig, client: Client) -> Self {
        Self {
            client,
            config,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Point the client at another API host (a local mock server in tests).
    pub fn with_api_base_url(mut self, api_base_url: String) -> Self {
        self.api_base_url = api_base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, resource_type: ResourceType, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{}",
            self.api_base_url,
            self.config.cloud_name,
            resource_type.as_str(),
            action
        )
    }

    /// Sign request parameters: sorted `key=value` pairs joined by `&`, with
    /// the API secret appended, hashed with SHA-256.
    fn sign(&self, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.config.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn signed_form(&self, params: Vec<(&'static str, String)>) -> Form {
        let signature = self.sign(&params);
        let mut form = Form::new();
        for (key, value) in params {
            form = form.text(key, value);
        }
        form.text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
    }

    async fn send(&self, url: &str, form: Form) -> Result<String> {
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Cloudinary: {}", e);
                e
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            tracing::error!("Cloudinary API error (status {}): {}", status, message);
            return Err(Error::Provider(format!(
                "Cloudinary API error (status {}): {}",
                status, message
            )));
        }

        Ok(body)
    }
}

fn timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

#[async_trait]
impl StorageProvider for CloudinaryProvider {
    async fn upload(&self, path: &Path, resource_type: ResourceType) -> Result<UploadedObject> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        tracing::debug!(
            "Uploading {} ({} bytes) to Cloudinary as {}",
            path.display(),
            data.len(),
            resource_type.as_str()
        );

        let form = self
            .signed_form(vec![("timestamp", timestamp())])
            .part("file", Part::bytes(data).file_name(file_name));

        let body = self
            .send(&self.endpoint(resource_type, "upload"), form)
            .await?;

        let parsed: UploadResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Cloudinary upload response: {}\nBody: {}", e, body);
            e
        })?;

        Ok(UploadedObject {
            public_id: parsed.public_id,
            secure_url: parsed.secure_url,
        })
    }

    async fn destroy(&self, public_id: &str, resource_type: ResourceType) -> Result<bool> {
        tracing::debug!("Destroying Cloudinary {} {}", resource_type.as_str(), public_id);

        let form = self.signed_form(vec![
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp()),
        ]);

        let body = self
            .send(&self.endpoint(resource_type, "destroy"), form)
            .await?;
        let parsed: DestroyResponse = serde_json::from_str(&body)?;

        if parsed.result != "ok" {
            tracing::warn!(
                "Cloudinary did not delete {}: result '{}'",
                public_id,
                parsed.result
            );
        }

        Ok(parsed.result == "ok")
    }
}
