//! Data models and configuration
//!
//! Defines the media and certificate records handed back to callers, and the
//! environment-driven configuration for storage and rendering.

use crate::certificate::CollisionPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// A stored media object. The caller persists this pair against its owning
/// course, lecture or user record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaAsset {
    pub identifier: String,
    pub secure_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Video,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRequest {
    pub student_name: String,
    pub course_title: String,
    pub certificate_id: String,
}

impl CertificateRequest {
    pub fn new(student_name: String, course_title: String, certificate_id: String) -> Self {
        Self {
            student_name,
            course_title,
            certificate_id,
        }
    }
}

/// A rendered certificate on disk. The caller owns the file from here on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateDocument {
    pub certificate_id: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Cloudinary,
    S3,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: String,
    pub bucket: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct CertificateConfig {
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub verify_base_url: String,
    pub chromium_path: String,
    pub render_timeout: Duration,
    pub collision_policy: CollisionPolicy,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            output_dir: std::env::temp_dir().join("certificates"),
            verify_base_url: DEFAULT_VERIFY_BASE_URL.to_string(),
            chromium_path: DEFAULT_CHROMIUM_PATH.to_string(),
            render_timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

pub const DEFAULT_TEMPLATE_PATH: &str = "static/certificate.html";
pub const DEFAULT_VERIFY_BASE_URL: &str = "https://learnhub.example.com/verify/";
pub const DEFAULT_CHROMIUM_PATH: &str = "chromium";
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub storage_backend: StorageBackend,
    pub cloudinary: Option<CloudinaryConfig>,
    pub s3: Option<S3Config>,
    pub certificate: CertificateConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup instead of process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| Error::Config(format!("{} not set", key)))
        };

        let storage_backend = match var("STORAGE_BACKEND").as_deref() {
            None | Some("cloudinary") => StorageBackend::Cloudinary,
            Some("s3") => StorageBackend::S3,
            Some(other) => {
                return Err(Error::Config(format!(
                    "Unknown STORAGE_BACKEND '{}'. Expected 'cloudinary' or 's3'",
                    other
                )))
            }
        };

        let cloudinary = match storage_backend {
            StorageBackend::Cloudinary => Some(CloudinaryConfig {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
            }),
            StorageBackend::S3 => None,
        };

        let s3 = match storage_backend {
            StorageBackend::S3 => Some(S3Config {
                access_key_id: required("S3_ACCESS_KEY_ID")?,
                secret_access_key: required("S3_SECRET_ACCESS_KEY")?,
                endpoint: required("S3_ENDPOINT")?,
                bucket: required("S3_BUCKET")?,
                base_url: required("S3_BASE_URL")?
                    .trim_end_matches('/')
                    .to_string(),
            }),
            StorageBackend::Cloudinary => None,
        };

        let defaults = CertificateConfig::default();
        let render_timeout = match var("CERTIFICATE_RENDER_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    Error::Config(format!(
                        "CERTIFICATE_RENDER_TIMEOUT_SECS must be a number of seconds, got '{}'",
                        raw
                    ))
                })?;
                if secs == 0 {
                    return Err(Error::Config(
                        "CERTIFICATE_RENDER_TIMEOUT_SECS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => defaults.render_timeout,
        };
        let collision_policy = match var("CERTIFICATE_COLLISION_POLICY") {
            Some(raw) => raw.parse()?,
            None => defaults.collision_policy,
        };

        let certificate = CertificateConfig {
            template_path: var("CERTIFICATE_TEMPLATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.template_path),
            output_dir: var("CERTIFICATE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            verify_base_url: var("CERTIFICATE_VERIFY_BASE_URL")
                .unwrap_or(defaults.verify_base_url),
            chromium_path: var("CHROMIUM_PATH").unwrap_or(defaults.chromium_path),
            render_timeout,
            collision_policy,
        };

        Ok(Self {
            storage_backend,
            cloudinary,
            s3,
            certificate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_media_asset_serialization() {
        let asset = MediaAsset {
            identifier: "courses/abc".to_string(),
            secure_url: "https://res.cloudinary.com/demo/image/upload/courses/abc.png".to_string(),
        };

        let json = serde_json::to_string(&asset).unwrap();
        assert!(json.contains("\"identifier\":\"courses/abc\""));

        let deserialized: MediaAsset = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, asset);
    }

    #[test]
    fn test_config_cloudinary_with_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_API_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.storage_backend, StorageBackend::Cloudinary);
        assert_eq!(config.cloudinary.unwrap().cloud_name, "demo");
        assert!(config.s3.is_none());
        assert_eq!(
            config.certificate.template_path,
            PathBuf::from(DEFAULT_TEMPLATE_PATH)
        );
        assert_eq!(config.certificate.verify_base_url, DEFAULT_VERIFY_BASE_URL);
        assert_eq!(config.certificate.render_timeout, Duration::from_secs(30));
        assert_eq!(config.certificate.collision_policy, CollisionPolicy::Overwrite);
    }

    #[test]
    fn test_config_missing_cloudinary_secret() {
        let err = Config::from_lookup(lookup(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
        ]))
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("CLOUDINARY_API_SECRET"));
    }

    #[test]
    fn test_config_s3_backend_and_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("STORAGE_BACKEND", "s3"),
            ("S3_ACCESS_KEY_ID", "id"),
            ("S3_SECRET_ACCESS_KEY", "secret"),
            ("S3_ENDPOINT", "https://nyc3.digitaloceanspaces.com"),
            ("S3_BUCKET", "lms-media"),
            ("S3_BASE_URL", "https://cdn.example.com/"),
            ("CERTIFICATE_RENDER_TIMEOUT_SECS", "5"),
            ("CERTIFICATE_COLLISION_POLICY", "reject"),
        ]))
        .unwrap();

        assert_eq!(config.storage_backend, StorageBackend::S3);
        assert!(config.cloudinary.is_none());
        assert_eq!(config.s3.unwrap().base_url, "https://cdn.example.com");
        assert_eq!(config.certificate.render_timeout, Duration::from_secs(5));
        assert_eq!(config.certificate.collision_policy, CollisionPolicy::Reject);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let err = Config::from_lookup(lookup(&[("STORAGE_BACKEND", "ftp")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = Config::from_lookup(lookup(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_API_SECRET", "secret"),
            ("CERTIFICATE_RENDER_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("CERTIFICATE_RENDER_TIMEOUT_SECS"));
    }

    #[test]
    fn test_config_rejects_zero_render_timeout() {
        let err = Config::from_lookup(lookup(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_API_SECRET", "secret"),
            ("CERTIFICATE_RENDER_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("greater than zero"));
    }
}
