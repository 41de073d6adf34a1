//! Application wiring for media and certificate services.

use crate::certificate::CertificateRenderer;
use crate::media::MediaManager;
use crate::models::{Config, StorageBackend};
use crate::pdf::{ChromiumEngine, PdfEngine};
use crate::storage::{CloudinaryProvider, S3Provider, StorageProvider};
use crate::{Error, Result};
use tracing::info;

/// Holds the two services handed to request handlers.
pub struct App {
    pub media: MediaManager,
    pub certificates: CertificateRenderer,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub storage: Box<dyn StorageProvider>,
    pub pdf_engine: Box<dyn PdfEngine>,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices, config: &Config) -> Self {
        Self {
            media: MediaManager::new(services.storage),
            certificates: CertificateRenderer::new(&config.certificate, services.pdf_engine),
        }
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub async fn new() -> Result<Self> {
        let config = Config::from_env()?;
        Self::from_config(&config).await
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let storage: Box<dyn StorageProvider> = match config.storage_backend {
            StorageBackend::Cloudinary => {
                let cloudinary = config.cloudinary.clone().ok_or_else(|| {
                    Error::Config("Cloudinary backend selected without credentials".to_string())
                })?;
                info!("Storage provider: Cloudinary (cloud: {})", cloudinary.cloud_name);
                Box::new(CloudinaryProvider::new(cloudinary)?)
            }
            StorageBackend::S3 => {
                let s3 = config.s3.clone().ok_or_else(|| {
                    Error::Config("S3 backend selected without credentials".to_string())
                })?;
                info!("Storage provider: S3 (bucket: {})", s3.bucket);
                Box::new(S3Provider::new(s3).await?)
            }
        };

        info!(
            "Certificate renderer: {} -> {}",
            config.certificate.template_path.display(),
            config.certificate.output_dir.display()
        );
        let pdf_engine = Box::new(ChromiumEngine::new(
            config.certificate.chromium_path.clone(),
        ));

        Ok(Self::with_services(
            AppServices {
                storage,
                pdf_engine,
            },
            config,
        ))
    }
}
