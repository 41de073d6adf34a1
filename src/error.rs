//! Error handling and custom error types
//!
//! Every failure carries a [`ErrorKind`] tag so callers (HTTP handlers) can
//! branch on the kind of failure, while the underlying cause stays reachable
//! through `std::error::Error::source`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Coarse failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid argument, detected before any I/O.
    Input,
    /// A referenced local file does not exist.
    NotFound,
    /// The object-storage provider failed or returned nothing usable.
    Provider,
    /// The certificate template is missing or unreadable.
    Template,
    /// The headless browser failed to launch, load, or print.
    Render,
    /// The certificate output path is already taken.
    Conflict,
    /// Environment configuration is missing or malformed.
    Config,
    /// Local filesystem failure outside template loading.
    Io,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Storage provider error: {0}")]
    Provider(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Failed to read certificate template {}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Render timed out after {0:?}")]
    RenderTimeout(Duration),

    #[error("Certificate already exists: {}", .0.display())]
    Conflict(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Input(_) => ErrorKind::Input,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Provider(_) | Error::Http(_) | Error::Serialization(_) | Error::S3(_) => {
                ErrorKind::Provider
            }
            Error::Template { .. } => ErrorKind::Template,
            Error::Render(_) | Error::RenderTimeout(_) => ErrorKind::Render,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Config(_) | Error::EnvVar(_) => ErrorKind::Config,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
