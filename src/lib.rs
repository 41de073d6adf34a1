//! Media and certificate services for the LearnHub learning platform
//!
//! Moves course media in and out of object storage and issues PDF
//! certificates of completion rendered from an HTML template by a headless
//! browser.

pub mod app;
pub mod certificate;
pub mod error;
pub mod media;
pub mod models;
pub mod pdf;
pub mod storage;

pub use error::{Error, ErrorKind, Result};
