//! What to do when a certificate file for the same id already exists.

use crate::{Error, Result};
use std::fs::OpenOptions;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const MAX_VERSION: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Re-issue in place; the last writer wins.
    #[default]
    Overwrite,
    /// Fail with a conflict when the file exists.
    Reject,
    /// Keep existing files and write `certificate-<id>-<n>.pdf` instead.
    VersionSuffix,
}

impl FromStr for CollisionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "overwrite" => Ok(Self::Overwrite),
            "reject" => Ok(Self::Reject),
            "version-suffix" => Ok(Self::VersionSuffix),
            other => Err(Error::Config(format!(
                "Unknown collision policy '{}'. Expected overwrite, reject or version-suffix",
                other
            ))),
        }
    }
}

pub fn certificate_file_name(certificate_id: &str) -> String {
    format!("certificate-{}.pdf", certificate_id)
}

/// Output path chosen for one render. A reserved slot owns an empty
/// placeholder file that is removed on drop unless the slot was committed,
/// so a failed or cancelled render never leaves a claim behind.
#[derive(Debug)]
pub struct OutputSlot {
    pub path: PathBuf,
    reserved: bool,
}

impl OutputSlot {
    /// Keep the file at `path`; the slot no longer cleans up.
    pub fn commit(mut self) -> PathBuf {
        self.reserved = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for OutputSlot {
    fn drop(&mut self) {
        if self.reserved {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(
                    "Failed to remove reserved certificate {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

/// Pick the output path for `certificate_id` under `output_dir`.
///
/// `Reject` and `VersionSuffix` create the file exclusively so two concurrent
/// requests cannot both claim the same path.
pub fn reserve_output(
    output_dir: &Path,
    certificate_id: &str,
    policy: CollisionPolicy,
) -> Result<OutputSlot> {
    let path = output_dir.join(certificate_file_name(certificate_id));

    match policy {
        CollisionPolicy::Overwrite => Ok(OutputSlot {
            path,
            reserved: false,
        }),
        CollisionPolicy::Reject => {
            if create_exclusive(&path)? {
                Ok(OutputSlot {
                    path,
                    reserved: true,
                })
            } else {
                Err(Error::Conflict(path))
            }
        }
        CollisionPolicy::VersionSuffix => {
            if create_exclusive(&path)? {
                return Ok(OutputSlot {
                    path,
                    reserved: true,
                });
            }
            for version in 1..=MAX_VERSION {
                let candidate =
                    output_dir.join(format!("certificate-{}-{}.pdf", certificate_id, version));
                if create_exclusive(&candidate)? {
                    return Ok(OutputSlot {
                        path: candidate,
                        reserved: true,
                    });
                }
            }
            Err(Error::Conflict(path))
        }
    }
}

/// Returns `false` when the file already exists.
fn create_exclusive(path: &Path) -> Result<bool> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == IoErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}
