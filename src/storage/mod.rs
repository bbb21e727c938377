use std::fs::{self, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::upload::split_extension;

const MAX_NAME_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub path: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("invalid blob name: {0:?}")]
    InvalidName(String),
    #[error("no free blob name derived from {0:?}")]
    NameExhausted(String),
    #[error("blob store filesystem error: {0}")]
    Io(#[source] std::io::Error),
}

/// Append-only blob storage. `save` never overwrites; a taken name gets a
/// random suffix.
pub trait BlobStore: Send + Sync + 'static {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<StoredBlob, BlobStoreError>;
    fn url(&self, path: &str) -> String;
    fn exists(&self, name: &str) -> Result<bool, BlobStoreError>;
}

pub type SharedBlobStore = Arc<dyn BlobStore>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_url_prefix: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_url_prefix: impl Into<String>) -> Self {
        let mut public_url_prefix = public_url_prefix.into();
        if !public_url_prefix.ends_with('/') {
            public_url_prefix.push('/');
        }
        Self {
            root: root.into(),
            public_url_prefix,
        }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }
}

impl BlobStore for LocalBlobStore {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<StoredBlob, BlobStoreError> {
        validate_blob_name(name)?;
        fs::create_dir_all(self.root.as_path()).map_err(BlobStoreError::Io)?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                name.to_string()
            } else {
                suffixed_name(name)
            };
            let path = self.root.join(candidate.as_str());
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => continue,
                Err(e) => return Err(BlobStoreError::Io(e)),
            };
            file.write_all(bytes).map_err(BlobStoreError::Io)?;
            debug!(path = %candidate, bytes = bytes.len(), "stored blob");
            return Ok(StoredBlob {
                url: self.url(candidate.as_str()),
                path: candidate,
            });
        }
        Err(BlobStoreError::NameExhausted(name.to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.public_url_prefix, path)
    }

    fn exists(&self, name: &str) -> Result<bool, BlobStoreError> {
        validate_blob_name(name)?;
        self.root
            .join(name)
            .try_exists()
            .map_err(BlobStoreError::Io)
    }
}

fn validate_blob_name(name: &str) -> Result<(), BlobStoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(BlobStoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn suffixed_name(name: &str) -> String {
    let (stem, extension) = split_extension(name);
    let token = Uuid::new_v4().simple().to_string();
    format!("{stem}_{}{extension}", &token[..7])
}
