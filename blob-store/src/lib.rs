//! Blob storage for uploaded report artifacts.
//!
//! Everything goes through [`BlobStore`]: `store` persists bytes and hands
//! back an opaque locator, `fetch` reads them back. Adapters:
//!
//! - [`MemoryBlobStore`]: `memory://` locators, process-local.
//! - [`LocalBlobStore`]: files under a root directory, `local://` locators.
//! - [`CloudinaryBlobStore`]: unsigned uploads to Cloudinary, HTTPS locators.

pub mod cloudinary;
pub mod errors;
pub mod local;
pub mod memory;

use std::{future::Future, pin::Pin};

pub use cloudinary::{CloudinaryBlobStore, CloudinaryConfig};
pub use errors::BlobError;
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

pub type BlobFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BlobError>> + Send + 'a>>;

/// What the caller knows about an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentHint {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl ContentHint {
    pub fn new(file_name: Option<String>, content_type: Option<String>) -> Self {
        Self {
            file_name,
            content_type,
        }
    }

    /// Declared content type, or one guessed from the file name.
    pub fn effective_content_type(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
            .map(str::to_owned)
            .or_else(|| {
                self.file_name
                    .as_deref()
                    .and_then(|n| mime_guess::from_path(n).first_raw())
                    .map(str::to_owned)
            })
    }

    /// File name reduced to `[A-Za-z0-9._-]`, never empty.
    pub(crate) fn safe_name(&self) -> String {
        let cleaned: String = self
            .file_name
            .as_deref()
            .unwrap_or_default()
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let trimmed = cleaned.trim_start_matches('.');
        if trimmed.is_empty() {
            "upload".to_owned()
        } else {
            trimmed.to_owned()
        }
    }
}

/// Binary object storage addressed by opaque URLs.
pub trait BlobStore: Send + Sync {
    /// Persists `bytes` and returns the locator to store in the report.
    fn store<'a>(&'a self, bytes: Vec<u8>, hint: &'a ContentHint) -> BlobFuture<'a, String>;

    fn fetch<'a>(&'a self, url: &'a str) -> BlobFuture<'a, Vec<u8>>;
}
