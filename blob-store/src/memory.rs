use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{BlobError, BlobFuture, BlobStore, ContentHint};

const SCHEME: &str = "memory://";

/// Keeps blobs in a map. Intended for tests and local development.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts bytes under an exact locator, bypassing naming.
    pub async fn insert(&self, url: impl Into<String>, bytes: Vec<u8>) {
        self.blobs.write().await.insert(url.into(), bytes);
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

impl BlobStore for MemoryBlobStore {
    fn store<'a>(&'a self, bytes: Vec<u8>, hint: &'a ContentHint) -> BlobFuture<'a, String> {
        Box::pin(async move {
            let url = format!("{SCHEME}{}-{}", Uuid::new_v4(), hint.safe_name());
            self.blobs.write().await.insert(url.clone(), bytes);
            Ok(url)
        })
    }

    fn fetch<'a>(&'a self, url: &'a str) -> BlobFuture<'a, Vec<u8>> {
        Box::pin(async move {
            if !url.starts_with(SCHEME) {
                return Err(BlobError::UnsupportedLocator(url.to_owned()));
            }
            self.blobs
                .read()
                .await
                .get(url)
                .cloned()
                .ok_or_else(|| BlobError::NotFound(url.to_owned()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_fetch() {
        let store = MemoryBlobStore::new();
        let hint = ContentHint::new(Some("a.pdf".into()), None);
        let url = store.store(b"%PDF".to_vec(), &hint).await.unwrap();

        assert!(url.starts_with("memory://") && url.ends_with("-a.pdf"));
        assert_eq!(store.fetch(&url).await.unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn unknown_and_foreign_locators_fail() {
        let store = MemoryBlobStore::new();
        assert!(matches!(
            store.fetch("memory://missing").await,
            Err(BlobError::NotFound(_))
        ));
        assert!(matches!(
            store.fetch("https://example.com/a.pdf").await,
            Err(BlobError::UnsupportedLocator(_))
        ));
    }
}
