//! Blob store on the local filesystem.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::{BlobError, BlobFuture, BlobStore, ContentHint};

const SCHEME: &str = "local://";

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Uses `root` as the storage directory, creating it if missing.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "local blob store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a `local://` locator to a path inside `root`.
    fn resolve(&self, url: &str) -> Result<PathBuf, BlobError> {
        let key = url
            .strip_prefix(SCHEME)
            .ok_or_else(|| BlobError::UnsupportedLocator(url.to_owned()))?;
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(BlobError::UnsupportedLocator(url.to_owned()));
        }
        Ok(self.root.join(key))
    }
}

impl BlobStore for LocalBlobStore {
    fn store<'a>(&'a self, bytes: Vec<u8>, hint: &'a ContentHint) -> BlobFuture<'a, String> {
        Box::pin(async move {
            let key = format!("{}-{}", Uuid::new_v4(), hint.safe_name());
            let path = self.root.join(&key);
            tokio::fs::write(&path, &bytes).await?;
            debug!(path = %path.display(), size = bytes.len(), "blob written");
            Ok(format!("{SCHEME}{key}"))
        })
    }

    fn fetch<'a>(&'a self, url: &'a str) -> BlobFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let path = self.resolve(url)?;
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(BlobError::NotFound(url.to_owned()))
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_under_root_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path().join("uploads")).await.unwrap();

        let hint = ContentHint::new(Some("cbc scan.png".into()), Some("image/png".into()));
        let url = store.store(vec![1, 2, 3], &hint).await.unwrap();

        assert!(url.starts_with("local://"));
        assert!(url.ends_with("cbc_scan.png"));
        assert_eq!(store.fetch(&url).await.unwrap(), vec![1, 2, 3]);

        let entries = std::fs::read_dir(store.root()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn traversal_and_missing_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path()).await.unwrap();

        for bad in ["local://../secret", "local://a/b", "local://", "memory://x"] {
            assert!(
                matches!(store.fetch(bad).await, Err(BlobError::UnsupportedLocator(_))),
                "{bad} should be rejected"
            );
        }
        assert!(matches!(
            store.fetch("local://nothing-here.pdf").await,
            Err(BlobError::NotFound(_))
        ));
    }
}
