//! Cloudinary adapter using an unsigned upload preset.
//!
//! PDFs go up as `raw` resources, images as `image`. The returned
//! `secure_url` is the locator; `fetch` downloads it over HTTPS.

use std::{env, time::Duration};

use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{BlobError, BlobFuture, BlobStore, ContentHint};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";
const DEFAULT_FOLDER: &str = "healthapp/reports";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    pub folder: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl CloudinaryConfig {
    /// Reads `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_UPLOAD_PRESET` and the
    /// optional `CLOUDINARY_FOLDER` / `CLOUDINARY_API_BASE`.
    pub fn from_env(timeout: Duration) -> Result<Self, BlobError> {
        let required = |k: &str| {
            env::var(k)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| BlobError::Config(format!("{k} is not set")))
        };
        Ok(Self {
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            upload_preset: required("CLOUDINARY_UPLOAD_PRESET")?,
            folder: env::var("CLOUDINARY_FOLDER").unwrap_or_else(|_| DEFAULT_FOLDER.into()),
            api_base: env::var("CLOUDINARY_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.into()),
            timeout,
        })
    }

    fn upload_url(&self, resource_type: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/upload",
            self.api_base.trim_end_matches('/'),
            self.cloud_name,
            resource_type
        )
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

pub struct CloudinaryBlobStore {
    client: Client,
    cfg: CloudinaryConfig,
}

impl CloudinaryBlobStore {
    pub fn new(cfg: CloudinaryConfig) -> Result<Self, BlobError> {
        let client = Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self { client, cfg })
    }

    #[instrument(skip_all, fields(size = bytes.len()))]
    async fn upload(&self, bytes: Vec<u8>, hint: &ContentHint) -> Result<String, BlobError> {
        let content_type = hint.effective_content_type();
        let resource_type = resource_type_for(content_type.as_deref());
        let url = self.cfg.upload_url(resource_type);
        let name = hint.safe_name();

        let mut part = Part::bytes(bytes).file_name(name.clone());
        if let Some(ct) = content_type.as_deref() {
            part = part.mime_str(ct)?;
        }
        let form = Form::new()
            .text("upload_preset", self.cfg.upload_preset.clone())
            .text("folder", self.cfg.folder.clone())
            .text("public_id", public_id(&name))
            .part("file", part);

        let resp = self.client.post(&url).multipart(form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            warn!(%status, %url, "cloudinary upload rejected");
            return Err(BlobError::HttpStatus {
                status: status.as_u16(),
                url,
                snippet: body.chars().take(240).collect(),
            });
        }

        let parsed: UploadResponse =
            serde_json::from_str(&body).map_err(|e| BlobError::Decode(e.to_string()))?;
        let locator = parsed
            .secure_url
            .or(parsed.url)
            .ok_or_else(|| BlobError::Decode("upload response has no url".into()))?;
        debug!(%locator, resource_type, "cloudinary upload stored");
        Ok(locator)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, BlobError> {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(BlobError::UnsupportedLocator(url.to_owned()));
        }
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound(url.to_owned()));
        }
        if !status.is_success() {
            return Err(BlobError::HttpStatus {
                status: status.as_u16(),
                url: url.to_owned(),
                snippet: String::new(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

impl BlobStore for CloudinaryBlobStore {
    fn store<'a>(&'a self, bytes: Vec<u8>, hint: &'a ContentHint) -> BlobFuture<'a, String> {
        Box::pin(self.upload(bytes, hint))
    }

    fn fetch<'a>(&'a self, url: &'a str) -> BlobFuture<'a, Vec<u8>> {
        Box::pin(self.download(url))
    }
}

fn resource_type_for(content_type: Option<&str>) -> &'static str {
    match content_type {
        Some(ct) if ct.contains("pdf") => "raw",
        _ => "image",
    }
}

/// `{unix_millis}-{stem}`; raw resources keep their extension in the public id.
fn public_id(safe_name: &str) -> String {
    let stem = safe_name
        .rsplit_once('.')
        .map(|(s, _)| s)
        .filter(|s| !s.is_empty())
        .unwrap_or(safe_name);
    format!("{}-{}", chrono::Utc::now().timestamp_millis(), stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: "demo".into(),
            upload_preset: "unsigned".into(),
            folder: DEFAULT_FOLDER.into(),
            api_base: "https://api.cloudinary.com/".into(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn upload_url_depends_on_resource_type() {
        assert_eq!(
            cfg().upload_url("raw"),
            "https://api.cloudinary.com/v1_1/demo/raw/upload"
        );
        assert_eq!(resource_type_for(Some("application/pdf")), "raw");
        assert_eq!(resource_type_for(Some("image/png")), "image");
        assert_eq!(resource_type_for(None), "image");
    }

    #[test]
    fn public_id_drops_extension() {
        let id = public_id("blood_test.pdf");
        let (ts, stem) = id.split_once('-').unwrap();
        assert!(ts.parse::<i64>().is_ok());
        assert_eq!(stem, "blood_test");
    }

    #[tokio::test]
    async fn non_http_locator_is_rejected() {
        let store = CloudinaryBlobStore::new(cfg()).unwrap();
        assert!(matches!(
            store.fetch("local://x.pdf").await,
            Err(BlobError::UnsupportedLocator(_))
        ));
    }
}
