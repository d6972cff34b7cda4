//! OCR seam and the OCR.space client.

use std::{future::Future, pin::Pin, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{config::env, errors::OcrError};

pub type OcrFuture<'a> = Pin<Box<dyn Future<Output = Result<String, OcrError>> + Send + 'a>>;

/// Recognizes text in an image.
pub trait OcrBackend: Send + Sync {
    /// `content_type` is the image MIME type, `language` an engine language code (`eng`).
    fn recognize<'a>(
        &'a self,
        image: &'a [u8],
        content_type: &'a str,
        language: &'a str,
    ) -> OcrFuture<'a>;
}

const DEFAULT_OCR_SPACE_URL: &str = "https://api.ocr.space/parse/image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrSpaceConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl OcrSpaceConfig {
    /// `OCR_SPACE_URL` and `OCR_SPACE_API_KEY`. A missing key surfaces per call.
    pub fn from_env(timeout: Duration) -> Self {
        Self {
            endpoint: env("OCR_SPACE_URL", DEFAULT_OCR_SPACE_URL),
            api_key: std::env::var("OCR_SPACE_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
    #[serde(default)]
    is_errored_on_processing: bool,
    /// String or array of strings depending on the failure.
    #[serde(default)]
    error_message: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
}

pub struct OcrSpaceClient {
    client: Client,
    cfg: OcrSpaceConfig,
}

impl OcrSpaceClient {
    pub fn new(cfg: OcrSpaceConfig) -> Result<Self, OcrError> {
        let client = Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self { client, cfg })
    }

    #[instrument(skip(self, image), fields(size = image.len()))]
    async fn parse_image(
        &self,
        image: &[u8],
        content_type: &str,
        language: &str,
    ) -> Result<String, OcrError> {
        let api_key = self.cfg.api_key.as_deref().ok_or(OcrError::MissingApiKey)?;
        let data_uri = format!("data:{content_type};base64,{}", STANDARD.encode(image));

        let resp = self
            .client
            .post(&self.cfg.endpoint)
            .form(&[
                ("apikey", api_key),
                ("language", language),
                ("base64Image", data_uri.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(OcrError::HttpStatus {
                status: status.as_u16(),
                snippet: body.chars().take(240).collect(),
            });
        }
        let text = parse_response(&body)?;
        debug!(chars = text.len(), "ocr.space parsed image");
        Ok(text)
    }
}

impl OcrBackend for OcrSpaceClient {
    fn recognize<'a>(
        &'a self,
        image: &'a [u8],
        content_type: &'a str,
        language: &'a str,
    ) -> OcrFuture<'a> {
        Box::pin(self.parse_image(image, content_type, language))
    }
}

fn parse_response(body: &str) -> Result<String, OcrError> {
    let parsed: OcrSpaceResponse =
        serde_json::from_str(body).map_err(|e| OcrError::Decode(e.to_string()))?;

    if parsed.is_errored_on_processing {
        let msg = match parsed.error_message {
            Some(Value::String(s)) => s,
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; "),
            _ => "processing failed".to_owned(),
        };
        return Err(OcrError::Engine(msg));
    }

    parsed
        .parsed_results
        .and_then(|r| r.into_iter().next())
        .map(|r| r.parsed_text.trim().to_owned())
        .ok_or_else(|| OcrError::Decode("no ParsedResults in response".into()))
}
