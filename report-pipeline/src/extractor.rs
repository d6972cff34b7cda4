//! Text extraction from stored report files.
//!
//! [`TextExtractor`] dispatches on [`FileKind`] to one small extractor per
//! format. Every failure path (fetch, timeout, parse, OCR) yields an empty
//! string and a `warn` log; callers treat empty text as "nothing readable".

use std::{sync::Arc, time::Duration};

use blob_store::BlobStore;
use report_store::{FileKind, ReportFile};
use tracing::{debug, instrument, warn};

use crate::{config::PipelineConfig, errors::OcrError, ocr::OcrBackend};

/// Reads blob bytes with a bound; `None` on error or timeout.
async fn fetch_bytes(blobs: &dyn BlobStore, url: &str, limit: Duration) -> Option<Vec<u8>> {
    match tokio::time::timeout(limit, blobs.fetch(url)).await {
        Ok(Ok(bytes)) => Some(bytes),
        Ok(Err(e)) => {
            warn!(%url, error = %e, "blob fetch failed during extraction");
            None
        }
        Err(_) => {
            warn!(%url, timeout_ms = limit.as_millis() as u64, "blob fetch timed out");
            None
        }
    }
}

/// Collapses whitespace inside each page and joins pages with single spaces.
fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .flat_map(|p| p.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct PdfTextExtractor {
    blobs: Arc<dyn BlobStore>,
    fetch_timeout: Duration,
}

impl PdfTextExtractor {
    pub fn new(blobs: Arc<dyn BlobStore>, fetch_timeout: Duration) -> Self {
        Self {
            blobs,
            fetch_timeout,
        }
    }

    pub async fn extract(&self, url: &str) -> String {
        let Some(bytes) = fetch_bytes(self.blobs.as_ref(), url, self.fetch_timeout).await else {
            return String::new();
        };
        Self::text_from_bytes(bytes).await
    }

    /// Parses on the blocking pool; a panicking parser counts as a failure.
    pub async fn text_from_bytes(bytes: Vec<u8>) -> String {
        let parsed = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await;

        match parsed {
            Ok(Ok(pages)) => {
                let text = join_pages(&pages);
                debug!(pages = pages.len(), chars = text.len(), "pdf text extracted");
                text
            }
            Ok(Err(e)) => {
                warn!(error = %e, "pdf parse failed");
                String::new()
            }
            Err(e) => {
                warn!(error = %e, "pdf parser aborted");
                String::new()
            }
        }
    }
}

pub struct ImageOcrExtractor {
    blobs: Arc<dyn BlobStore>,
    ocr: Arc<dyn OcrBackend>,
    language: String,
    fetch_timeout: Duration,
    ocr_timeout: Duration,
}

impl ImageOcrExtractor {
    pub fn new(blobs: Arc<dyn BlobStore>, ocr: Arc<dyn OcrBackend>, cfg: &PipelineConfig) -> Self {
        Self {
            blobs,
            ocr,
            language: cfg.ocr_language.clone(),
            fetch_timeout: cfg.fetch_timeout,
            ocr_timeout: cfg.ocr_timeout,
        }
    }

    pub async fn extract(&self, url: &str) -> String {
        let Some(bytes) = fetch_bytes(self.blobs.as_ref(), url, self.fetch_timeout).await else {
            return String::new();
        };
        let content_type = sniff_image_type(&bytes);

        let recognized = tokio::time::timeout(
            self.ocr_timeout,
            self.ocr.recognize(&bytes, content_type, &self.language),
        )
        .await
        .unwrap_or(Err(OcrError::Timeout(self.ocr_timeout)));

        match recognized {
            Ok(text) => text.trim().to_owned(),
            Err(e) => {
                warn!(%url, error = %e, "ocr failed");
                String::new()
            }
        }
    }
}

/// PNG or JPEG from magic bytes; JPEG when unknown.
fn sniff_image_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

/// Format-polymorphic extractor used by the pipeline.
pub struct TextExtractor {
    pdf: PdfTextExtractor,
    image: ImageOcrExtractor,
}

impl TextExtractor {
    pub fn new(blobs: Arc<dyn BlobStore>, ocr: Arc<dyn OcrBackend>, cfg: &PipelineConfig) -> Self {
        Self {
            pdf: PdfTextExtractor::new(blobs.clone(), cfg.fetch_timeout),
            image: ImageOcrExtractor::new(blobs, ocr, cfg),
        }
    }

    /// Trimmed text of `file`, or empty when nothing could be read.
    #[instrument(skip(self, file), fields(kind = file.kind.as_str(), url = %file.url))]
    pub async fn extract(&self, file: &ReportFile) -> String {
        let text = match file.kind {
            FileKind::Pdf => self.pdf.extract(&file.url).await,
            FileKind::Image => self.image.extract(&file.url).await,
        };
        text.trim().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use blob_store::MemoryBlobStore;

    use super::*;
    use crate::test_support::{SlowBlobStore, StubOcr, pdf_with_text};

    fn pdf_file(url: &str) -> ReportFile {
        ReportFile {
            url: url.into(),
            kind: FileKind::Pdf,
        }
    }

    #[test]
    fn pages_are_joined_with_single_spaces() {
        let pages = vec!["Hemoglobin:\n 13.5  g/dL".to_owned(), String::new(), " normal ".into()];
        assert_eq!(join_pages(&pages), "Hemoglobin: 13.5 g/dL normal");
    }

    #[tokio::test]
    async fn pdf_text_is_extracted_and_repeatable() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs
            .insert("memory://cbc.pdf", pdf_with_text("Hemoglobin: 13.5 g/dL, normal range"))
            .await;
        let ex = TextExtractor::new(blobs, Arc::new(StubOcr::new("")), &PipelineConfig::default());

        let first = ex.extract(&pdf_file("memory://cbc.pdf")).await;
        assert!(first.contains("Hemoglobin"), "got {first:?}");
        assert_eq!(first, ex.extract(&pdf_file("memory://cbc.pdf")).await);
    }

    #[tokio::test]
    async fn broken_pdf_and_missing_blob_yield_empty_text() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.insert("memory://bad.pdf", b"not a pdf at all".to_vec()).await;
        let ex = TextExtractor::new(blobs, Arc::new(StubOcr::new("")), &PipelineConfig::default());

        assert_eq!(ex.extract(&pdf_file("memory://bad.pdf")).await, "");
        assert_eq!(ex.extract(&pdf_file("memory://gone.pdf")).await, "");
    }

    #[tokio::test]
    async fn image_goes_through_ocr_with_configured_language() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.insert("memory://scan.png", b"\x89PNG\r\n\x1a\nrest".to_vec()).await;
        let ocr = Arc::new(StubOcr::new("  Fasting sugar 92 mg/dL \n"));
        let ex = TextExtractor::new(blobs, ocr.clone(), &PipelineConfig::default());

        let file = ReportFile {
            url: "memory://scan.png".into(),
            kind: FileKind::Image,
        };
        assert_eq!(ex.extract(&file).await, "Fasting sugar 92 mg/dL");
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
        let seen = ocr.last.lock().unwrap().clone().unwrap();
        assert_eq!(seen, ("image/png".to_owned(), "eng".to_owned()));
    }

    #[tokio::test]
    async fn ocr_failure_yields_empty_text() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.insert("memory://scan.jpg", vec![0xFF, 0xD8, 0xFF]).await;
        let ex = TextExtractor::new(blobs, Arc::new(StubOcr::failing()), &PipelineConfig::default());

        let file = ReportFile {
            url: "memory://scan.jpg".into(),
            kind: FileKind::Image,
        };
        assert_eq!(ex.extract(&file).await, "");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_blob_fetch_times_out_to_empty() {
        let cfg = PipelineConfig {
            fetch_timeout: Duration::from_secs(2),
            ..PipelineConfig::default()
        };
        let ex = TextExtractor::new(
            Arc::new(SlowBlobStore(Duration::from_secs(60))),
            Arc::new(StubOcr::new("x")),
            &cfg,
        );
        assert_eq!(ex.extract(&pdf_file("memory://slow.pdf")).await, "");
    }
}
