//! Stub collaborators and fixtures shared by the crate's tests.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

use ai_llm_service::{AiLlmError, GenerateFuture, TextGenerator};
use blob_store::{BlobError, BlobFuture, BlobStore, ContentHint};

use crate::{
    errors::OcrError,
    ocr::{OcrBackend, OcrFuture},
};

/// What a [`StubGenerator`] does on each call.
#[derive(Clone)]
pub enum Reply {
    Text(String),
    Empty,
    Fail,
    /// Never answers within any sane timeout.
    Hang,
}

pub struct StubGenerator {
    reply: Reply,
    /// Served first, one per call, before falling back to `reply`.
    queued: Mutex<VecDeque<Reply>>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            queued: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answers with `replies` in order; the last one repeats.
    pub fn sequence(mut replies: Vec<Reply>) -> Self {
        let last = replies.pop().unwrap_or(Reply::Empty);
        let stub = Self::new(last);
        stub.queued.lock().unwrap().extend(replies);
        stub
    }

    pub fn text(s: &str) -> Self {
        Self::new(Reply::Text(s.to_owned()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

impl TextGenerator for StubGenerator {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_owned());
        let reply = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.reply.clone());
        Box::pin(async move {
            match reply {
                Reply::Text(s) => Ok(s),
                Reply::Empty => Ok("   ".to_owned()),
                Reply::Fail => Err(AiLlmError::Timeout(Duration::from_millis(1))),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok("too late".to_owned())
                }
            }
        })
    }
}

pub struct StubOcr {
    reply: Option<String>,
    pub calls: AtomicUsize,
    /// `(content_type, language)` of the last call.
    pub last: Mutex<Option<(String, String)>>,
}

impl StubOcr {
    pub fn new(text: &str) -> Self {
        Self {
            reply: Some(text.to_owned()),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            ..Self::new("")
        }
    }
}

impl OcrBackend for StubOcr {
    fn recognize<'a>(
        &'a self,
        _image: &'a [u8],
        content_type: &'a str,
        language: &'a str,
    ) -> OcrFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some((content_type.to_owned(), language.to_owned()));
        let reply = self.reply.clone();
        Box::pin(async move { reply.ok_or_else(|| OcrError::Engine("stub failure".into())) })
    }
}

/// Blob store whose reads take `self.0`; writes are refused.
pub struct SlowBlobStore(pub Duration);

impl BlobStore for SlowBlobStore {
    fn store<'a>(&'a self, _bytes: Vec<u8>, _hint: &'a ContentHint) -> BlobFuture<'a, String> {
        Box::pin(async { Err(BlobError::Config("read-only".into())) })
    }

    fn fetch<'a>(&'a self, _url: &'a str) -> BlobFuture<'a, Vec<u8>> {
        let delay = self.0;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(Vec::new())
        })
    }
}

/// Answers the first HTTP request on a local port with `200` and `body`.
///
/// Returns the base URL (`http://127.0.0.1:{port}`).
pub async fn serve_json_once(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut req = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            req.extend_from_slice(&buf[..n]);
            if request_complete(&req) {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });
    base
}

fn request_complete(req: &[u8]) -> bool {
    let Some(end) = req.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&req[..end]).to_ascii_lowercase();
    let len = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    req.len() >= end + 4 + len
}

/// Single-page PDF whose text layer is `text` in Helvetica.
pub fn pdf_with_text(text: &str) -> Vec<u8> {
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.4");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
    });
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    });
    if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
        page.set("Parent", pages_id);
    }
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
