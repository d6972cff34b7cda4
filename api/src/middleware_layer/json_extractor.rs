//! Rewrites plain-text extractor rejections (400/422) into the JSON envelope
//! and stamps an `X-Request-Id` on them.
//!
//! Responses that are already JSON (handler errors built from `AppError`)
//! pass through with only the request id added.

use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::debug;

use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

const REQUEST_ID: &str = "X-Request-Id";

/// Request fields that can appear in serde or multipart rejection messages.
const KNOWN_FIELDS: &[&str] = &[
    "text",
    "lang",
    "familyMember",
    "title",
    "testName",
    "hospitalOrLab",
    "date",
    "price",
    "files",
];

async fn take_body(res: Response) -> (axum::http::response::Parts, Bytes) {
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    (parts, bytes)
}

fn guess_path(msg: &str) -> Option<String> {
    KNOWN_FIELDS
        .iter()
        .find(|key| msg.contains(&format!("`{key}`")))
        .map(|key| key.to_string())
}

fn hint_for(msg: &str) -> Option<String> {
    if msg.contains("missing field") {
        Some("Add the missing field to the JSON body.".into())
    } else if msg.contains("expected a string") || msg.contains("invalid type") {
        Some("Check the field type; `text` and `lang` are strings.".into())
    } else if msg.contains("EOF") || msg.contains("syntax") {
        Some("The body is not valid JSON.".into())
    } else {
        None
    }
}

fn ensure_request_id(parts: &mut axum::http::response::Parts) -> String {
    if let Some(v) = parts
        .headers
        .get(REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.trim().is_empty())
    {
        return v.to_string();
    }
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    let id = format!("req-{nanos}");
    if let Ok(value) = HeaderValue::from_str(&id) {
        parts.headers.insert(REQUEST_ID, value);
    }
    id
}

fn is_json(parts: &axum::http::response::Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

pub async fn json_error_mapper(req: Request<Body>, next: Next) -> Response {
    let res = next.run(req).await;
    let status = res.status();

    if !(status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY) {
        return res;
    }

    let (mut parts, body) = res.into_parts();
    let req_id = ensure_request_id(&mut parts);
    if is_json(&parts) {
        return Response::from_parts(parts, body);
    }

    let (parts, bytes) = take_body(Response::from_parts(parts, body)).await;
    let original = String::from_utf8_lossy(&bytes);
    debug!(request_id = %req_id, %status, "rewriting rejection into envelope");

    let detail = ApiErrorDetail {
        path: guess_path(&original),
        hint: hint_for(&original),
    };
    let details = if detail.path.is_some() || detail.hint.is_some() {
        vec![detail]
    } else {
        Vec::new()
    };

    let envelope = ApiResponse::<()>::error(
        if status == StatusCode::BAD_REQUEST {
            "BAD_REQUEST"
        } else {
            "UNPROCESSABLE_ENTITY"
        },
        original.trim(),
        details,
    );

    let mut parts = parts;
    let body = match serde_json::to_vec(&envelope) {
        Ok(v) => {
            parts.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            parts.headers.remove(header::CONTENT_LENGTH);
            v
        }
        Err(_) => bytes.to_vec(),
    };

    Response::from_parts(parts, body.into())
}
